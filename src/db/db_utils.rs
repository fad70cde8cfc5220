//! Column conversion helpers shared by the query modules.
//!
//! Money is stored as canonical decimal TEXT and dates as `YYYY-MM-DD`.

use crate::errors::AppError;
use chrono::{Local, NaiveDate};
use rusqlite::Row;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use std::str::FromStr;

fn conversion_err(err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err))
}

pub fn dec_col(row: &Row, col: &str) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(col)?;
    Decimal::from_str(&raw).map_err(|_| conversion_err(AppError::InvalidAmount(format!("{col}={raw}"))))
}

pub fn opt_dec_col(row: &Row, col: &str) -> rusqlite::Result<Option<Decimal>> {
    match row.get::<_, Option<String>>(col)? {
        Some(raw) => Decimal::from_str(&raw)
            .map(Some)
            .map_err(|_| conversion_err(AppError::InvalidAmount(format!("{col}={raw}")))),
        None => Ok(None),
    }
}

pub fn date_col(row: &Row, col: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(col)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| conversion_err(AppError::InvalidDate(format!("{col}={raw}"))))
}

pub fn bool_col(row: &Row, col: &str) -> rusqlite::Result<bool> {
    Ok(row.get::<_, i64>(col)? != 0)
}

/// Parse an enum stored as text through its `from_db_str`.
pub fn enum_col<T>(row: &Row, col: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    parse(&raw).ok_or_else(|| conversion_err(AppError::Other(format!("invalid {col}: {raw}"))))
}

pub fn date_str(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn dec_str(d: &Decimal) -> String {
    d.normalize().to_string()
}

pub fn now_ts() -> String {
    Local::now().to_rfc3339()
}

/// Calendar date of an RFC3339 timestamp as stored in `created_at`.
pub fn ts_date(ts: &str) -> Option<NaiveDate> {
    ts.get(0..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_are_stored_canonically() {
        let d = Decimal::from_str("100.00").unwrap();
        assert_eq!(dec_str(&d), "100");
        assert_eq!(dec_str(&Decimal::from_str("-33.30").unwrap()), "-33.3");
    }

    #[test]
    fn ts_date_reads_the_calendar_day() {
        assert_eq!(
            ts_date("2025-09-03T10:11:12+02:00"),
            NaiveDate::from_ymd_opt(2025, 9, 3)
        );
        assert_eq!(ts_date("garbage"), None);
    }
}
