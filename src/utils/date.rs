use crate::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, Weekday};

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| AppError::InvalidDate(s.to_string()))
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidDate(format!("{year:04}-{month:02}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::InvalidDate(format!("{year:04}-{month:02}")))?;
    let last = next
        .pred_opt()
        .ok_or_else(|| AppError::InvalidDate(format!("{year:04}-{month:02}")))?;
    Ok((first, last))
}

/// Parse `YYYY-MM` into (year, month).
pub fn parse_year_month(s: &str) -> AppResult<(i32, u32)> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(s.to_string()))?;
    Ok((d.year(), d.month()))
}

/// Accepts english names or abbreviations, any case (`sat`, `Sunday`).
pub fn parse_weekday(s: &str) -> AppResult<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| AppError::Validation(format!("unknown weekday '{s}'")))
}

/// Every day from `start` to `end`, both included.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Period expressions: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, or `a:b` of those.
pub fn parse_period(p: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    if let Some((a, b)) = p.split_once(':') {
        let (start, _) = parse_single_period(a)?;
        let (_, end) = parse_single_period(b)?;
        if start > end {
            return Err(AppError::InvalidDate(format!("empty range: {p}")));
        }
        return Ok((start, end));
    }
    parse_single_period(p)
}

fn parse_single_period(p: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let p = p.trim();
    if let Ok(d) = NaiveDate::parse_from_str(p, "%Y-%m-%d") {
        return Ok((d, d));
    }
    if p.len() == 7
        && let Ok((y, m)) = parse_year_month(p)
    {
        return month_bounds(y, m);
    }
    if p.len() == 4
        && let Ok(year) = p.parse::<i32>()
    {
        let (start, _) = month_bounds(year, 1)?;
        let (_, end) = month_bounds(year, 12)?;
        return Ok((start, end));
    }
    Err(AppError::InvalidDate(format!("invalid period: {p}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_bounds_handle_leap_years_and_december() {
        assert_eq!(month_bounds(2024, 2).unwrap(), (ymd(2024, 2, 1), ymd(2024, 2, 29)));
        assert_eq!(month_bounds(2025, 12).unwrap(), (ymd(2025, 12, 1), ymd(2025, 12, 31)));
        assert!(month_bounds(2025, 13).is_err());
    }

    #[test]
    fn periods_and_ranges() {
        assert_eq!(parse_period("2025-09").unwrap(), (ymd(2025, 9, 1), ymd(2025, 9, 30)));
        assert_eq!(
            parse_period("2025-01-15:2025-02").unwrap(),
            (ymd(2025, 1, 15), ymd(2025, 2, 28))
        );
        assert_eq!(parse_period("2024").unwrap().1, ymd(2024, 12, 31));
        assert!(parse_period("2025-03:2025-01").is_err());
    }

    #[test]
    fn weekdays_parse_loosely() {
        assert_eq!(parse_weekday("Fri").unwrap(), Weekday::Fri);
        assert_eq!(parse_weekday("sunday").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }
}
