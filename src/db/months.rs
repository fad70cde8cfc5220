use crate::db::db_utils::{date_col, date_str, dec_str, enum_col, now_ts, opt_dec_col};
use crate::errors::{AppError, AppResult};
use crate::models::month_settings::MonthSettings;
use crate::models::state::PeriodState;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn map_settings(row: &Row) -> rusqlite::Result<MonthSettings> {
    Ok(MonthSettings {
        id: row.get("id")?,
        year: row.get("year")?,
        month: row.get("month")?,
        start_date: date_col(row, "start_date")?,
        end_date: date_col(row, "end_date")?,
        lunch_rate: opt_dec_col(row, "lunch_rate")?,
        dinner_rate: opt_dec_col(row, "dinner_rate")?,
        state: enum_col(row, "status", PeriodState::from_db_str)?,
    })
}

pub fn find_by_period(conn: &Connection, year: i32, month: u32) -> AppResult<Option<MonthSettings>> {
    let s = conn
        .query_row(
            "SELECT * FROM month_settings WHERE year = ?1 AND month = ?2",
            params![year, month],
            map_settings,
        )
        .optional()?;
    Ok(s)
}

pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<MonthSettings>> {
    let s = conn
        .query_row(
            "SELECT * FROM month_settings WHERE id = ?1",
            [id],
            map_settings,
        )
        .optional()?;
    Ok(s)
}

pub fn get_by_id(conn: &Connection, id: i64) -> AppResult<MonthSettings> {
    find_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("month settings #{id}")))
}

/// Insert a draft; if one already exists for the period, leave it untouched.
pub fn insert_draft_if_missing(
    conn: &Connection,
    year: i32,
    month: u32,
    start: &NaiveDate,
    end: &NaiveDate,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO month_settings (year, month, start_date, end_date, status)
         VALUES (?1, ?2, ?3, ?4, 'draft')
         ON CONFLICT (year, month) DO NOTHING",
        params![year, month, date_str(start), date_str(end)],
    )?;
    Ok(())
}

/// Write range and rates of an existing row.
pub fn update_values(conn: &Connection, s: &MonthSettings) -> AppResult<()> {
    conn.execute(
        "UPDATE month_settings
         SET start_date = ?1, end_date = ?2, lunch_rate = ?3, dinner_rate = ?4
         WHERE id = ?5",
        params![
            date_str(&s.start_date),
            date_str(&s.end_date),
            s.lunch_rate.as_ref().map(dec_str),
            s.dinner_rate.as_ref().map(dec_str),
            s.id,
        ],
    )?;
    Ok(())
}

/// Compare-and-set on the status column. Returns false when the row was not
/// in `expected` any more.
pub fn cas_status(
    conn: &Connection,
    id: i64,
    expected: PeriodState,
    next: PeriodState,
) -> AppResult<bool> {
    let finalized_at = if next == PeriodState::Finalized {
        Some(now_ts())
    } else {
        None
    };
    let n = conn.execute(
        "UPDATE month_settings SET status = ?1, finalized_at = ?2
         WHERE id = ?3 AND status = ?4",
        params![next.to_db_str(), finalized_at, id, expected.to_db_str()],
    )?;
    Ok(n == 1)
}

pub fn list_settings(conn: &Connection) -> AppResult<Vec<MonthSettings>> {
    let mut stmt = conn.prepare("SELECT * FROM month_settings ORDER BY year ASC, month ASC")?;
    let rows = stmt.query_map([], map_settings)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Finalized periods whose range contains `date`, oldest first.
pub fn finalized_covering(conn: &Connection, date: &NaiveDate) -> AppResult<Vec<MonthSettings>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM month_settings
         WHERE status = 'finalized' AND start_date <= ?1 AND end_date >= ?1
         ORDER BY year ASC, month ASC",
    )?;
    let rows = stmt.query_map([date_str(date)], map_settings)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
