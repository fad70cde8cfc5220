use crate::db::db_utils::{bool_col, date_col, date_str, enum_col, now_ts};
use crate::errors::AppResult;
use crate::models::category::MealCategory;
use crate::models::meal_record::{DailyMealRecord, Holiday};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn map_record(row: &Row) -> rusqlite::Result<DailyMealRecord> {
    Ok(DailyMealRecord {
        id: Some(row.get("id")?),
        date: date_col(row, "date")?,
        user_id: row.get("user_id")?,
        meal: enum_col(row, "meal", MealCategory::from_db_str)?,
        is_on: bool_col(row, "is_on")?,
        count: row.get("count")?,
        is_manually_set: bool_col(row, "is_manually_set")?,
    })
}

pub fn find_record(
    conn: &Connection,
    date: &NaiveDate,
    user_id: i64,
    meal: MealCategory,
) -> AppResult<Option<DailyMealRecord>> {
    let rec = conn
        .query_row(
            "SELECT * FROM meal_records WHERE date = ?1 AND user_id = ?2 AND meal = ?3",
            params![date_str(date), user_id, meal.to_db_str()],
            map_record,
        )
        .optional()?;
    Ok(rec)
}

pub fn find_record_by_id(conn: &Connection, id: i64) -> AppResult<Option<DailyMealRecord>> {
    let rec = conn
        .query_row("SELECT * FROM meal_records WHERE id = ?1", [id], map_record)
        .optional()?;
    Ok(rec)
}

/// Insert or update by (date, user, meal). Returns the row id.
pub fn upsert_record(conn: &Connection, rec: &DailyMealRecord) -> AppResult<i64> {
    let id: i64 = conn.query_row(
        "INSERT INTO meal_records (date, user_id, meal, is_on, count, is_manually_set, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (date, user_id, meal) DO UPDATE SET
             is_on = excluded.is_on,
             count = excluded.count,
             is_manually_set = excluded.is_manually_set,
             updated_at = excluded.updated_at
         RETURNING id",
        params![
            date_str(&rec.date),
            rec.user_id,
            rec.meal.to_db_str(),
            rec.is_on as i64,
            rec.count,
            rec.is_manually_set as i64,
            now_ts(),
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Stored records for a user and meal between two dates (inclusive).
pub fn load_records(
    conn: &Connection,
    user_id: i64,
    meal: MealCategory,
    start: &NaiveDate,
    end: &NaiveDate,
) -> AppResult<Vec<DailyMealRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM meal_records
         WHERE user_id = ?1 AND meal = ?2 AND date BETWEEN ?3 AND ?4
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(
        params![user_id, meal.to_db_str(), date_str(start), date_str(end)],
        map_record,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn insert_holiday(conn: &Connection, h: &Holiday) -> AppResult<()> {
    conn.execute(
        "INSERT INTO holidays (date, description) VALUES (?1, ?2)
         ON CONFLICT (date) DO UPDATE SET description = excluded.description",
        params![date_str(&h.date), h.description],
    )?;
    Ok(())
}

pub fn delete_holiday(conn: &Connection, date: &NaiveDate) -> AppResult<usize> {
    Ok(conn.execute("DELETE FROM holidays WHERE date = ?1", [date_str(date)])?)
}

pub fn is_holiday(conn: &Connection, date: &NaiveDate) -> AppResult<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM holidays WHERE date = ?1")?;
    Ok(stmt.exists([date_str(date)])?)
}

pub fn load_holidays(
    conn: &Connection,
    start: &NaiveDate,
    end: &NaiveDate,
) -> AppResult<Vec<Holiday>> {
    let mut stmt = conn.prepare(
        "SELECT date, description FROM holidays
         WHERE date BETWEEN ?1 AND ?2
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![date_str(start), date_str(end)], |row| {
        Ok(Holiday {
            date: date_col(row, "date")?,
            description: row.get("description")?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
