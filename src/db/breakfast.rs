use crate::db::db_utils::{bool_col, date_col, date_str, dec_col, dec_str, enum_col, now_ts};
use crate::errors::{AppError, AppResult};
use crate::models::breakfast::{BreakfastEntry, Participant};
use crate::models::state::EntryState;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn map_entry_head(row: &Row) -> rusqlite::Result<BreakfastEntry> {
    Ok(BreakfastEntry {
        id: row.get("id")?,
        date: date_col(row, "date")?,
        description: row.get("description")?,
        total_cost: dec_col(row, "total_cost")?,
        participants: Vec::new(),
        state: enum_col(row, "status", EntryState::from_db_str)?,
        reverse_reason: row.get("reverse_reason")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
    })
}

fn load_participants(conn: &Connection, entry_id: i64) -> AppResult<Vec<Participant>> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id, cost, deducted FROM breakfast_participants
         WHERE entry_id = ?1
         ORDER BY position ASC",
    )?;
    let rows = stmt.query_map([entry_id], |row| {
        Ok(Participant {
            user_id: row.get("user_id")?,
            cost: dec_col(row, "cost")?,
            deducted: bool_col(row, "deducted")?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn find_entry(conn: &Connection, id: i64) -> AppResult<Option<BreakfastEntry>> {
    let head = conn
        .query_row(
            "SELECT * FROM breakfast_entries WHERE id = ?1",
            [id],
            map_entry_head,
        )
        .optional()?;

    match head {
        Some(mut entry) => {
            entry.participants = load_participants(conn, id)?;
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

pub fn get_entry(conn: &Connection, id: i64) -> AppResult<BreakfastEntry> {
    find_entry(conn, id)?.ok_or_else(|| AppError::NotFound(format!("breakfast entry #{id}")))
}

pub fn insert_entry(
    conn: &Connection,
    date: &NaiveDate,
    description: &str,
    participants: &[Participant],
    created_by: &str,
) -> AppResult<i64> {
    let total: rust_decimal::Decimal = participants.iter().map(|p| p.cost).sum();
    conn.execute(
        "INSERT INTO breakfast_entries (date, description, total_cost, status, created_by, created_at)
         VALUES (?1, ?2, ?3, 'draft', ?4, ?5)",
        params![
            date_str(date),
            description,
            dec_str(&total),
            created_by,
            now_ts()
        ],
    )?;
    let id = conn.last_insert_rowid();
    replace_participants(conn, id, participants)?;
    Ok(id)
}

/// Rewrite date, description and participants; total is recomputed from costs.
pub fn update_entry(
    conn: &Connection,
    id: i64,
    date: &NaiveDate,
    description: &str,
    participants: &[Participant],
) -> AppResult<()> {
    let total: rust_decimal::Decimal = participants.iter().map(|p| p.cost).sum();
    conn.execute(
        "UPDATE breakfast_entries SET date = ?1, description = ?2, total_cost = ?3 WHERE id = ?4",
        params![date_str(date), description, dec_str(&total), id],
    )?;
    replace_participants(conn, id, participants)?;
    Ok(())
}

fn replace_participants(conn: &Connection, id: i64, participants: &[Participant]) -> AppResult<()> {
    conn.execute("DELETE FROM breakfast_participants WHERE entry_id = ?1", [id])?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO breakfast_participants (entry_id, user_id, position, cost, deducted)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (pos, p) in participants.iter().enumerate() {
        stmt.execute(params![
            id,
            p.user_id,
            pos as i64,
            dec_str(&p.cost),
            p.deducted as i64
        ])?;
    }
    Ok(())
}

pub fn mark_deducted(conn: &Connection, id: i64) -> AppResult<()> {
    conn.execute(
        "UPDATE breakfast_participants SET deducted = 1 WHERE entry_id = ?1",
        [id],
    )?;
    Ok(())
}

/// Compare-and-set on the status column. Returns false if another writer
/// moved the entry first.
pub fn cas_status(
    conn: &Connection,
    id: i64,
    expected: EntryState,
    next: EntryState,
) -> AppResult<bool> {
    let n = conn.execute(
        "UPDATE breakfast_entries SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![next.to_db_str(), id, expected.to_db_str()],
    )?;
    Ok(n == 1)
}

pub fn set_reverse_reason(conn: &Connection, id: i64, reason: Option<&str>) -> AppResult<()> {
    conn.execute(
        "UPDATE breakfast_entries SET reverse_reason = ?1 WHERE id = ?2",
        params![reason, id],
    )?;
    Ok(())
}

pub fn delete_entry(conn: &Connection, id: i64) -> AppResult<usize> {
    Ok(conn.execute("DELETE FROM breakfast_entries WHERE id = ?1", [id])?)
}

pub fn list_entries(
    conn: &Connection,
    start: &NaiveDate,
    end: &NaiveDate,
) -> AppResult<Vec<BreakfastEntry>> {
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM breakfast_entries
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY date ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![date_str(start), date_str(end)], |row| row.get(0))?;
        let mut v = Vec::new();
        for r in rows {
            v.push(r?);
        }
        v
    };

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        out.push(get_entry(conn, id)?);
    }
    Ok(out)
}
