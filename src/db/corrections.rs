use crate::db::db_utils::{enum_col, now_ts};
use crate::errors::AppResult;
use crate::models::correction::{CorrectionAction, CorrectionLogEntry, TargetType};
use crate::models::transaction::Page;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde_json::Value;

fn json_col(row: &Row, col: &str) -> rusqlite::Result<Value> {
    let raw: String = row.get(col)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub fn map_correction(row: &Row) -> rusqlite::Result<CorrectionLogEntry> {
    Ok(CorrectionLogEntry {
        id: row.get("id")?,
        action: enum_col(row, "action", CorrectionAction::from_db_str)?,
        target_type: enum_col(row, "target_type", TargetType::from_db_str)?,
        target_id: row.get("target_id")?,
        previous_value: json_col(row, "previous_value")?,
        new_value: json_col(row, "new_value")?,
        reason: row.get("reason")?,
        performed_by: row.get("performed_by")?,
        created_at: row.get("created_at")?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn insert_correction(
    conn: &Connection,
    action: CorrectionAction,
    target_type: TargetType,
    target_id: &str,
    previous_value: &Value,
    new_value: &Value,
    reason: &str,
    performed_by: &str,
) -> AppResult<CorrectionLogEntry> {
    let created_at = now_ts();
    conn.execute(
        "INSERT INTO correction_log (action, target_type, target_id, previous_value, new_value,
                                     reason, performed_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            action.to_db_str(),
            target_type.to_db_str(),
            target_id,
            previous_value.to_string(),
            new_value.to_string(),
            reason,
            performed_by,
            created_at,
        ],
    )?;

    Ok(CorrectionLogEntry {
        id: conn.last_insert_rowid(),
        action,
        target_type,
        target_id: target_id.to_string(),
        previous_value: previous_value.clone(),
        new_value: new_value.clone(),
        reason: reason.to_string(),
        performed_by: performed_by.to_string(),
        created_at,
    })
}

/// Newest first, optionally narrowed to one target type.
pub fn load_corrections(
    conn: &Connection,
    target_type: Option<TargetType>,
    page: Page,
) -> AppResult<Vec<CorrectionLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM correction_log
         WHERE (?1 IS NULL OR target_type = ?1)
         ORDER BY id DESC
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(
        params![target_type.map(|t| t.to_db_str()), page.limit, page.offset],
        map_correction,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
