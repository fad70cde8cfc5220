// src/export/logic.rs

use crate::db::corrections::map_correction;
use crate::db::db_utils::date_str;
use crate::db::ledger::{load_balances, map_transaction};
use crate::db::pool::DbPool;
use crate::db::users::list_users;
use crate::errors::{AppError, AppResult};
use crate::export::fs_utils::ensure_writable;
use crate::export::json_csv::{export_csv, export_json};
use crate::export::model::{BalanceRecord, CorrectionRecord, TransactionRecord};
use crate::export::{ExportFormat, ExportWhat};
use crate::ui::messages::warning;
use crate::utils::date::parse_period;
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::Path;

pub struct ExportLogic;

impl ExportLogic {
    /// Write one record stream to `file`.
    ///
    /// - `range`: `None`, `"all"` or a period expression (`YYYY`, `YYYY-MM`,
    ///   `YYYY-MM-DD`, `a:b`), matched against the creation date. Balances are
    ///   a snapshot and ignore it.
    ///
    /// Returns the number of records written.
    pub fn export(
        pool: &mut DbPool,
        what: ExportWhat,
        format: ExportFormat,
        file: &str,
        range: &Option<String>,
        force: bool,
    ) -> AppResult<usize> {
        let path = Path::new(file);

        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "output file path must be absolute: {file}"
            )));
        }

        let bounds: Option<(NaiveDate, NaiveDate)> = match range {
            None => None,
            Some(r) if r.eq_ignore_ascii_case("all") => None,
            Some(r) => Some(parse_period(r)?),
        };

        ensure_writable(path, force)?;

        match what {
            ExportWhat::Transactions => {
                let rows = pool.read(|conn| load_transactions(conn, bounds))?;
                write(&rows, format, path, "transactions")
            }
            ExportWhat::Corrections => {
                let rows = pool.read(|conn| load_corrections(conn, bounds))?;
                write(&rows, format, path, "corrections")
            }
            ExportWhat::Balances => {
                let rows = pool.read(load_balance_snapshot)?;
                write(&rows, format, path, "balances")
            }
        }
    }
}

fn write<T: Serialize>(rows: &[T], format: ExportFormat, path: &Path, label: &str) -> AppResult<usize> {
    if rows.is_empty() {
        warning(format!("No {label} found for selected range."));
    }
    match format {
        ExportFormat::Csv => export_csv(rows, path)?,
        ExportFormat::Json => export_json(rows, path)?,
    }
    Ok(rows.len())
}

fn range_params(bounds: Option<(NaiveDate, NaiveDate)>) -> (Option<String>, Option<String>) {
    match bounds {
        Some((a, b)) => (Some(date_str(&a)), Some(date_str(&b))),
        None => (None, None),
    }
}

pub(crate) fn load_transactions(
    conn: &Connection,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> AppResult<Vec<TransactionRecord>> {
    let (from, to) = range_params(bounds);
    let mut stmt = conn.prepare(
        "SELECT * FROM transactions
         WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
           AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![from, to], map_transaction)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(TransactionRecord::from(&r?));
    }
    Ok(out)
}

pub(crate) fn load_corrections(
    conn: &Connection,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> AppResult<Vec<CorrectionRecord>> {
    let (from, to) = range_params(bounds);
    let mut stmt = conn.prepare(
        "SELECT * FROM correction_log
         WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
           AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![from, to], map_correction)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(CorrectionRecord::from(&r?));
    }
    Ok(out)
}

fn load_balance_snapshot(conn: &Connection) -> AppResult<Vec<BalanceRecord>> {
    let users = list_users(conn, false)?;
    Ok(load_balances(conn, None)?
        .iter()
        .map(|b| {
            let name = users
                .iter()
                .find(|u| u.id == b.user_id)
                .map(|u| u.name.as_str())
                .unwrap_or("");
            BalanceRecord::new(b, name)
        })
        .collect())
}
