//! Balance rows and the append-only transaction log.

use crate::db::db_utils::{bool_col, date_str, dec_col, dec_str, enum_col};
use crate::errors::AppResult;
use crate::models::balance::Balance;
use crate::models::category::MealCategory;
use crate::models::transaction::{HistoryFilter, Page, Transaction, TransactionType, TxSource};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

fn map_balance(row: &Row) -> rusqlite::Result<Balance> {
    Ok(Balance {
        user_id: row.get("user_id")?,
        category: enum_col(row, "category", MealCategory::from_db_str)?,
        amount: dec_col(row, "amount")?,
        is_frozen: bool_col(row, "is_frozen")?,
    })
}

pub fn map_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let source_type: String = row.get("source_type")?;
    let source_id: Option<i64> = row.get("source_id")?;
    let source = TxSource::from_db_parts(&source_type, source_id).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("invalid transaction source: {source_type}").into(),
        )
    })?;

    Ok(Transaction {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        category: enum_col(row, "category", MealCategory::from_db_str)?,
        kind: enum_col(row, "kind", TransactionType::from_db_str)?,
        amount: dec_col(row, "amount")?,
        previous_balance: dec_col(row, "previous_balance")?,
        new_balance: dec_col(row, "new_balance")?,
        description: row.get("description")?,
        performed_by: row.get("performed_by")?,
        created_at: row.get("created_at")?,
        is_reversed: bool_col(row, "is_reversed")?,
        source,
        reverses_id: row.get("reverses_id")?,
    })
}

/// Current balance; a (user, category) never written to reads as zero.
pub fn load_balance(conn: &Connection, user_id: i64, category: MealCategory) -> AppResult<Balance> {
    let bal = conn
        .query_row(
            "SELECT * FROM balances WHERE user_id = ?1 AND category = ?2",
            params![user_id, category.to_db_str()],
            map_balance,
        )
        .optional()?;
    Ok(bal.unwrap_or_else(|| Balance::empty(user_id, category)))
}

pub fn load_balances(conn: &Connection, user_id: Option<i64>) -> AppResult<Vec<Balance>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM balances
         WHERE (?1 IS NULL OR user_id = ?1)
         ORDER BY user_id ASC, category ASC",
    )?;
    let rows = stmt.query_map([user_id], map_balance)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn upsert_balance(conn: &Connection, bal: &Balance) -> AppResult<()> {
    conn.execute(
        "INSERT INTO balances (user_id, category, amount, is_frozen)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, category)
         DO UPDATE SET amount = excluded.amount, is_frozen = excluded.is_frozen",
        params![
            bal.user_id,
            bal.category.to_db_str(),
            dec_str(&bal.amount),
            bal.is_frozen as i64,
        ],
    )?;
    Ok(())
}

pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> AppResult<i64> {
    let (source_type, source_id) = tx.source.to_db_parts();
    conn.execute(
        "INSERT INTO transactions (user_id, category, kind, amount, previous_balance, new_balance,
                                   description, performed_by, created_at, is_reversed,
                                   source_type, source_id, reverses_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            tx.user_id,
            tx.category.to_db_str(),
            tx.kind.to_db_str(),
            dec_str(&tx.amount),
            dec_str(&tx.previous_balance),
            dec_str(&tx.new_balance),
            tx.description,
            tx.performed_by,
            tx.created_at,
            tx.is_reversed as i64,
            source_type,
            source_id,
            tx.reverses_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn mark_reversed(conn: &Connection, ids: &[i64]) -> AppResult<()> {
    let mut stmt = conn.prepare_cached("UPDATE transactions SET is_reversed = 1 WHERE id = ?1")?;
    for id in ids {
        stmt.execute([id])?;
    }
    Ok(())
}

pub fn find_transaction(conn: &Connection, id: i64) -> AppResult<Option<Transaction>> {
    let tx = conn
        .query_row(
            "SELECT * FROM transactions WHERE id = ?1",
            [id],
            map_transaction,
        )
        .optional()?;
    Ok(tx)
}

/// Newest-first history of one user.
pub fn load_history(
    conn: &Connection,
    user_id: Option<i64>,
    filter: &HistoryFilter,
    page: Page,
) -> AppResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM transactions
         WHERE (?1 IS NULL OR user_id = ?1)
           AND (?2 IS NULL OR category = ?2)
           AND (?3 IS NULL OR kind = ?3)
           AND (?4 IS NULL OR substr(created_at, 1, 10) >= ?4)
           AND (?5 IS NULL OR substr(created_at, 1, 10) <= ?5)
           AND (?6 = 1 OR is_reversed = 0)
         ORDER BY id DESC
         LIMIT ?7 OFFSET ?8",
    )?;

    let rows = stmt.query_map(
        params![
            user_id,
            filter.category.map(|c| c.to_db_str()),
            filter.kind.map(|k| k.to_db_str()),
            filter.from.as_ref().map(date_str),
            filter.to.as_ref().map(date_str),
            filter.include_reversed as i64,
            page.limit,
            page.offset,
        ],
        map_transaction,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Full log of one (user, category), oldest first. Used for replay.
pub fn load_stream(
    conn: &Connection,
    user_id: i64,
    category: MealCategory,
) -> AppResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM transactions
         WHERE user_id = ?1 AND category = ?2
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![user_id, category.to_db_str()], map_transaction)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Every (user, category) pair that has a balance row or a transaction.
pub fn ledger_keys(conn: &Connection) -> AppResult<Vec<(i64, MealCategory)>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, category FROM balances
         UNION
         SELECT user_id, category FROM transactions
         ORDER BY 1, 2",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            enum_col(row, "category", MealCategory::from_db_str)?,
        ))
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Net signed amount already committed for an artifact, per (user, category).
pub fn net_by_source(
    conn: &Connection,
    source: TxSource,
) -> AppResult<Vec<(i64, MealCategory, Decimal)>> {
    let (source_type, source_id) = source.to_db_parts();
    let mut stmt = conn.prepare(
        "SELECT user_id, category, amount FROM transactions
         WHERE source_type = ?1 AND source_id IS ?2 AND is_reversed = 0
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![source_type, source_id], |row| {
        Ok((
            row.get::<_, i64>("user_id")?,
            enum_col(row, "category", MealCategory::from_db_str)?,
            dec_col(row, "amount")?,
        ))
    })?;

    let mut acc: Vec<(i64, MealCategory, Decimal)> = Vec::new();
    for r in rows {
        let (user, cat, amount) = r?;
        match acc.iter_mut().find(|(u, c, _)| *u == user && *c == cat) {
            Some(slot) => slot.2 += amount,
            None => acc.push((user, cat, amount)),
        }
    }
    Ok(acc)
}

/// Sum of non-reversed deposits made by a user between two dates (inclusive).
pub fn deposits_between(
    conn: &Connection,
    user_id: i64,
    from: &chrono::NaiveDate,
    to: &chrono::NaiveDate,
) -> AppResult<Decimal> {
    let mut stmt = conn.prepare_cached(
        "SELECT amount FROM transactions
         WHERE user_id = ?1 AND kind = 'deposit' AND is_reversed = 0
           AND substr(created_at, 1, 10) BETWEEN ?2 AND ?3",
    )?;
    let rows = stmt.query_map(params![user_id, date_str(from), date_str(to)], |row| {
        dec_col(row, "amount")
    })?;

    let mut total = Decimal::ZERO;
    for r in rows {
        total += r?;
    }
    Ok(total)
}
