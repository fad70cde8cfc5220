//! SQLite connection wrapper (lightweight for CLI usage).
//!
//! Writers that touch more than one row go through `atomic()`, which opens an
//! IMMEDIATE transaction: the write lock is taken up front, so two processes
//! finalizing the same artifact are serialized by SQLite itself.

use crate::db::migrate::run_pending_migrations;
use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    /// Open the database and bring the schema up to date.
    pub fn new(path: &str) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        Self::configure(&conn)?;
        run_pending_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory database, used by unit tests.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        run_pending_migrations(&conn)?;
        Ok(Self { conn })
    }

    fn configure(conn: &Connection) -> AppResult<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // WAL lets readers proceed while a batch is being written.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |r| r.get(0))?;
        Ok(())
    }

    /// Run `func` inside one IMMEDIATE transaction.
    ///
    /// Either every statement issued by `func` is committed or none is. Storage
    /// failures are reported as `AppError::Consistency`.
    pub fn atomic<F, T>(&mut self, func: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| AppError::Consistency(format!("cannot begin batch: {e}")))?;

        // On error `tx` is dropped here, which rolls the batch back.
        let out = func(&tx).map_err(AppError::into_batch_error)?;

        tx.commit()
            .map_err(|e| AppError::Consistency(format!("commit failed: {e}")))?;
        Ok(out)
    }

    /// Run a read-only closure against one consistent snapshot.
    pub fn read<F, T>(&mut self, func: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = func(&tx);
        // Nothing to keep: end the snapshot without writing.
        tx.rollback()?;
        out
    }
}
