//! Unified application error type.
//! All modules (db, core, cli, utils) return AppError to keep the error
//! handling consistent. Callers that need to react programmatically use
//! `kind()` and the stable `code()`; presentation layers localize from those.

use std::io;
use thiserror::Error;

/// Coarse error taxonomy shared with callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Authorization,
    Consistency,
    NotFound,
    Internal,
}

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // ---------------------------
    // Domain errors
    // ---------------------------
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Balance of user {user} for {category} is frozen")]
    BalanceFrozen { user: String, category: String },

    #[error("{0} is already finalized")]
    AlreadyFinalized(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Atomic commit failed, nothing was applied: {0}")]
    Consistency(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Export errors
    // ---------------------------
    #[error("Export error: {0}")]
    Export(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::InvalidDate(_) | AppError::InvalidAmount(_) => {
                ErrorKind::Validation
            }
            AppError::State(_) | AppError::BalanceFrozen { .. } | AppError::AlreadyFinalized(_) => {
                ErrorKind::State
            }
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::Consistency(_) => ErrorKind::Consistency,
            AppError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "io",
            AppError::Db(_) => "db",
            AppError::Migration(_) => "migration",
            AppError::Json(_) => "json",
            AppError::InvalidDate(_) => "invalid_date",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::Validation(_) => "validation",
            AppError::State(_) => "state",
            AppError::BalanceFrozen { .. } => "balance_frozen",
            AppError::AlreadyFinalized(_) => "already_finalized",
            AppError::Authorization(_) => "authorization",
            AppError::Consistency(_) => "consistency",
            AppError::NotFound(_) => "not_found",
            AppError::Config(_) => "config",
            AppError::Export(_) => "export",
            AppError::Other(_) => "internal",
        }
    }

    /// Storage failures inside an atomic batch are reported as consistency
    /// errors; domain errors pass through untouched.
    pub(crate) fn into_batch_error(self) -> AppError {
        match self {
            AppError::Db(e) => AppError::Consistency(e.to_string()),
            AppError::Io(e) => AppError::Consistency(e.to_string()),
            other => other,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_and_finalized_are_state_errors() {
        let frozen = AppError::BalanceFrozen {
            user: "alice".into(),
            category: "lunch".into(),
        };
        assert_eq!(frozen.kind(), ErrorKind::State);
        assert_eq!(frozen.code(), "balance_frozen");

        let fin = AppError::AlreadyFinalized("month 2025-09".into());
        assert_eq!(fin.kind(), ErrorKind::State);
        assert_eq!(fin.code(), "already_finalized");
    }

    #[test]
    fn db_errors_become_consistency_inside_batches() {
        let e = AppError::Db(rusqlite::Error::InvalidQuery).into_batch_error();
        assert_eq!(e.kind(), ErrorKind::Consistency);

        let v = AppError::Validation("x".into()).into_batch_error();
        assert_eq!(v.kind(), ErrorKind::Validation);
    }
}
