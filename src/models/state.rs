//! Lifecycle states of lockable artifacts and their transition tables.
//!
//! Every state change goes through `next()`; a pair that is not in the table
//! is rejected there, so callers never compare raw flags.

use crate::errors::{AppError, AppResult};
use serde::Serialize;
use std::fmt;

/// Lifecycle of a billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodState {
    Draft,
    Finalized,
    Reopened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodAction {
    Finalize,
    /// Override only.
    Reopen,
}

impl PeriodState {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PeriodState::Draft => "draft",
            PeriodState::Finalized => "finalized",
            PeriodState::Reopened => "reopened",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PeriodState::Draft),
            "finalized" => Some(PeriodState::Finalized),
            "reopened" => Some(PeriodState::Reopened),
            _ => None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, PeriodState::Finalized)
    }

    pub fn next(self, action: PeriodAction, what: &str) -> AppResult<PeriodState> {
        use PeriodAction::*;
        use PeriodState::*;
        match (self, action) {
            (Draft | Reopened, Finalize) => Ok(Finalized),
            (Finalized, Reopen) => Ok(Reopened),
            (Finalized, Finalize) => Err(AppError::AlreadyFinalized(what.to_string())),
            (Draft | Reopened, Reopen) => Err(AppError::State(format!("{what} is not finalized"))),
        }
    }
}

impl fmt::Display for PeriodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// Lifecycle of a breakfast entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Draft,
    Finalized,
    Reopened,
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Deduct,
    Reverse,
    /// Override only.
    Reopen,
}

impl EntryState {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntryState::Draft => "draft",
            EntryState::Finalized => "finalized",
            EntryState::Reopened => "reopened",
            EntryState::Reversed => "reversed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EntryState::Draft),
            "finalized" => Some(EntryState::Finalized),
            "reopened" => Some(EntryState::Reopened),
            "reversed" => Some(EntryState::Reversed),
            _ => None,
        }
    }

    /// A reversed entry stays finalized: it is locked for ordinary edits.
    pub fn is_finalized(&self) -> bool {
        matches!(self, EntryState::Finalized | EntryState::Reversed)
    }

    pub fn is_reversed(&self) -> bool {
        matches!(self, EntryState::Reversed)
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, EntryState::Draft | EntryState::Reopened)
    }

    pub fn next(self, action: EntryAction, what: &str) -> AppResult<EntryState> {
        use EntryAction::*;
        use EntryState::*;
        match (self, action) {
            (Draft | Reopened, Deduct) => Ok(Finalized),
            (Finalized | Reversed, Deduct) => Err(AppError::AlreadyFinalized(what.to_string())),
            (Finalized, Reverse) => Ok(Reversed),
            (Reversed, Reverse) => Err(AppError::State(format!("{what} is already reversed"))),
            (Draft | Reopened, Reverse) => {
                Err(AppError::State(format!("{what} is not finalized")))
            }
            (Finalized | Reversed, Reopen) => Ok(Reopened),
            (Draft | Reopened, Reopen) => Err(AppError::State(format!("{what} is not finalized"))),
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
