use super::state::EntryState;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Participant {
    pub user_id: i64,
    pub cost: Decimal,
    pub deducted: bool,
}

/// Shared breakfast cost. `total_cost` always equals the sum of participant costs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreakfastEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub total_cost: Decimal,
    pub participants: Vec<Participant>,
    pub state: EntryState,
    pub reverse_reason: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl BreakfastEntry {
    pub fn is_finalized(&self) -> bool {
        self.state.is_finalized()
    }

    pub fn is_reversed(&self) -> bool {
        self.state.is_reversed()
    }

    pub fn label(&self) -> String {
        format!("breakfast entry #{}", self.id)
    }
}

/// How the caller specifies costs when submitting or editing an entry.
#[derive(Debug, Clone)]
pub enum CostInput {
    /// One total divided among the given participants.
    Equal {
        total: Decimal,
        participants: Vec<i64>,
    },
    /// Explicit cost per participant.
    Individual(Vec<(i64, Decimal)>),
}
