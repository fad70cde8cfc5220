// src/export/model.rs

use crate::models::balance::Balance;
use crate::models::correction::CorrectionLogEntry;
use crate::models::transaction::Transaction;
use serde::Serialize;

/// Flat transaction row. Amounts are plain decimal strings.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub kind: String,
    pub amount: String,
    pub previous_balance: String,
    pub new_balance: String,
    pub description: String,
    pub performed_by: String,
    pub created_at: String,
    pub is_reversed: bool,
    pub source_type: String,
    pub source_id: Option<i64>,
    pub reverses_id: Option<i64>,
}

impl From<&Transaction> for TransactionRecord {
    fn from(t: &Transaction) -> Self {
        let (source_type, source_id) = t.source.to_db_parts();
        Self {
            id: t.id,
            user_id: t.user_id,
            category: t.category.to_string(),
            kind: t.kind.to_string(),
            amount: t.amount.normalize().to_string(),
            previous_balance: t.previous_balance.normalize().to_string(),
            new_balance: t.new_balance.normalize().to_string(),
            description: t.description.clone(),
            performed_by: t.performed_by.clone(),
            created_at: t.created_at.clone(),
            is_reversed: t.is_reversed,
            source_type: source_type.to_string(),
            source_id,
            reverses_id: t.reverses_id,
        }
    }
}

/// Correction row; previous/new values are embedded as compact JSON text.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CorrectionRecord {
    pub id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub previous_value: String,
    pub new_value: String,
    pub reason: String,
    pub performed_by: String,
    pub created_at: String,
}

impl From<&CorrectionLogEntry> for CorrectionRecord {
    fn from(c: &CorrectionLogEntry) -> Self {
        Self {
            id: c.id,
            action: c.action.to_db_str().to_string(),
            target_type: c.target_type.to_string(),
            target_id: c.target_id.clone(),
            previous_value: c.previous_value.to_string(),
            new_value: c.new_value.to_string(),
            reason: c.reason.clone(),
            performed_by: c.performed_by.clone(),
            created_at: c.created_at.clone(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BalanceRecord {
    pub user_id: i64,
    pub user_name: String,
    pub category: String,
    pub amount: String,
    pub is_frozen: bool,
}

impl BalanceRecord {
    pub fn new(b: &Balance, user_name: &str) -> Self {
        Self {
            user_id: b.user_id,
            user_name: user_name.to_string(),
            category: b.category.to_string(),
            amount: b.amount.normalize().to_string(),
            is_frozen: b.is_frozen,
        }
    }
}
