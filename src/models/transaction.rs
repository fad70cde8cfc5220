use super::category::MealCategory;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Deduction,
    Adjustment,
    Refund,
    Reversal,
}

impl TransactionType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Deduction => "deduction",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Refund => "refund",
            TransactionType::Reversal => "reversal",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "deduction" => Some(TransactionType::Deduction),
            "adjustment" => Some(TransactionType::Adjustment),
            "refund" => Some(TransactionType::Refund),
            "reversal" => Some(TransactionType::Reversal),
            _ => None,
        }
    }

    /// Sign applied to a caller-supplied magnitude.
    /// `None` means the caller supplies an already signed amount.
    pub fn fixed_sign(&self) -> Option<i8> {
        match self {
            TransactionType::Deposit | TransactionType::Refund => Some(1),
            TransactionType::Deduction => Some(-1),
            TransactionType::Adjustment | TransactionType::Reversal => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// Artifact that produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TxSource {
    Manual,
    Breakfast(i64),
    Month(i64),
    Correction(i64),
}

impl TxSource {
    pub fn to_db_parts(&self) -> (&'static str, Option<i64>) {
        match self {
            TxSource::Manual => ("manual", None),
            TxSource::Breakfast(id) => ("breakfast", Some(*id)),
            TxSource::Month(id) => ("month", Some(*id)),
            TxSource::Correction(id) => ("correction", Some(*id)),
        }
    }

    pub fn from_db_parts(kind: &str, id: Option<i64>) -> Option<Self> {
        match (kind, id) {
            ("manual", _) => Some(TxSource::Manual),
            ("breakfast", Some(id)) => Some(TxSource::Breakfast(id)),
            ("month", Some(id)) => Some(TxSource::Month(id)),
            ("correction", Some(id)) => Some(TxSource::Correction(id)),
            _ => None,
        }
    }
}

/// Immutable ledger row. `amount` is signed; `previous_balance + amount == new_balance`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub category: MealCategory,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub description: String,
    pub performed_by: String,
    pub created_at: String,
    pub is_reversed: bool,
    pub source: TxSource,
    pub reverses_id: Option<i64>,
}

/// What a caller asks the ledger to record.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub user_id: i64,
    pub category: MealCategory,
    pub kind: TransactionType,
    /// Magnitude for deposit/deduction/refund, signed for adjustment/reversal.
    pub amount: Decimal,
    pub description: String,
    pub performed_by: String,
    pub source: TxSource,
    /// Set only by the override subsystem; lets the entry through a freeze.
    pub is_override: bool,
    /// Transaction this one cancels (reversal pairs only).
    pub reverses_id: Option<i64>,
}

impl TxRequest {
    pub fn new(
        user_id: i64,
        category: MealCategory,
        kind: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
        performed_by: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            category,
            kind,
            amount,
            description: description.into(),
            performed_by: performed_by.into(),
            source: TxSource::Manual,
            is_override: false,
            reverses_id: None,
        }
    }

    pub fn with_source(mut self, source: TxSource) -> Self {
        self.source = source;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }
}

/// Filter for history queries; every field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub category: Option<MealCategory>,
    pub kind: Option<TransactionType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_reversed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}
