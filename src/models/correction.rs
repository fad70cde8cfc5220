use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionAction {
    ForceUpdate,
    ForceUnfinalize,
    BalanceCorrection,
    TransactionVoid,
}

impl CorrectionAction {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CorrectionAction::ForceUpdate => "force_update",
            CorrectionAction::ForceUnfinalize => "force_unfinalize",
            CorrectionAction::BalanceCorrection => "balance_correction",
            CorrectionAction::TransactionVoid => "transaction_void",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "force_update" => Some(CorrectionAction::ForceUpdate),
            "force_unfinalize" => Some(CorrectionAction::ForceUnfinalize),
            "balance_correction" => Some(CorrectionAction::BalanceCorrection),
            "transaction_void" => Some(CorrectionAction::TransactionVoid),
            _ => None,
        }
    }
}

/// Kinds of artifacts an override may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    MonthSettings,
    BreakfastEntry,
    MealRecord,
    Balance,
    Transaction,
}

impl TargetType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TargetType::MonthSettings => "month_settings",
            TargetType::BreakfastEntry => "breakfast_entry",
            TargetType::MealRecord => "meal_record",
            TargetType::Balance => "balance",
            TargetType::Transaction => "transaction",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "month_settings" => Some(TargetType::MonthSettings),
            "breakfast_entry" => Some(TargetType::BreakfastEntry),
            "meal_record" => Some(TargetType::MealRecord),
            "balance" => Some(TargetType::Balance),
            "transaction" => Some(TargetType::Transaction),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().replace('-', "_").as_str() {
            "month" => Some(TargetType::MonthSettings),
            "breakfast" => Some(TargetType::BreakfastEntry),
            "meal" => Some(TargetType::MealRecord),
            other => Self::from_db_str(other),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// Immutable audit row written by every override.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CorrectionLogEntry {
    pub id: i64,
    pub action: CorrectionAction,
    pub target_type: TargetType,
    /// Balances are addressed as `<user_id>:<category>`, everything else by row id.
    pub target_id: String,
    pub previous_value: Value,
    pub new_value: Value,
    pub reason: String,
    pub performed_by: String,
    pub created_at: String,
}
