use super::state::PeriodState;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billing period definition. One per (year, month).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthSettings {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lunch_rate: Option<Decimal>,
    pub dinner_rate: Option<Decimal>,
    pub state: PeriodState,
}

impl MonthSettings {
    pub fn is_finalized(&self) -> bool {
        self.state.is_finalized()
    }

    pub fn label(&self) -> String {
        format!("month {:04}-{:02}", self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// Values accepted by `save` and by override updates. Absent fields keep
/// their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MonthSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunch_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dinner_rate: Option<Decimal>,
}

/// Where a user stands after a period's charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Due,
    Advance,
    Settled,
}

/// One row of a dry-run month calculation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreviewRow {
    pub user_id: i64,
    pub user_name: String,
    pub lunch_meals: u32,
    pub dinner_meals: u32,
    pub lunch_cost: Decimal,
    pub dinner_cost: Decimal,
    pub breakfast_cost: Decimal,
    pub total_cost: Decimal,
    pub deposits: Decimal,
    pub net: Decimal,
    pub status: SettlementStatus,
    pub is_defaulter: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthPreview {
    pub settings_id: i64,
    pub year: i32,
    pub month: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lunch_rate: Decimal,
    pub dinner_rate: Decimal,
    pub rows: Vec<PreviewRow>,
}
