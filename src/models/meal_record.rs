use super::category::MealCategory;
use chrono::NaiveDate;
use serde::Serialize;

/// Attendance of one user for one meal on one day.
///
/// `id` is `None` when the record is derived from the default rules and has
/// never been stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyMealRecord {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub user_id: i64,
    pub meal: MealCategory,
    pub is_on: bool,
    pub count: u32,
    pub is_manually_set: bool,
}

impl DailyMealRecord {
    /// Meals this record contributes to a period total.
    pub fn billable(&self) -> u32 {
        if self.is_on { self.count } else { 0 }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub description: String,
}
