use super::category::MealCategory;
use rust_decimal::Decimal;
use serde::Serialize;

/// Current amount per (user, category). Positive means money in advance,
/// negative means money due.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Balance {
    pub user_id: i64,
    pub category: MealCategory,
    pub amount: Decimal,
    pub is_frozen: bool,
}

impl Balance {
    pub fn empty(user_id: i64, category: MealCategory) -> Self {
        Self {
            user_id,
            category,
            amount: Decimal::ZERO,
            is_frozen: false,
        }
    }
}
