use serde::Serialize;
use std::fmt;

/// Meal category a balance is kept for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealCategory {
    pub const ALL: [MealCategory; 3] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
    ];

    /// Categories charged by rate at month closing.
    pub const RATED: [MealCategory; 2] = [MealCategory::Lunch, MealCategory::Dinner];

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MealCategory::Breakfast => "breakfast",
            MealCategory::Lunch => "lunch",
            MealCategory::Dinner => "dinner",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "breakfast" => Some(MealCategory::Breakfast),
            "lunch" => Some(MealCategory::Lunch),
            "dinner" => Some(MealCategory::Dinner),
            _ => None,
        }
    }

    /// Helper: parse user input (case-insensitive, single-letter codes allowed)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "b" => Some(MealCategory::Breakfast),
            "l" => Some(MealCategory::Lunch),
            "d" => Some(MealCategory::Dinner),
            other => Self::from_db_str(other),
        }
    }

    /// Only lunch and dinner are metered by daily attendance.
    pub fn is_metered(&self) -> bool {
        matches!(self, MealCategory::Lunch | MealCategory::Dinner)
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
