pub mod backup;
pub mod balance;
pub mod breakfast;
pub mod config;
pub mod correct;
pub mod db;
pub mod deposit;
pub mod export;
pub mod history;
pub mod init;
pub mod log;
pub mod meal;
pub mod month;
pub mod user;

use crate::config::Config;
use crate::core::month::MonthLogic;
use crate::core::users::UserLogic;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::models::breakfast::CostInput;
use crate::models::category::MealCategory;
use crate::models::user::User;
use crate::utils::date::parse_year_month;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

pub(crate) fn open_pool(cfg: &Config) -> AppResult<DbPool> {
    DbPool::new(&cfg.database)
}

pub(crate) fn parse_amount(s: &str) -> AppResult<Decimal> {
    Decimal::from_str(s.trim()).map_err(|_| AppError::InvalidAmount(s.to_string()))
}

pub(crate) fn parse_category(s: &str) -> AppResult<MealCategory> {
    MealCategory::from_code(s.trim()).ok_or_else(|| {
        AppError::Validation(format!(
            "unknown category '{s}' (expected breakfast, lunch or dinner)"
        ))
    })
}

/// Lunch or dinner; breakfast has no attendance sheet.
pub(crate) fn parse_meal(s: &str) -> AppResult<MealCategory> {
    let meal = parse_category(s)?;
    if !meal.is_metered() {
        return Err(AppError::Validation(format!(
            "'{s}' is not a metered meal (expected lunch or dinner)"
        )));
    }
    Ok(meal)
}

pub(crate) fn resolve_user(pool: &mut DbPool, name: &str) -> AppResult<User> {
    UserLogic::resolve(pool, name)
}

/// Id -> name, inactive users included.
pub(crate) fn user_names(pool: &mut DbPool) -> AppResult<HashMap<i64, String>> {
    Ok(UserLogic::list(pool, false)?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

pub(crate) fn name_of(names: &HashMap<i64, String>, id: i64) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("#{id}"))
}

/// A month is addressed as `YYYY-MM` or by settings id. With `create` the
/// default draft of a `YYYY-MM` period is created on first use.
pub(crate) fn resolve_month_id(pool: &mut DbPool, s: &str, create: bool) -> AppResult<i64> {
    if let Ok(id) = s.trim().parse::<i64>() {
        return Ok(id);
    }
    let (year, month) = parse_year_month(s)?;
    if create {
        return Ok(MonthLogic::get_or_create_default(pool, year, month)?.id);
    }
    MonthLogic::find(pool, year, month)?
        .map(|m| m.id)
        .ok_or_else(|| AppError::NotFound(format!("month {s}")))
}

/// Build the cost input of a breakfast from `--equal/--users` or `--cost`.
/// Returns `None` when neither was given.
pub(crate) fn parse_cost_input(
    pool: &mut DbPool,
    equal: Option<&str>,
    users: &[String],
    costs: &[String],
) -> AppResult<Option<CostInput>> {
    match (equal, costs.is_empty()) {
        (Some(_), false) => Err(AppError::Validation(
            "use either --equal with --users or --cost, not both".into(),
        )),
        (Some(total), true) => {
            let total = parse_amount(total)?;
            let mut participants = Vec::with_capacity(users.len());
            for name in users {
                participants.push(resolve_user(pool, name)?.id);
            }
            Ok(Some(CostInput::Equal {
                total,
                participants,
            }))
        }
        (None, false) => {
            let mut items = Vec::with_capacity(costs.len());
            for item in costs {
                let (name, amount) = item.split_once('=').ok_or_else(|| {
                    AppError::Validation(format!("expected USER=AMOUNT, got '{item}'"))
                })?;
                items.push((resolve_user(pool, name)?.id, parse_amount(amount)?));
            }
            Ok(Some(CostInput::Individual(items)))
        }
        (None, true) => {
            if users.is_empty() {
                Ok(None)
            } else {
                Err(AppError::Validation("--users needs --equal <TOTAL>".into()))
            }
        }
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
