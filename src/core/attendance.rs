//! Daily meal attendance.
//!
//! A stored row only wins over the default rules when `is_manually_set`;
//! otherwise the holiday and weekday rules decide `is_on` and the row only
//! contributes its count.

use crate::config::Config;
use crate::db::log::ttlog;
use crate::db::meals::{
    delete_holiday, find_record, insert_holiday, is_holiday, load_holidays, load_records,
    upsert_record,
};
use crate::db::months::finalized_covering;
use crate::db::pool::DbPool;
use crate::db::users::get_by_id;
use crate::errors::{AppError, AppResult};
use crate::models::category::MealCategory;
use crate::models::meal_record::{DailyMealRecord, Holiday};
use crate::utils::date::days_between;
use chrono::{Datelike, NaiveDate, Weekday};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct AttendanceRules {
    pub default_off: Vec<Weekday>,
    pub max_count: u32,
}

impl AttendanceRules {
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        Ok(Self {
            default_off: cfg.off_weekdays()?,
            max_count: cfg.max_meal_count,
        })
    }

    fn off_by_rule(&self, date: NaiveDate, holiday: bool) -> bool {
        holiday || self.default_off.contains(&date.weekday())
    }

    pub fn clamp(&self, count: i64) -> u32 {
        count.clamp(0, self.max_count as i64) as u32
    }
}

impl Default for AttendanceRules {
    fn default() -> Self {
        Self {
            default_off: Vec::new(),
            max_count: 10,
        }
    }
}

/// Both metered meals of one day.
#[derive(Debug, Clone, Serialize)]
pub struct SheetDay {
    pub date: NaiveDate,
    pub is_holiday: bool,
    pub lunch: DailyMealRecord,
    pub dinner: DailyMealRecord,
}

/// Resolve one record from its stored row (if any) and the day's rules.
pub fn resolve(
    rules: &AttendanceRules,
    date: NaiveDate,
    user_id: i64,
    meal: MealCategory,
    stored: Option<&DailyMealRecord>,
    holiday: bool,
) -> DailyMealRecord {
    let rule_on = !rules.off_by_rule(date, holiday);
    match stored {
        Some(rec) if rec.is_manually_set => rec.clone(),
        Some(rec) => DailyMealRecord {
            is_on: rule_on,
            ..rec.clone()
        },
        None => DailyMealRecord {
            id: None,
            date,
            user_id,
            meal,
            is_on: rule_on,
            count: 1,
            is_manually_set: false,
        },
    }
}

fn ensure_metered(meal: MealCategory) -> AppResult<()> {
    if meal.is_metered() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{meal} is not tracked by attendance; use breakfast entries"
        )))
    }
}

fn ensure_active(conn: &Connection, user_id: i64) -> AppResult<()> {
    let user = get_by_id(conn, user_id)?;
    if user.is_active {
        Ok(())
    } else {
        Err(AppError::Validation(format!("user '{}' is inactive", user.name)))
    }
}

pub struct AttendanceLogic;

impl AttendanceLogic {
    /// A date that belongs to a finalized month only changes through an override.
    pub fn ensure_unlocked(conn: &Connection, date: NaiveDate) -> AppResult<()> {
        match finalized_covering(conn, &date)?.first() {
            Some(month) => Err(AppError::State(format!(
                "{date} belongs to finalized {}",
                month.label()
            ))),
            None => Ok(()),
        }
    }

    pub fn effective_in(
        conn: &Connection,
        rules: &AttendanceRules,
        date: NaiveDate,
        user_id: i64,
        meal: MealCategory,
    ) -> AppResult<DailyMealRecord> {
        ensure_metered(meal)?;
        let stored = find_record(conn, &date, user_id, meal)?;
        let holiday = is_holiday(conn, &date)?;
        Ok(resolve(rules, date, user_id, meal, stored.as_ref(), holiday))
    }

    pub fn get(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        date: NaiveDate,
        user_id: i64,
        meal: MealCategory,
    ) -> AppResult<DailyMealRecord> {
        pool.read(|conn| Self::effective_in(conn, rules, date, user_id, meal))
    }

    /// Flip the effective value and pin it as a manual choice.
    pub fn toggle(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        date: NaiveDate,
        user_id: i64,
        meal: MealCategory,
    ) -> AppResult<DailyMealRecord> {
        pool.atomic(|conn| {
            let current = Self::effective_in(conn, rules, date, user_id, meal)?;
            Self::write_manual(conn, current.clone(), !current.is_on, "meal_toggle")
        })
    }

    pub fn set(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        date: NaiveDate,
        user_id: i64,
        meal: MealCategory,
        is_on: bool,
    ) -> AppResult<DailyMealRecord> {
        pool.atomic(|conn| {
            let current = Self::effective_in(conn, rules, date, user_id, meal)?;
            Self::write_manual(conn, current, is_on, "meal_set")
        })
    }

    fn write_manual(
        conn: &Connection,
        mut rec: DailyMealRecord,
        is_on: bool,
        op: &str,
    ) -> AppResult<DailyMealRecord> {
        ensure_active(conn, rec.user_id)?;
        Self::ensure_unlocked(conn, rec.date)?;

        rec.is_on = is_on;
        rec.is_manually_set = true;
        rec.id = Some(upsert_record(conn, &rec)?);

        ttlog(
            conn,
            op,
            &format!("user#{}:{}:{}", rec.user_id, rec.date, rec.meal),
            if is_on { "on" } else { "off" },
        )?;
        Ok(rec)
    }

    /// Set the guest multiplier. Out-of-range values are clamped, not rejected.
    pub fn update_count(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        date: NaiveDate,
        user_id: i64,
        meal: MealCategory,
        count: i64,
    ) -> AppResult<DailyMealRecord> {
        pool.atomic(|conn| {
            let mut rec = Self::effective_in(conn, rules, date, user_id, meal)?;
            ensure_active(conn, user_id)?;
            Self::ensure_unlocked(conn, date)?;

            rec.count = rules.clamp(count);
            rec.id = Some(upsert_record(conn, &rec)?);

            ttlog(
                conn,
                "meal_count",
                &format!("user#{user_id}:{date}:{meal}"),
                &format!("count={}", rec.count),
            )?;
            Ok(rec)
        })
    }

    /// Effective records of one user and meal for every day of the range.
    pub fn records_in(
        conn: &Connection,
        rules: &AttendanceRules,
        user_id: i64,
        meal: MealCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DailyMealRecord>> {
        ensure_metered(meal)?;
        let stored: HashMap<NaiveDate, DailyMealRecord> =
            load_records(conn, user_id, meal, &start, &end)?
                .into_iter()
                .map(|r| (r.date, r))
                .collect();
        let holidays: HashSet<NaiveDate> = load_holidays(conn, &start, &end)?
            .into_iter()
            .map(|h| h.date)
            .collect();

        Ok(days_between(start, end)
            .into_iter()
            .map(|d| resolve(rules, d, user_id, meal, stored.get(&d), holidays.contains(&d)))
            .collect())
    }

    /// Σ count over the days the meal is on.
    pub fn meal_count_in(
        conn: &Connection,
        rules: &AttendanceRules,
        user_id: i64,
        meal: MealCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<u32> {
        Ok(Self::records_in(conn, rules, user_id, meal, start, end)?
            .iter()
            .map(DailyMealRecord::billable)
            .sum())
    }

    pub fn meal_count(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        user_id: i64,
        meal: MealCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<u32> {
        pool.read(|conn| Self::meal_count_in(conn, rules, user_id, meal, start, end))
    }

    pub fn sheet(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<SheetDay>> {
        pool.read(|conn| {
            get_by_id(conn, user_id)?;
            let lunch = Self::records_in(conn, rules, user_id, MealCategory::Lunch, start, end)?;
            let dinner = Self::records_in(conn, rules, user_id, MealCategory::Dinner, start, end)?;
            let holidays: HashSet<NaiveDate> = load_holidays(conn, &start, &end)?
                .into_iter()
                .map(|h| h.date)
                .collect();

            Ok(lunch
                .into_iter()
                .zip(dinner)
                .map(|(l, d)| SheetDay {
                    date: l.date,
                    is_holiday: holidays.contains(&l.date),
                    lunch: l,
                    dinner: d,
                })
                .collect())
        })
    }

    pub fn add_holiday(pool: &mut DbPool, date: NaiveDate, description: &str) -> AppResult<()> {
        pool.atomic(|conn| {
            Self::ensure_unlocked(conn, date)?;
            insert_holiday(
                conn,
                &Holiday {
                    date,
                    description: description.to_string(),
                },
            )?;
            ttlog(conn, "holiday_add", &date.to_string(), description)
        })
    }

    pub fn remove_holiday(pool: &mut DbPool, date: NaiveDate) -> AppResult<()> {
        pool.atomic(|conn| {
            Self::ensure_unlocked(conn, date)?;
            if delete_holiday(conn, &date)? == 0 {
                return Err(AppError::NotFound(format!("holiday on {date}")));
            }
            ttlog(conn, "holiday_del", &date.to_string(), "removed")
        })
    }

    pub fn list_holidays(
        pool: &mut DbPool,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Holiday>> {
        pool.read(|conn| load_holidays(conn, &start, &end))
    }
}
