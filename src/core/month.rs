//! Billing periods: default creation, rate editing, the dry-run preview and
//! the one-way finalization that charges lunch and dinner.

use crate::core::attendance::{AttendanceLogic, AttendanceRules};
use crate::core::auth::{Authorizer, PrivilegedOp};
use crate::core::calculator::settlement::{ChargeTarget, classify, is_defaulter, plan_commit};
use crate::core::ledger::LedgerLogic;
use crate::db::breakfast::list_entries;
use crate::db::ledger::{deposits_between, net_by_source};
use crate::db::log::ttlog;
use crate::db::months::{
    cas_status, find_by_period, get_by_id, insert_draft_if_missing, list_settings, update_values,
};
use crate::db::pool::DbPool;
use crate::db::users::{get_by_id as get_user, list_users};
use crate::errors::{AppError, AppResult};
use crate::models::category::MealCategory;
use crate::models::month_settings::{MonthPreview, MonthSettings, MonthSettingsPatch, PreviewRow};
use crate::models::state::{EntryState, PeriodAction};
use crate::models::transaction::{Transaction, TxSource};
use crate::models::user::User;
use crate::utils::date::month_bounds;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub struct MonthLogic;

impl MonthLogic {
    pub fn get_or_create_default(pool: &mut DbPool, year: i32, month: u32) -> AppResult<MonthSettings> {
        let (start, end) = month_bounds(year, month)?;
        pool.atomic(|conn| {
            if let Some(existing) = find_by_period(conn, year, month)? {
                return Ok(existing);
            }
            insert_draft_if_missing(conn, year, month, &start, &end)?;
            let created = find_by_period(conn, year, month)?
                .ok_or_else(|| AppError::Consistency(format!("month {year:04}-{month:02} vanished")))?;
            ttlog(conn, "month_create", &created.label(), "draft created")?;
            Ok(created)
        })
    }

    /// Apply a patch to a copy of `settings`, validating the result.
    pub fn apply_patch(settings: &MonthSettings, patch: &MonthSettingsPatch) -> AppResult<MonthSettings> {
        let mut next = settings.clone();
        if let Some(d) = patch.start_date {
            next.start_date = d;
        }
        if let Some(d) = patch.end_date {
            next.end_date = d;
        }
        if let Some(r) = patch.lunch_rate {
            next.lunch_rate = Some(r);
        }
        if let Some(r) = patch.dinner_rate {
            next.dinner_rate = Some(r);
        }

        if next.start_date > next.end_date {
            return Err(AppError::Validation(format!(
                "start date {} is after end date {}",
                next.start_date, next.end_date
            )));
        }
        for rate in [next.lunch_rate, next.dinner_rate].into_iter().flatten() {
            if rate.is_sign_negative() && !rate.is_zero() {
                return Err(AppError::Validation(format!("rate must not be negative: {rate}")));
            }
        }
        Ok(next)
    }

    /// Upsert the draft for a period. A finalized period is read-only here.
    pub fn save(
        pool: &mut DbPool,
        year: i32,
        month: u32,
        patch: &MonthSettingsPatch,
    ) -> AppResult<MonthSettings> {
        let current = Self::get_or_create_default(pool, year, month)?;
        pool.atomic(|conn| {
            let current = get_by_id(conn, current.id)?;
            if current.is_finalized() {
                return Err(AppError::AlreadyFinalized(current.label()));
            }
            let next = Self::apply_patch(&current, patch)?;
            update_values(conn, &next)?;
            ttlog(
                conn,
                "month_save",
                &next.label(),
                &format!(
                    "{}..{} lunch={} dinner={}",
                    next.start_date,
                    next.end_date,
                    rate_label(next.lunch_rate),
                    rate_label(next.dinner_rate)
                ),
            )?;
            Ok(next)
        })
    }

    pub fn find(pool: &mut DbPool, year: i32, month: u32) -> AppResult<Option<MonthSettings>> {
        pool.read(|conn| find_by_period(conn, year, month))
    }

    pub fn get(pool: &mut DbPool, settings_id: i64) -> AppResult<MonthSettings> {
        pool.read(|conn| get_by_id(conn, settings_id))
    }

    pub fn list(pool: &mut DbPool) -> AppResult<Vec<MonthSettings>> {
        pool.read(list_settings)
    }

    /// Users a period is computed for: everyone active plus anyone the
    /// period has already charged. Ordered by id.
    fn period_users(conn: &Connection, settings: &MonthSettings) -> AppResult<Vec<User>> {
        let mut users = list_users(conn, true)?;
        for (user_id, _, _) in net_by_source(conn, TxSource::Month(settings.id))? {
            if !users.iter().any(|u| u.id == user_id) {
                users.push(get_user(conn, user_id)?);
            }
        }
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    /// Lunch and dinner charges per user for the period's current data.
    pub fn charge_targets_in(
        conn: &Connection,
        rules: &AttendanceRules,
        settings: &MonthSettings,
    ) -> AppResult<Vec<ChargeTarget>> {
        let mut targets = Vec::new();
        for user in Self::period_users(conn, settings)? {
            for category in MealCategory::RATED {
                let meals = AttendanceLogic::meal_count_in(
                    conn,
                    rules,
                    user.id,
                    category,
                    settings.start_date,
                    settings.end_date,
                )?;
                targets.push(ChargeTarget {
                    user_id: user.id,
                    category,
                    charge: rate_of(settings, category) * Decimal::from(meals),
                });
            }
        }
        Ok(targets)
    }

    /// Re-run the period's charge against what it already committed.
    pub fn recharge_in(
        conn: &Connection,
        rules: &AttendanceRules,
        settings: &MonthSettings,
        actor: &str,
        is_override: bool,
        include_zero: bool,
    ) -> AppResult<Vec<Transaction>> {
        let source = TxSource::Month(settings.id);
        let targets = Self::charge_targets_in(conn, rules, settings)?;
        let committed = net_by_source(conn, source)?;
        let plan = plan_commit(&targets, &committed, include_zero);
        LedgerLogic::commit_plan_in(
            conn,
            &plan,
            source,
            &format!("Meals {}", settings.label()),
            actor,
            is_override,
        )
    }

    pub fn preview_in(
        conn: &Connection,
        rules: &AttendanceRules,
        threshold: Decimal,
        settings: &MonthSettings,
    ) -> AppResult<MonthPreview> {
        let lunch_rate = rate_of(settings, MealCategory::Lunch);
        let dinner_rate = rate_of(settings, MealCategory::Dinner);

        let breakfasts: Vec<_> = list_entries(conn, &settings.start_date, &settings.end_date)?
            .into_iter()
            .filter(|e| e.state == EntryState::Finalized)
            .collect();

        let mut rows = Vec::new();
        for user in Self::period_users(conn, settings)? {
            let (start, end) = (settings.start_date, settings.end_date);
            let lunch_meals =
                AttendanceLogic::meal_count_in(conn, rules, user.id, MealCategory::Lunch, start, end)?;
            let dinner_meals =
                AttendanceLogic::meal_count_in(conn, rules, user.id, MealCategory::Dinner, start, end)?;

            let lunch_cost = (lunch_rate * Decimal::from(lunch_meals)).normalize();
            let dinner_cost = (dinner_rate * Decimal::from(dinner_meals)).normalize();
            let breakfast_cost: Decimal = breakfasts
                .iter()
                .flat_map(|e| e.participants.iter())
                .filter(|p| p.user_id == user.id)
                .map(|p| p.cost)
                .sum::<Decimal>()
                .normalize();
            let total_cost = (lunch_cost + dinner_cost + breakfast_cost).normalize();
            let deposits = deposits_between(conn, user.id, &start, &end)?.normalize();
            let net = (deposits - total_cost).normalize();

            rows.push(PreviewRow {
                user_id: user.id,
                user_name: user.name,
                lunch_meals,
                dinner_meals,
                lunch_cost,
                dinner_cost,
                breakfast_cost,
                total_cost,
                deposits,
                net,
                status: classify(net),
                is_defaulter: is_defaulter(net, threshold),
            });
        }

        Ok(MonthPreview {
            settings_id: settings.id,
            year: settings.year,
            month: settings.month,
            start_date: settings.start_date,
            end_date: settings.end_date,
            lunch_rate: lunch_rate.normalize(),
            dinner_rate: dinner_rate.normalize(),
            rows,
        })
    }

    /// Dry run of the period. Reads one snapshot and writes nothing.
    pub fn preview(
        pool: &mut DbPool,
        rules: &AttendanceRules,
        threshold: Decimal,
        settings_id: i64,
    ) -> AppResult<MonthPreview> {
        pool.read(|conn| {
            let settings = get_by_id(conn, settings_id)?;
            Self::preview_in(conn, rules, threshold, &settings)
        })
    }

    /// Lock the period and charge every user for lunch and dinner.
    pub fn finalize(
        pool: &mut DbPool,
        auth: &dyn Authorizer,
        actor: &str,
        rules: &AttendanceRules,
        settings_id: i64,
    ) -> AppResult<Vec<Transaction>> {
        auth.authorize(actor, PrivilegedOp::FinalizeMonth)?;

        pool.atomic(|conn| {
            let settings = get_by_id(conn, settings_id)?;
            let next = settings.state.next(PeriodAction::Finalize, &settings.label())?;
            if settings.lunch_rate.is_none() || settings.dinner_rate.is_none() {
                return Err(AppError::Validation(format!(
                    "{} needs both lunch and dinner rates before finalizing",
                    settings.label()
                )));
            }
            if !cas_status(conn, settings.id, settings.state, next)? {
                return Err(AppError::AlreadyFinalized(settings.label()));
            }

            let txs = Self::recharge_in(conn, rules, &settings, actor, false, true)?;
            let total: Decimal = txs.iter().map(|t| t.amount).sum();

            ttlog(
                conn,
                "month_finalize",
                &settings.label(),
                &format!("{} transaction(s), net {}", txs.len(), total.normalize()),
            )?;
            Ok(txs)
        })
    }
}

fn rate_of(settings: &MonthSettings, category: MealCategory) -> Decimal {
    match category {
        MealCategory::Lunch => settings.lunch_rate.unwrap_or(Decimal::ZERO),
        MealCategory::Dinner => settings.dinner_rate.unwrap_or(Decimal::ZERO),
        MealCategory::Breakfast => Decimal::ZERO,
    }
}

pub(crate) fn rate_label(rate: Option<Decimal>) -> String {
    rate.map(|r| r.normalize().to_string())
        .unwrap_or_else(|| "unset".to_string())
}
