//! Privileged corrections. Every action needs an authorized actor and a
//! reason, bypasses the finalization locks, and leaves exactly one row in
//! `correction_log` written in the same batch as its effect.

use crate::core::attendance::{AttendanceLogic, AttendanceRules};
use crate::core::auth::{Authorizer, PrivilegedOp};
use crate::core::breakfast::BreakfastLogic;
use crate::core::calculator::split::equal_shares;
use crate::core::ledger::LedgerLogic;
use crate::core::month::MonthLogic;
use crate::db::breakfast::{cas_status as cas_entry, get_entry, set_reverse_reason, update_entry};
use crate::db::corrections::{insert_correction, load_corrections};
use crate::db::ledger::{find_transaction, load_balance};
use crate::db::log::ttlog;
use crate::db::meals::{find_record_by_id, upsert_record};
use crate::db::months::{cas_status as cas_month, finalized_covering, get_by_id, update_values};
use crate::db::pool::DbPool;
use crate::db::users::get_by_id as get_user;
use crate::errors::{AppError, AppResult};
use crate::models::breakfast::{BreakfastEntry, Participant};
use crate::models::category::MealCategory;
use crate::models::correction::{CorrectionAction, CorrectionLogEntry, TargetType};
use crate::models::meal_record::DailyMealRecord;
use crate::models::month_settings::MonthSettingsPatch;
use crate::models::state::{EntryAction, PeriodAction};
use crate::models::transaction::{Page, Transaction, TransactionType, TxRequest, TxSource};
use crate::utils::date::parse_date;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;

/// New values for a breakfast entry. `equal_total` re-splits the total over
/// the current (or given) participants.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakfastPatch {
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub participants: Option<Vec<ParticipantCost>>,
    pub equal_total: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantCost {
    pub user_id: i64,
    #[serde(default)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MealRecordPatch {
    pub is_on: Option<bool>,
    pub count: Option<i64>,
}

/// What the caller runs corrections with.
pub struct CorrectionContext<'a> {
    pub auth: &'a dyn Authorizer,
    pub actor: &'a str,
    pub rules: &'a AttendanceRules,
    pub decimals: u32,
}

impl CorrectionContext<'_> {
    fn guard(&self, op: PrivilegedOp, reason: &str) -> AppResult<String> {
        self.auth.authorize(self.actor, op)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(format!("{op} requires a reason")));
        }
        Ok(reason.to_string())
    }
}

fn parse_patch<T: for<'de> Deserialize<'de>>(values: Value, what: &str) -> AppResult<T> {
    serde_json::from_value(values)
        .map_err(|e| AppError::Validation(format!("invalid values for {what}: {e}")))
}

fn parse_id(target_id: &str, what: &str) -> AppResult<i64> {
    target_id
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("invalid {what} id '{target_id}'")))
}

pub struct CorrectionLogic;

impl CorrectionLogic {
    /// Rewrite a finalized (or any) artifact. When the artifact already
    /// charged users, the difference is committed in the same batch.
    pub fn force_update(
        pool: &mut DbPool,
        ctx: &CorrectionContext,
        target_type: TargetType,
        target_id: &str,
        new_values: Value,
        reason: &str,
    ) -> AppResult<CorrectionLogEntry> {
        let reason = ctx.guard(PrivilegedOp::ForceUpdate, reason)?;

        let entry = pool.atomic(|conn| match target_type {
            TargetType::MonthSettings => {
                let patch: MonthSettingsPatch = parse_patch(new_values, "month settings")?;
                Self::update_month(conn, ctx, parse_id(target_id, "month settings")?, &patch, &reason)
            }
            TargetType::BreakfastEntry => {
                let patch: BreakfastPatch = parse_patch(new_values, "breakfast entry")?;
                Self::update_breakfast(conn, ctx, parse_id(target_id, "breakfast entry")?, &patch, &reason)
            }
            TargetType::MealRecord => {
                let patch: MealRecordPatch = parse_patch(new_values, "meal record")?;
                Self::update_meal(conn, ctx, target_id, &patch, &reason)
            }
            other => Err(AppError::Validation(format!(
                "force_update does not apply to {other}"
            ))),
        })?;
        Ok(entry)
    }

    fn update_month(
        conn: &Connection,
        ctx: &CorrectionContext,
        id: i64,
        patch: &MonthSettingsPatch,
        reason: &str,
    ) -> AppResult<CorrectionLogEntry> {
        let before = get_by_id(conn, id)?;
        let after = MonthLogic::apply_patch(&before, patch)?;
        update_values(conn, &after)?;

        let mut new_value = serde_json::to_value(&after)?;
        if after.is_finalized() {
            let txs = MonthLogic::recharge_in(conn, ctx.rules, &after, ctx.actor, true, false)?;
            new_value["compensating_transactions"] = json!(txs.iter().map(|t| t.id).collect::<Vec<_>>());
        }

        let entry = insert_correction(
            conn,
            CorrectionAction::ForceUpdate,
            TargetType::MonthSettings,
            &id.to_string(),
            &serde_json::to_value(&before)?,
            &new_value,
            reason,
            ctx.actor,
        )?;
        ttlog(conn, "force_update", &before.label(), reason)?;
        Ok(entry)
    }

    fn update_breakfast(
        conn: &Connection,
        ctx: &CorrectionContext,
        id: i64,
        patch: &BreakfastPatch,
        reason: &str,
    ) -> AppResult<CorrectionLogEntry> {
        let before = get_entry(conn, id)?;

        let mut costs: Vec<(i64, Decimal)> = match &patch.participants {
            Some(list) => list.iter().map(|p| (p.user_id, p.cost)).collect(),
            None => before.participants.iter().map(|p| (p.user_id, p.cost)).collect(),
        };
        if let Some(total) = patch.equal_total {
            let shares = equal_shares(total, costs.len(), ctx.decimals)?;
            for (slot, share) in costs.iter_mut().zip(shares) {
                slot.1 = share;
            }
        }
        if costs.is_empty() {
            return Err(AppError::Validation("at least one participant is required".into()));
        }
        let mut seen = HashSet::new();
        for (user_id, cost) in &costs {
            if !seen.insert(*user_id) {
                return Err(AppError::Validation(format!(
                    "user #{user_id} is listed twice"
                )));
            }
            if cost.is_sign_negative() && !cost.is_zero() {
                return Err(AppError::Validation(format!(
                    "cost of user #{user_id} must not be negative: {cost}"
                )));
            }
            get_user(conn, *user_id)?;
        }

        let charged = before.is_finalized();
        let participants: Vec<Participant> = costs
            .into_iter()
            .map(|(user_id, cost)| Participant {
                user_id,
                cost,
                deducted: charged,
            })
            .collect();

        update_entry(
            conn,
            id,
            &patch.date.unwrap_or(before.date),
            patch.description.as_deref().unwrap_or(&before.description),
            &participants,
        )?;
        let after = get_entry(conn, id)?;

        let mut new_value = serde_json::to_value(&after)?;
        // A reversed entry no longer holds charges; only a live one is re-billed.
        if charged && !after.is_reversed() {
            let txs = BreakfastLogic::recharge_in(conn, &after, ctx.actor, true, false)?;
            new_value["compensating_transactions"] = json!(txs.iter().map(|t| t.id).collect::<Vec<_>>());
        }

        let entry = insert_correction(
            conn,
            CorrectionAction::ForceUpdate,
            TargetType::BreakfastEntry,
            &id.to_string(),
            &serde_json::to_value(&before)?,
            &new_value,
            reason,
            ctx.actor,
        )?;
        ttlog(conn, "force_update", &before.label(), reason)?;
        Ok(entry)
    }

    /// Meal records are addressed by row id or by `YYYY-MM-DD:<user_id>:<meal>`;
    /// the latter also reaches days that only exist as defaults.
    fn locate_meal(
        conn: &Connection,
        rules: &AttendanceRules,
        target_id: &str,
    ) -> AppResult<DailyMealRecord> {
        if let Ok(id) = target_id.trim().parse::<i64>() {
            return find_record_by_id(conn, id)?
                .ok_or_else(|| AppError::NotFound(format!("meal record #{id}")));
        }

        let parts: Vec<&str> = target_id.split(':').collect();
        let [date, user, meal] = parts.as_slice() else {
            return Err(AppError::Validation(format!(
                "meal record target must be <id> or <date>:<user_id>:<meal>, got '{target_id}'"
            )));
        };
        let date = parse_date(date)?;
        let user_id = parse_id(user, "user")?;
        let meal = MealCategory::from_db_str(meal)
            .ok_or_else(|| AppError::Validation(format!("unknown meal '{meal}'")))?;
        get_user(conn, user_id)?;
        AttendanceLogic::effective_in(conn, rules, date, user_id, meal)
    }

    fn update_meal(
        conn: &Connection,
        ctx: &CorrectionContext,
        target_id: &str,
        patch: &MealRecordPatch,
        reason: &str,
    ) -> AppResult<CorrectionLogEntry> {
        let before = Self::locate_meal(conn, ctx.rules, target_id)?;

        let mut after = before.clone();
        if let Some(on) = patch.is_on {
            after.is_on = on;
        }
        if let Some(count) = patch.count {
            after.count = ctx.rules.clamp(count);
        }
        after.is_manually_set = true;
        let row_id = upsert_record(conn, &after)?;
        after.id = Some(row_id);

        let mut new_value = serde_json::to_value(&after)?;
        // Custom ranges may overlap; every finalized period holding the day is re-billed.
        let covering = finalized_covering(conn, &after.date)?;
        if !covering.is_empty() {
            let mut compensating = Vec::new();
            for month in &covering {
                let txs = MonthLogic::recharge_in(conn, ctx.rules, month, ctx.actor, true, false)?;
                compensating.extend(txs.iter().map(|t| t.id));
            }
            new_value["compensating_transactions"] = json!(compensating);
        }

        let entry = insert_correction(
            conn,
            CorrectionAction::ForceUpdate,
            TargetType::MealRecord,
            &row_id.to_string(),
            &serde_json::to_value(&before)?,
            &new_value,
            reason,
            ctx.actor,
        )?;
        ttlog(
            conn,
            "force_update",
            &format!("meal#{row_id}"),
            reason,
        )?;
        Ok(entry)
    }

    /// Lift the lock of a month or breakfast entry. Committed transactions
    /// stay; the next finalization commits only differences.
    pub fn force_unfinalize(
        pool: &mut DbPool,
        ctx: &CorrectionContext,
        target_type: TargetType,
        target_id: &str,
        reason: &str,
    ) -> AppResult<CorrectionLogEntry> {
        let reason = ctx.guard(PrivilegedOp::ForceUnfinalize, reason)?;

        pool.atomic(|conn| match target_type {
            TargetType::MonthSettings => {
                let id = parse_id(target_id, "month settings")?;
                let before = get_by_id(conn, id)?;
                let next = before.state.next(PeriodAction::Reopen, &before.label())?;
                if !cas_month(conn, id, before.state, next)? {
                    return Err(AppError::State(format!("{} changed concurrently", before.label())));
                }
                let after = get_by_id(conn, id)?;
                let entry = insert_correction(
                    conn,
                    CorrectionAction::ForceUnfinalize,
                    TargetType::MonthSettings,
                    &id.to_string(),
                    &serde_json::to_value(&before)?,
                    &serde_json::to_value(&after)?,
                    &reason,
                    ctx.actor,
                )?;
                ttlog(conn, "force_unfinalize", &before.label(), &reason)?;
                Ok(entry)
            }
            TargetType::BreakfastEntry => {
                let id = parse_id(target_id, "breakfast entry")?;
                let before: BreakfastEntry = get_entry(conn, id)?;
                let next = before.state.next(EntryAction::Reopen, &before.label())?;
                if !cas_entry(conn, id, before.state, next)? {
                    return Err(AppError::State(format!("{} changed concurrently", before.label())));
                }
                set_reverse_reason(conn, id, None)?;
                let after = get_entry(conn, id)?;
                let entry = insert_correction(
                    conn,
                    CorrectionAction::ForceUnfinalize,
                    TargetType::BreakfastEntry,
                    &id.to_string(),
                    &serde_json::to_value(&before)?,
                    &serde_json::to_value(&after)?,
                    &reason,
                    ctx.actor,
                )?;
                ttlog(conn, "force_unfinalize", &before.label(), &reason)?;
                Ok(entry)
            }
            other => Err(AppError::Validation(format!(
                "force_unfinalize does not apply to {other}"
            ))),
        })
    }

    /// Set a balance to `new_amount` through one override adjustment.
    pub fn balance_correction(
        pool: &mut DbPool,
        ctx: &CorrectionContext,
        user_id: i64,
        category: MealCategory,
        new_amount: Decimal,
        reason: &str,
    ) -> AppResult<(CorrectionLogEntry, Transaction)> {
        let reason = ctx.guard(PrivilegedOp::BalanceCorrection, reason)?;

        pool.atomic(|conn| {
            get_user(conn, user_id)?;
            let before = load_balance(conn, user_id, category)?;
            let delta = new_amount - before.amount;

            let entry = insert_correction(
                conn,
                CorrectionAction::BalanceCorrection,
                TargetType::Balance,
                &format!("{user_id}:{category}"),
                &serde_json::to_value(&before)?,
                &json!({
                    "user_id": user_id,
                    "category": category,
                    "amount": new_amount.normalize(),
                    "is_frozen": before.is_frozen,
                }),
                &reason,
                ctx.actor,
            )?;

            let req = TxRequest::new(
                user_id,
                category,
                TransactionType::Adjustment,
                delta,
                format!("Balance correction: {reason}"),
                ctx.actor,
            )
            .with_source(TxSource::Correction(entry.id))
            .overriding();
            let tx = LedgerLogic::apply_in(conn, &req)?;

            ttlog(
                conn,
                "balance_correction",
                &format!("user#{user_id}:{category}"),
                &format!("{} → {}", before.amount, tx.new_balance),
            )?;
            Ok((entry, tx))
        })
    }

    /// Cancel one transaction with a reversal pair.
    pub fn transaction_void(
        pool: &mut DbPool,
        ctx: &CorrectionContext,
        tx_id: i64,
        reason: &str,
    ) -> AppResult<(CorrectionLogEntry, Transaction)> {
        let reason = ctx.guard(PrivilegedOp::TransactionVoid, reason)?;

        pool.atomic(|conn| {
            let original = find_transaction(conn, tx_id)?
                .ok_or_else(|| AppError::NotFound(format!("transaction #{tx_id}")))?;
            if original.is_reversed {
                return Err(AppError::State(format!("transaction #{tx_id} is already reversed")));
            }
            // Artifact charges are recomputed on every recharge; only the artifact changes them.
            match original.source {
                TxSource::Month(id) => {
                    return Err(AppError::State(format!(
                        "transaction #{tx_id} is a charge of month settings #{id}; use force_update on the month or its meal records"
                    )));
                }
                TxSource::Breakfast(id) => {
                    return Err(AppError::State(format!(
                        "transaction #{tx_id} is a charge of breakfast #{id}; use force_update or reverse on the entry"
                    )));
                }
                TxSource::Manual | TxSource::Correction(_) => {}
            }

            let entry = insert_correction(
                conn,
                CorrectionAction::TransactionVoid,
                TargetType::Transaction,
                &tx_id.to_string(),
                &serde_json::to_value(&original)?,
                &json!({ "is_reversed": true, "reversal_amount": (-original.amount).normalize() }),
                &reason,
                ctx.actor,
            )?;
            let reversal = LedgerLogic::void_in(
                conn,
                &original,
                ctx.actor,
                TxSource::Correction(entry.id),
                &reason,
            )?;

            ttlog(conn, "transaction_void", &format!("tx#{tx_id}"), &reason)?;
            Ok((entry, reversal))
        })
    }

    /// Newest first.
    pub fn history(
        pool: &mut DbPool,
        target_type: Option<TargetType>,
        page: Page,
    ) -> AppResult<Vec<CorrectionLogEntry>> {
        pool.read(|conn| load_corrections(conn, target_type, page))
    }
}
