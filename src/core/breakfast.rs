//! Shared breakfast costs: submission, edits and the deduct / reverse cycle.

use crate::core::calculator::settlement::{ChargeTarget, plan_commit};
use crate::core::calculator::split::equal_shares;
use crate::core::ledger::LedgerLogic;
use crate::db::breakfast::{
    cas_status, delete_entry, get_entry, insert_entry, list_entries, mark_deducted,
    set_reverse_reason, update_entry,
};
use crate::db::ledger::net_by_source;
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::users::get_by_id;
use crate::errors::{AppError, AppResult};
use crate::models::breakfast::{BreakfastEntry, CostInput, Participant};
use crate::models::category::MealCategory;
use crate::models::state::{EntryAction, EntryState};
use crate::models::transaction::{Transaction, TransactionType, TxRequest, TxSource};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashSet;

pub struct BreakfastLogic;

impl BreakfastLogic {
    /// Turn a cost input into explicit per-participant costs.
    pub fn build_participants(
        conn: &Connection,
        input: &CostInput,
        decimals: u32,
    ) -> AppResult<Vec<Participant>> {
        let costs: Vec<(i64, Decimal)> = match input {
            CostInput::Equal {
                total,
                participants,
            } => {
                let shares = equal_shares(*total, participants.len(), decimals)?;
                participants.iter().copied().zip(shares).collect()
            }
            CostInput::Individual(list) => list.clone(),
        };

        if costs.is_empty() {
            return Err(AppError::Validation(
                "at least one participant is required".into(),
            ));
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
            let user = get_by_id(conn, *user_id)?;
            if !user.is_active {
                return Err(AppError::Validation(format!(
                    "user '{}' is inactive",
                    user.name
                )));
            }
        }

        Ok(costs
            .into_iter()
            .map(|(user_id, cost)| Participant {
                user_id,
                cost,
                deducted: false,
            })
            .collect())
    }

    pub fn submit(
        pool: &mut DbPool,
        date: NaiveDate,
        input: &CostInput,
        description: &str,
        actor: &str,
        decimals: u32,
    ) -> AppResult<BreakfastEntry> {
        pool.atomic(|conn| {
            let participants = Self::build_participants(conn, input, decimals)?;
            let id = insert_entry(conn, &date, description, &participants, actor)?;
            let entry = get_entry(conn, id)?;
            ttlog(
                conn,
                "breakfast_submit",
                &format!("breakfast#{id}"),
                &format!(
                    "{} split over {} participant(s)",
                    entry.total_cost,
                    entry.participants.len()
                ),
            )?;
            Ok(entry)
        })
    }

    /// Ordinary edit; only a draft or reopened entry may change.
    pub fn edit(
        pool: &mut DbPool,
        id: i64,
        date: Option<NaiveDate>,
        description: Option<&str>,
        input: Option<&CostInput>,
        decimals: u32,
    ) -> AppResult<BreakfastEntry> {
        pool.atomic(|conn| {
            let entry = get_entry(conn, id)?;
            if !entry.state.is_editable() {
                return Err(AppError::AlreadyFinalized(entry.label()));
            }

            let participants = match input {
                Some(input) => Self::build_participants(conn, input, decimals)?,
                None => entry.participants.clone(),
            };
            update_entry(
                conn,
                id,
                &date.unwrap_or(entry.date),
                description.unwrap_or(&entry.description),
                &participants,
            )?;
            ttlog(conn, "breakfast_edit", &format!("breakfast#{id}"), "edited")?;
            get_entry(conn, id)
        })
    }

    pub fn delete(pool: &mut DbPool, id: i64) -> AppResult<()> {
        pool.atomic(|conn| {
            let entry = get_entry(conn, id)?;
            match entry.state {
                EntryState::Draft => {}
                EntryState::Reopened => {
                    return Err(AppError::State(format!(
                        "{} has ledger history and cannot be deleted",
                        entry.label()
                    )));
                }
                EntryState::Finalized | EntryState::Reversed => {
                    return Err(AppError::AlreadyFinalized(entry.label()));
                }
            }
            delete_entry(conn, id)?;
            ttlog(conn, "breakfast_del", &format!("breakfast#{id}"), "deleted")
        })
    }

    /// Finalize the entry and charge every participant, all or nothing.
    pub fn deduct(pool: &mut DbPool, id: i64, actor: &str) -> AppResult<Vec<Transaction>> {
        pool.atomic(|conn| {
            let entry = get_entry(conn, id)?;
            let next = entry.state.next(EntryAction::Deduct, &entry.label())?;
            if !cas_status(conn, id, entry.state, next)? {
                return Err(AppError::AlreadyFinalized(entry.label()));
            }

            let txs = Self::recharge_in(conn, &entry, actor, false, true)?;
            mark_deducted(conn, id)?;

            ttlog(
                conn,
                "breakfast_deduct",
                &format!("breakfast#{id}"),
                &format!("{} transaction(s), total {}", txs.len(), entry.total_cost),
            )?;
            Ok(txs)
        })
    }

    /// Bring the ledger footprint of `entry` in line with its participant
    /// costs. The first call deducts; later calls commit differences only.
    pub fn recharge_in(
        conn: &Connection,
        entry: &BreakfastEntry,
        actor: &str,
        is_override: bool,
        include_zero: bool,
    ) -> AppResult<Vec<Transaction>> {
        let targets: Vec<ChargeTarget> = entry
            .participants
            .iter()
            .map(|p| ChargeTarget {
                user_id: p.user_id,
                category: MealCategory::Breakfast,
                charge: p.cost,
            })
            .collect();
        let source = TxSource::Breakfast(entry.id);
        let committed = net_by_source(conn, source)?;
        let plan = plan_commit(&targets, &committed, include_zero);

        LedgerLogic::commit_plan_in(
            conn,
            &plan,
            source,
            &format!("Breakfast {} ({})", entry.date, entry.description),
            actor,
            is_override,
        )
    }

    /// Refund every participant what the entry currently holds against them.
    pub fn reverse(
        pool: &mut DbPool,
        id: i64,
        reason: &str,
        actor: &str,
    ) -> AppResult<Vec<Transaction>> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("a reason is required to reverse".into()));
        }

        pool.atomic(|conn| {
            let entry = get_entry(conn, id)?;
            let next = entry.state.next(EntryAction::Reverse, &entry.label())?;
            if !cas_status(conn, id, entry.state, next)? {
                return Err(AppError::State(format!("{} changed concurrently", entry.label())));
            }

            let source = TxSource::Breakfast(id);
            let committed = net_by_source(conn, source)?;
            let mut txs = Vec::with_capacity(entry.participants.len());

            for p in &entry.participants {
                let held: Decimal = committed
                    .iter()
                    .filter(|(u, c, _)| *u == p.user_id && *c == MealCategory::Breakfast)
                    .map(|(_, _, a)| *a)
                    .sum();
                let req = TxRequest::new(
                    p.user_id,
                    MealCategory::Breakfast,
                    TransactionType::Refund,
                    -held,
                    format!("Refund breakfast {}: {reason}", entry.date),
                    actor,
                )
                .with_source(source);
                txs.push(LedgerLogic::apply_in(conn, &req)?);
            }

            set_reverse_reason(conn, id, Some(reason))?;
            ttlog(conn, "breakfast_reverse", &format!("breakfast#{id}"), reason)?;
            Ok(txs)
        })
    }

    pub fn get(pool: &mut DbPool, id: i64) -> AppResult<BreakfastEntry> {
        pool.read(|conn| get_entry(conn, id))
    }

    pub fn list(
        pool: &mut DbPool,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<BreakfastEntry>> {
        pool.read(|conn| list_entries(conn, &start, &end))
    }
}
