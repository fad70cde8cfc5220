//! Balance store and transaction ledger.
//!
//! A balance is only ever written together with the transaction that moves
//! it, so `balances.amount` stays a projection of the log. `replay` and
//! `verify` recompute that projection from scratch.

use crate::core::calculator::settlement::PlannedTx;
use crate::db::db_utils::now_ts;
use crate::db::ledger::{
    find_transaction, insert_transaction, ledger_keys, load_balance, load_balances, load_history,
    load_stream, mark_reversed, upsert_balance,
};
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::users::get_by_id;
use crate::errors::{AppError, AppResult};
use crate::models::balance::Balance;
use crate::models::category::MealCategory;
use crate::models::transaction::{
    HistoryFilter, Page, Transaction, TransactionType, TxRequest, TxSource,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub struct LedgerLogic;

/// A place where the stored balance disagrees with its transaction log.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LedgerIssue {
    pub user_id: i64,
    pub category: MealCategory,
    pub transaction_id: Option<i64>,
    pub detail: String,
}

impl LedgerLogic {
    /// Record one transaction and move the balance, using an already open
    /// batch. Batch operations call this once per participant.
    pub fn apply_in(conn: &Connection, req: &TxRequest) -> AppResult<Transaction> {
        let signed = match req.kind.fixed_sign() {
            Some(sign) => {
                if req.amount.is_sign_negative() && !req.amount.is_zero() {
                    return Err(AppError::Validation(format!(
                        "{} amount must not be negative: {}",
                        req.kind, req.amount
                    )));
                }
                if sign < 0 { -req.amount } else { req.amount }
            }
            None => req.amount,
        };

        let user = get_by_id(conn, req.user_id)?;
        let mut balance = load_balance(conn, req.user_id, req.category)?;

        if balance.is_frozen && req.kind != TransactionType::Reversal && !req.is_override {
            return Err(AppError::BalanceFrozen {
                user: user.name,
                category: req.category.to_string(),
            });
        }

        let mut tx = Transaction {
            id: 0,
            user_id: req.user_id,
            category: req.category,
            kind: req.kind,
            amount: signed,
            previous_balance: balance.amount,
            new_balance: balance.amount + signed,
            description: req.description.clone(),
            performed_by: req.performed_by.clone(),
            created_at: now_ts(),
            is_reversed: false,
            source: req.source,
            reverses_id: req.reverses_id,
        };
        tx.id = insert_transaction(conn, &tx)?;

        balance.amount = tx.new_balance;
        upsert_balance(conn, &balance)?;

        Ok(tx)
    }

    /// Single transaction as its own atomic unit.
    pub fn apply_transaction(pool: &mut DbPool, req: TxRequest) -> AppResult<Transaction> {
        pool.atomic(|conn| {
            let tx = Self::apply_in(conn, &req)?;
            ttlog(
                conn,
                tx.kind.to_db_str(),
                &format!("user#{}:{}", tx.user_id, tx.category),
                &format!("{} {} → {}", tx.kind, tx.amount, tx.new_balance),
            )?;
            Ok(tx)
        })
    }

    pub fn deposit(
        pool: &mut DbPool,
        user_id: i64,
        category: MealCategory,
        amount: Decimal,
        description: &str,
        actor: &str,
    ) -> AppResult<Transaction> {
        if amount.is_zero() {
            return Err(AppError::Validation("deposit amount must be positive".into()));
        }
        let user = get_by_id(&pool.conn, user_id)?;
        if !user.is_active {
            return Err(AppError::Validation(format!("user '{}' is inactive", user.name)));
        }
        let req = TxRequest::new(
            user_id,
            category,
            TransactionType::Deposit,
            amount,
            description,
            actor,
        );
        Self::apply_transaction(pool, req)
    }

    pub fn deduct(
        pool: &mut DbPool,
        user_id: i64,
        category: MealCategory,
        amount: Decimal,
        description: &str,
        actor: &str,
    ) -> AppResult<Transaction> {
        let req = TxRequest::new(
            user_id,
            category,
            TransactionType::Deduction,
            amount,
            description,
            actor,
        );
        Self::apply_transaction(pool, req)
    }

    pub fn freeze(
        pool: &mut DbPool,
        user_id: i64,
        category: MealCategory,
        actor: &str,
    ) -> AppResult<Transaction> {
        Self::set_frozen(pool, user_id, category, true, actor)
    }

    pub fn unfreeze(
        pool: &mut DbPool,
        user_id: i64,
        category: MealCategory,
        actor: &str,
    ) -> AppResult<Transaction> {
        Self::set_frozen(pool, user_id, category, false, actor)
    }

    fn set_frozen(
        pool: &mut DbPool,
        user_id: i64,
        category: MealCategory,
        frozen: bool,
        actor: &str,
    ) -> AppResult<Transaction> {
        pool.atomic(|conn| {
            let current = load_balance(conn, user_id, category)?;
            if current.is_frozen == frozen {
                return Err(AppError::State(format!(
                    "{} balance of user #{} is already {}",
                    category,
                    user_id,
                    if frozen { "frozen" } else { "unfrozen" }
                )));
            }

            let (op, description) = if frozen {
                ("freeze", "Balance frozen")
            } else {
                ("unfreeze", "Balance unfrozen")
            };

            // The zero adjustment is the audit record of the flag change.
            let req = TxRequest::new(
                user_id,
                category,
                TransactionType::Adjustment,
                Decimal::ZERO,
                description,
                actor,
            )
            .overriding();
            let tx = Self::apply_in(conn, &req)?;

            let mut balance = load_balance(conn, user_id, category)?;
            balance.is_frozen = frozen;
            upsert_balance(conn, &balance)?;

            ttlog(conn, op, &format!("user#{user_id}:{category}"), description)?;
            Ok(tx)
        })
    }

    /// Apply a planned batch, every row linked to `source`. Runs inside the
    /// caller's batch: one failing row rolls back the whole plan.
    pub fn commit_plan_in(
        conn: &Connection,
        plan: &[PlannedTx],
        source: TxSource,
        description: &str,
        actor: &str,
        is_override: bool,
    ) -> AppResult<Vec<Transaction>> {
        let mut out = Vec::with_capacity(plan.len());
        for p in plan {
            let mut req =
                TxRequest::new(p.user_id, p.category, p.kind, p.amount, description, actor)
                    .with_source(source);
            req.is_override = is_override;
            out.push(Self::apply_in(conn, &req)?);
        }
        Ok(out)
    }

    /// Cancel `original` with a reversal of opposite sign and flag both rows.
    pub fn void_in(
        conn: &Connection,
        original: &Transaction,
        actor: &str,
        source: TxSource,
        reason: &str,
    ) -> AppResult<Transaction> {
        if original.is_reversed {
            return Err(AppError::State(format!(
                "transaction #{} is already reversed",
                original.id
            )));
        }
        if original.kind == TransactionType::Reversal {
            return Err(AppError::State(format!(
                "transaction #{} is itself a reversal",
                original.id
            )));
        }

        let mut req = TxRequest::new(
            original.user_id,
            original.category,
            TransactionType::Reversal,
            -original.amount,
            format!("Reversal of #{}: {}", original.id, reason),
            actor,
        )
        .with_source(source)
        .overriding();
        req.reverses_id = Some(original.id);

        let mut reversal = Self::apply_in(conn, &req)?;
        mark_reversed(conn, &[original.id, reversal.id])?;
        reversal.is_reversed = true;
        Ok(reversal)
    }

    pub fn transaction(pool: &mut DbPool, id: i64) -> AppResult<Transaction> {
        find_transaction(&pool.conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("transaction #{id}")))
    }

    /// Newest-first history. `user_id = None` reads the whole ledger.
    pub fn history(
        pool: &mut DbPool,
        user_id: Option<i64>,
        filter: &HistoryFilter,
        page: Page,
    ) -> AppResult<Vec<Transaction>> {
        pool.read(|conn| load_history(conn, user_id, filter, page))
    }

    pub fn balance(pool: &mut DbPool, user_id: i64, category: MealCategory) -> AppResult<Balance> {
        load_balance(&pool.conn, user_id, category)
    }

    /// All three categories of one user, zero-filled.
    pub fn balances(pool: &mut DbPool, user_id: i64) -> AppResult<Vec<Balance>> {
        pool.read(|conn| {
            MealCategory::ALL
                .iter()
                .map(|c| load_balance(conn, user_id, *c))
                .collect()
        })
    }

    pub fn all_balances(pool: &mut DbPool) -> AppResult<Vec<Balance>> {
        pool.read(|conn| load_balances(conn, None))
    }

    /// Recompute a balance from its transaction log.
    pub fn replay(conn: &Connection, user_id: i64, category: MealCategory) -> AppResult<Decimal> {
        Ok(load_stream(conn, user_id, category)?
            .iter()
            .filter(|t| !t.is_reversed)
            .map(|t| t.amount)
            .sum())
    }

    /// Check every balance against its log. Empty result means consistent.
    pub fn verify(pool: &mut DbPool) -> AppResult<Vec<LedgerIssue>> {
        pool.read(|conn| {
            let mut issues = Vec::new();

            for (user_id, category) in ledger_keys(conn)? {
                let stream = load_stream(conn, user_id, category)?;
                let mut running = Decimal::ZERO;

                for t in &stream {
                    if t.previous_balance + t.amount != t.new_balance {
                        issues.push(LedgerIssue {
                            user_id,
                            category,
                            transaction_id: Some(t.id),
                            detail: format!(
                                "{} + {} != {}",
                                t.previous_balance, t.amount, t.new_balance
                            ),
                        });
                    }
                    if t.previous_balance != running {
                        issues.push(LedgerIssue {
                            user_id,
                            category,
                            transaction_id: Some(t.id),
                            detail: format!(
                                "chain broken: expected previous {running}, found {}",
                                t.previous_balance
                            ),
                        });
                    }
                    running = t.new_balance;
                }

                let projected: Decimal = stream
                    .iter()
                    .filter(|t| !t.is_reversed)
                    .map(|t| t.amount)
                    .sum();
                let stored = load_balance(conn, user_id, category)?.amount;

                if projected != stored || running != stored {
                    issues.push(LedgerIssue {
                        user_id,
                        category,
                        transaction_id: None,
                        detail: format!(
                            "stored balance {stored}, replayed {projected}, last snapshot {running}"
                        ),
                    });
                }
            }

            Ok(issues)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::insert_user;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn setup() -> (DbPool, i64) {
        let pool = DbPool::in_memory().unwrap();
        let user = insert_user(&pool.conn, "alice").unwrap();
        (pool, user.id)
    }

    #[test]
    fn deduction_is_stored_negative() {
        let (mut pool, alice) = setup();
        let tx = LedgerLogic::deduct(&mut pool, alice, MealCategory::Lunch, d("40"), "x", "op")
            .unwrap();
        assert_eq!(tx.amount, d("-40"));
        assert_eq!(tx.new_balance, d("-40"));
    }

    #[test]
    fn negative_deposit_is_rejected() {
        let (mut pool, alice) = setup();
        let err = LedgerLogic::deduct(&mut pool, alice, MealCategory::Lunch, d("-5"), "x", "op")
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn void_pair_keeps_projection_and_chain() {
        let (mut pool, alice) = setup();
        let dep = LedgerLogic::deposit(&mut pool, alice, MealCategory::Dinner, d("70"), "", "op")
            .unwrap();
        pool.atomic(|conn| LedgerLogic::void_in(conn, &dep, "op", TxSource::Manual, "typo"))
            .unwrap();

        let bal = LedgerLogic::balance(&mut pool, alice, MealCategory::Dinner).unwrap();
        assert_eq!(bal.amount, Decimal::ZERO);
        assert_eq!(
            LedgerLogic::replay(&pool.conn, alice, MealCategory::Dinner).unwrap(),
            Decimal::ZERO
        );
        assert!(LedgerLogic::verify(&mut pool).unwrap().is_empty());
    }
}
