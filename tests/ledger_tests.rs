use mealbook::core::ledger::LedgerLogic;
use mealbook::core::users::UserLogic;
use mealbook::db::pool::DbPool;
use mealbook::errors::{AppError, ErrorKind};
use mealbook::models::category::MealCategory;
use mealbook::models::transaction::{HistoryFilter, Page, TransactionType};
use rust_decimal::Decimal;

mod common;
use common::dec;

fn pool_with(users: &[&str]) -> (DbPool, Vec<i64>) {
    let mut pool = DbPool::in_memory().unwrap();
    let ids = users
        .iter()
        .map(|u| UserLogic::add(&mut pool, u).unwrap().id)
        .collect();
    (pool, ids)
}

#[test]
fn frozen_balance_rejects_deduction() {
    let (mut pool, ids) = pool_with(&["xavier"]);
    let x = ids[0];

    LedgerLogic::deposit(&mut pool, x, MealCategory::Lunch, dec("200"), "", "admin").unwrap();
    LedgerLogic::freeze(&mut pool, x, MealCategory::Lunch, "admin").unwrap();

    let err = LedgerLogic::deduct(&mut pool, x, MealCategory::Lunch, dec("50"), "", "admin")
        .unwrap_err();
    assert!(matches!(err, AppError::BalanceFrozen { .. }));
    assert_eq!(err.kind(), ErrorKind::State);

    // Nothing moved, other categories stay usable.
    assert_eq!(
        LedgerLogic::balance(&mut pool, x, MealCategory::Lunch).unwrap().amount,
        dec("200")
    );
    LedgerLogic::deduct(&mut pool, x, MealCategory::Dinner, dec("5"), "", "admin").unwrap();

    LedgerLogic::unfreeze(&mut pool, x, MealCategory::Lunch, "admin").unwrap();
    let tx = LedgerLogic::deduct(&mut pool, x, MealCategory::Lunch, dec("50"), "", "admin").unwrap();
    assert_eq!(tx.new_balance, dec("150"));
}

#[test]
fn freezing_twice_is_a_state_error() {
    let (mut pool, ids) = pool_with(&["ann"]);
    LedgerLogic::freeze(&mut pool, ids[0], MealCategory::Dinner, "admin").unwrap();
    let err = LedgerLogic::freeze(&mut pool, ids[0], MealCategory::Dinner, "admin").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn every_transaction_chains_balances() {
    let (mut pool, ids) = pool_with(&["ann"]);
    let ann = ids[0];

    LedgerLogic::deposit(&mut pool, ann, MealCategory::Lunch, dec("100.50"), "", "admin").unwrap();
    LedgerLogic::deduct(&mut pool, ann, MealCategory::Lunch, dec("30.25"), "", "admin").unwrap();
    LedgerLogic::deposit(&mut pool, ann, MealCategory::Lunch, dec("10"), "", "admin").unwrap();

    let mut txs = LedgerLogic::history(&mut pool, Some(ann), &HistoryFilter::default(), Page::default())
        .unwrap();
    txs.reverse();
    assert_eq!(txs.len(), 3);
    for pair in txs.windows(2) {
        assert_eq!(pair[0].new_balance, pair[1].previous_balance);
    }
    for t in &txs {
        assert_eq!(t.new_balance, t.previous_balance + t.amount);
    }

    let stored = LedgerLogic::balance(&mut pool, ann, MealCategory::Lunch).unwrap().amount;
    assert_eq!(stored, dec("80.25"));
    assert_eq!(
        LedgerLogic::replay(&pool.conn, ann, MealCategory::Lunch).unwrap(),
        stored
    );
    assert!(LedgerLogic::verify(&mut pool).unwrap().is_empty());
}

#[test]
fn verify_reports_tampered_balances() {
    let (mut pool, ids) = pool_with(&["ann"]);
    LedgerLogic::deposit(&mut pool, ids[0], MealCategory::Dinner, dec("40"), "", "admin").unwrap();

    pool.conn
        .execute(
            "UPDATE balances SET amount = '999' WHERE user_id = ?1 AND category = 'dinner'",
            [ids[0]],
        )
        .unwrap();

    let issues = LedgerLogic::verify(&mut pool).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].category, MealCategory::Dinner);
}

#[test]
fn deposits_need_an_active_user_and_a_positive_amount() {
    let (mut pool, ids) = pool_with(&["ann"]);

    let zero = LedgerLogic::deposit(&mut pool, ids[0], MealCategory::Lunch, Decimal::ZERO, "", "admin");
    assert_eq!(zero.unwrap_err().kind(), ErrorKind::Validation);

    let negative = LedgerLogic::deposit(&mut pool, ids[0], MealCategory::Lunch, dec("-5"), "", "admin");
    assert_eq!(negative.unwrap_err().kind(), ErrorKind::Validation);

    UserLogic::deactivate(&mut pool, "ann").unwrap();
    let inactive = LedgerLogic::deposit(&mut pool, ids[0], MealCategory::Lunch, dec("5"), "", "admin");
    assert_eq!(inactive.unwrap_err().kind(), ErrorKind::Validation);

    let unknown = LedgerLogic::deposit(&mut pool, 99, MealCategory::Lunch, dec("5"), "", "admin");
    assert!(unknown.is_err());
}

#[test]
fn history_filters_by_kind_and_category() {
    let (mut pool, ids) = pool_with(&["ann", "bob"]);
    LedgerLogic::deposit(&mut pool, ids[0], MealCategory::Lunch, dec("10"), "", "admin").unwrap();
    LedgerLogic::deposit(&mut pool, ids[1], MealCategory::Dinner, dec("20"), "", "admin").unwrap();
    LedgerLogic::deduct(&mut pool, ids[1], MealCategory::Dinner, dec("5"), "", "admin").unwrap();

    let filter = HistoryFilter {
        kind: Some(TransactionType::Deduction),
        ..Default::default()
    };
    let deductions = LedgerLogic::history(&mut pool, None, &filter, Page::default()).unwrap();
    assert_eq!(deductions.len(), 1);
    assert_eq!(deductions[0].amount, dec("-5"));

    let filter = HistoryFilter {
        category: Some(MealCategory::Lunch),
        ..Default::default()
    };
    let lunch = LedgerLogic::history(&mut pool, None, &filter, Page::default()).unwrap();
    assert_eq!(lunch.len(), 1);
    assert_eq!(lunch[0].user_id, ids[0]);

    let page = Page { offset: 1, limit: 1 };
    let second = LedgerLogic::history(&mut pool, None, &HistoryFilter::default(), page).unwrap();
    assert_eq!(second.len(), 1);
}
