use chrono::NaiveDate;
use mealbook::core::breakfast::BreakfastLogic;
use mealbook::core::ledger::LedgerLogic;
use mealbook::core::users::UserLogic;
use mealbook::db::pool::DbPool;
use mealbook::errors::{AppError, ErrorKind};
use mealbook::models::breakfast::CostInput;
use mealbook::models::category::MealCategory;
use mealbook::models::state::EntryState;
use mealbook::models::transaction::{TransactionType, TxSource};
use std::thread;

mod common;
use common::{dec, file_pool};

const B: MealCategory = MealCategory::Breakfast;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 3).unwrap()
}

fn setup() -> (DbPool, i64, i64, i64) {
    let mut pool = DbPool::in_memory().unwrap();
    let a = UserLogic::add(&mut pool, "ann").unwrap().id;
    let b = UserLogic::add(&mut pool, "bob").unwrap().id;
    let c = UserLogic::add(&mut pool, "cid").unwrap().id;
    (pool, a, b, c)
}

fn bal(pool: &mut DbPool, user: i64) -> rust_decimal::Decimal {
    LedgerLogic::balance(pool, user, B).unwrap().amount
}

#[test]
fn equal_split_charges_each_participant() {
    let (mut pool, a, b, c) = setup();
    let input = CostInput::Equal {
        total: dec("300"),
        participants: vec![a, b, c],
    };
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "bread", "admin", 2).unwrap();
    assert_eq!(entry.state, EntryState::Draft);
    assert_eq!(entry.total_cost, dec("300"));

    let txs = BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();
    assert_eq!(txs.len(), 3);
    for t in &txs {
        assert_eq!(t.kind, TransactionType::Deduction);
        assert_eq!(t.amount, dec("-100"));
        assert_eq!(t.source, TxSource::Breakfast(entry.id));
    }
    for u in [a, b, c] {
        assert_eq!(bal(&mut pool, u), dec("-100"));
    }

    let stored = BreakfastLogic::get(&mut pool, entry.id).unwrap();
    assert_eq!(stored.state, EntryState::Finalized);
    assert!(stored.participants.iter().all(|p| p.deducted));
}

#[test]
fn individual_costs_sum_to_total() {
    let (mut pool, a, b, _) = setup();
    let input = CostInput::Individual(vec![(a, dec("150")), (b, dec("50"))]);
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();
    assert_eq!(entry.total_cost, dec("200"));

    let txs = BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();
    let amounts: Vec<_> = txs.iter().map(|t| (t.user_id, t.amount)).collect();
    assert_eq!(amounts, vec![(a, dec("-150")), (b, dec("-50"))]);
}

#[test]
fn uneven_split_gives_remainder_to_first_participants() {
    let (mut pool, a, b, c) = setup();
    let input = CostInput::Equal {
        total: dec("100"),
        participants: vec![a, b, c],
    };
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();
    let costs: Vec<_> = entry.participants.iter().map(|p| p.cost).collect();
    assert_eq!(costs, vec![dec("33.34"), dec("33.33"), dec("33.33")]);
    assert_eq!(entry.total_cost, dec("100"));
}

#[test]
fn reverse_refunds_and_is_one_shot() {
    let (mut pool, a, b, c) = setup();
    let input = CostInput::Equal {
        total: dec("300"),
        participants: vec![a, b, c],
    };
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();
    BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();

    let refunds = BreakfastLogic::reverse(&mut pool, entry.id, "wrong items", "admin").unwrap();
    assert_eq!(refunds.len(), 3);
    assert!(refunds.iter().all(|t| t.amount == dec("100")));
    for u in [a, b, c] {
        assert_eq!(bal(&mut pool, u), dec("0"));
    }

    let stored = BreakfastLogic::get(&mut pool, entry.id).unwrap();
    assert!(stored.is_reversed());
    assert_eq!(stored.reverse_reason.as_deref(), Some("wrong items"));

    let again = BreakfastLogic::reverse(&mut pool, entry.id, "twice", "admin").unwrap_err();
    assert_eq!(again.kind(), ErrorKind::State);
}

#[test]
fn reverse_needs_a_reason_and_a_finalized_entry() {
    let (mut pool, a, _, _) = setup();
    let input = CostInput::Individual(vec![(a, dec("10"))]);
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();

    let draft = BreakfastLogic::reverse(&mut pool, entry.id, "oops", "admin").unwrap_err();
    assert_eq!(draft.kind(), ErrorKind::State);

    BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();
    let blank = BreakfastLogic::reverse(&mut pool, entry.id, "   ", "admin").unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::Validation);
}

#[test]
fn deduct_is_all_or_nothing() {
    let (mut pool, a, b, c) = setup();
    LedgerLogic::freeze(&mut pool, c, B, "admin").unwrap();

    let input = CostInput::Equal {
        total: dec("90"),
        participants: vec![a, b, c],
    };
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();

    let err = BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap_err();
    assert!(matches!(err, AppError::BalanceFrozen { .. }));

    // No participant was charged and the entry is still a draft.
    for u in [a, b] {
        assert_eq!(bal(&mut pool, u), dec("0"));
    }
    let stored = BreakfastLogic::get(&mut pool, entry.id).unwrap();
    assert_eq!(stored.state, EntryState::Draft);
    assert!(stored.participants.iter().all(|p| !p.deducted));

    LedgerLogic::unfreeze(&mut pool, c, B, "admin").unwrap();
    assert_eq!(BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap().len(), 3);
}

#[test]
fn finalized_entries_are_locked() {
    let (mut pool, a, b, _) = setup();
    let input = CostInput::Individual(vec![(a, dec("10")), (b, dec("20"))]);
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();

    let edited = BreakfastLogic::edit(&mut pool, entry.id, None, Some("jam"), None, 2).unwrap();
    assert_eq!(edited.description, "jam");

    BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();

    let again = BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap_err();
    assert!(matches!(again, AppError::AlreadyFinalized(_)));

    let edit = BreakfastLogic::edit(&mut pool, entry.id, None, Some("x"), None, 2).unwrap_err();
    assert!(matches!(edit, AppError::AlreadyFinalized(_)));

    let delete = BreakfastLogic::delete(&mut pool, entry.id).unwrap_err();
    assert!(matches!(delete, AppError::AlreadyFinalized(_)));
}

#[test]
fn draft_can_be_deleted() {
    let (mut pool, a, _, _) = setup();
    let input = CostInput::Individual(vec![(a, dec("10"))]);
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();
    BreakfastLogic::delete(&mut pool, entry.id).unwrap();
    let gone = BreakfastLogic::get(&mut pool, entry.id).unwrap_err();
    assert_eq!(gone.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_participant_lists_are_rejected() {
    let (mut pool, a, b, _) = setup();

    let empty = CostInput::Individual(vec![]);
    assert!(BreakfastLogic::submit(&mut pool, day(), &empty, "", "admin", 2).is_err());

    let dup = CostInput::Individual(vec![(a, dec("1")), (a, dec("2"))]);
    assert!(BreakfastLogic::submit(&mut pool, day(), &dup, "", "admin", 2).is_err());

    let negative = CostInput::Individual(vec![(a, dec("-1"))]);
    assert!(BreakfastLogic::submit(&mut pool, day(), &negative, "", "admin", 2).is_err());

    UserLogic::deactivate(&mut pool, "bob").unwrap();
    let inactive = CostInput::Individual(vec![(b, dec("1"))]);
    assert!(BreakfastLogic::submit(&mut pool, day(), &inactive, "", "admin", 2).is_err());
}

#[test]
fn concurrent_deduct_has_exactly_one_winner() {
    let (db_path, mut pool) = file_pool("concurrent_deduct");
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    let input = CostInput::Individual(vec![(ann, dec("10"))]);
    let entry = BreakfastLogic::submit(&mut pool, day(), &input, "", "admin", 2).unwrap();
    drop(pool);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = db_path.clone();
            let id = entry.id;
            thread::spawn(move || {
                let mut pool = DbPool::new(&path).unwrap();
                BreakfastLogic::deduct(&mut pool, id, "admin")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyFinalized(_))))
            .count(),
        3
    );

    let mut pool = DbPool::new(&db_path).unwrap();
    assert_eq!(bal(&mut pool, ann), dec("-10"));
    let history = LedgerLogic::history(&mut pool, Some(ann), &Default::default(), Default::default()).unwrap();
    assert_eq!(history.len(), 1);
}
