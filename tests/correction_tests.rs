use chrono::NaiveDate;
use mealbook::core::attendance::AttendanceRules;
use mealbook::core::auth::{AllowAll, ConfigAuthorizer};
use mealbook::core::breakfast::BreakfastLogic;
use mealbook::core::correction::{CorrectionContext, CorrectionLogic};
use mealbook::core::ledger::LedgerLogic;
use mealbook::core::month::MonthLogic;
use mealbook::core::users::UserLogic;
use mealbook::db::pool::DbPool;
use mealbook::errors::ErrorKind;
use mealbook::models::breakfast::CostInput;
use mealbook::models::category::MealCategory;
use mealbook::models::correction::{CorrectionAction, TargetType};
use mealbook::models::month_settings::MonthSettingsPatch;
use mealbook::models::transaction::{Page, TransactionType, TxSource};
use serde_json::json;

mod common;
use common::dec;

fn ctx<'a>(rules: &'a AttendanceRules) -> CorrectionContext<'a> {
    CorrectionContext {
        auth: &AllowAll,
        actor: "admin",
        rules,
        decimals: 2,
    }
}

/// One user, September 2025 finalized at lunch 50 / dinner 40.
fn finalized_month(pool: &mut DbPool, rules: &AttendanceRules) -> (i64, i64) {
    let ann = UserLogic::add(pool, "ann").unwrap().id;
    let patch = MonthSettingsPatch {
        lunch_rate: Some(dec("50")),
        dinner_rate: Some(dec("40")),
        ..Default::default()
    };
    let month = MonthLogic::save(pool, 2025, 9, &patch).unwrap();
    MonthLogic::finalize(pool, &AllowAll, "admin", rules, month.id).unwrap();
    (ann, month.id)
}

#[test]
fn force_update_rewrites_a_finalized_month() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, id) = finalized_month(&mut pool, &rules);

    let entry = CorrectionLogic::force_update(
        &mut pool,
        &ctx(&rules),
        TargetType::MonthSettings,
        &id.to_string(),
        json!({ "lunch_rate": 60 }),
        "rate correction",
    )
    .unwrap();

    assert_eq!(entry.action, CorrectionAction::ForceUpdate);
    assert_eq!(entry.reason, "rate correction");
    assert_ne!(entry.previous_value["lunch_rate"], json!("60"));
    assert_eq!(entry.new_value["lunch_rate"], json!("60"));
    assert_eq!(entry.new_value["compensating_transactions"].as_array().unwrap().len(), 1);

    let month = MonthLogic::get(&mut pool, id).unwrap();
    assert!(month.is_finalized());
    assert_eq!(month.lunch_rate, Some(dec("60")));

    // 30 lunches at the new rate, charged once.
    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Lunch).unwrap().amount,
        dec("-1800")
    );
    assert!(LedgerLogic::verify(&mut pool).unwrap().is_empty());
}

#[test]
fn force_update_of_a_meal_recharges_its_month() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, id) = finalized_month(&mut pool, &rules);

    let entry = CorrectionLogic::force_update(
        &mut pool,
        &ctx(&rules),
        TargetType::MealRecord,
        &format!("2025-09-10:{ann}:dinner"),
        json!({ "count": 3 }),
        "two guests",
    )
    .unwrap();
    assert_eq!(entry.target_type, TargetType::MealRecord);

    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Dinner).unwrap().amount,
        dec("-1280")
    );

    let history = LedgerLogic::history(&mut pool, Some(ann), &Default::default(), Page::default()).unwrap();
    assert_eq!(history[0].source, TxSource::Month(id));
    assert_eq!(history[0].kind, TransactionType::Adjustment);
}

#[test]
fn force_update_of_a_deducted_breakfast_adjusts_the_difference() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    let bob = UserLogic::add(&mut pool, "bob").unwrap().id;
    let input = CostInput::Individual(vec![(ann, dec("30")), (bob, dec("30"))]);
    let date = NaiveDate::from_ymd_opt(2025, 9, 4).unwrap();
    let entry = BreakfastLogic::submit(&mut pool, date, &input, "", "admin", 2).unwrap();
    BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();

    CorrectionLogic::force_update(
        &mut pool,
        &ctx(&rules),
        TargetType::BreakfastEntry,
        &entry.id.to_string(),
        json!({ "participants": [{ "user_id": ann, "cost": "45" }, { "user_id": bob, "cost": "15" }] }),
        "receipt split was wrong",
    )
    .unwrap();

    let b = |pool: &mut DbPool, u| LedgerLogic::balance(pool, u, MealCategory::Breakfast).unwrap().amount;
    assert_eq!(b(&mut pool, ann), dec("-45"));
    assert_eq!(b(&mut pool, bob), dec("-15"));

    let stored = BreakfastLogic::get(&mut pool, entry.id).unwrap();
    assert!(stored.is_finalized());
    assert_eq!(stored.total_cost, dec("60"));
}

#[test]
fn balance_correction_sets_the_exact_amount() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    LedgerLogic::deposit(&mut pool, ann, MealCategory::Lunch, dec("120"), "", "admin").unwrap();
    LedgerLogic::freeze(&mut pool, ann, MealCategory::Lunch, "admin").unwrap();

    let (entry, tx) = CorrectionLogic::balance_correction(
        &mut pool,
        &ctx(&rules),
        ann,
        MealCategory::Lunch,
        dec("100"),
        "cash miscount",
    )
    .unwrap();

    assert_eq!(tx.amount, dec("-20"));
    assert_eq!(tx.new_balance, dec("100"));
    assert_eq!(tx.source, TxSource::Correction(entry.id));
    assert_eq!(entry.target_type, TargetType::Balance);
    assert!(LedgerLogic::balance(&mut pool, ann, MealCategory::Lunch).unwrap().is_frozen);
}

#[test]
fn void_writes_a_reversal_pair() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    let deposit = LedgerLogic::deposit(&mut pool, ann, MealCategory::Dinner, dec("75"), "", "admin").unwrap();

    let (entry, reversal) =
        CorrectionLogic::transaction_void(&mut pool, &ctx(&rules), deposit.id, "typo").unwrap();

    assert_eq!(reversal.kind, TransactionType::Reversal);
    assert_eq!(reversal.amount, dec("-75"));
    assert_eq!(reversal.reverses_id, Some(deposit.id));
    assert_eq!(reversal.source, TxSource::Correction(entry.id));

    let original = LedgerLogic::transaction(&mut pool, deposit.id).unwrap();
    assert!(original.is_reversed);
    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Dinner).unwrap().amount,
        dec("0")
    );

    let twice = CorrectionLogic::transaction_void(&mut pool, &ctx(&rules), deposit.id, "again");
    assert_eq!(twice.unwrap_err().kind(), ErrorKind::State);
}

#[test]
fn corrections_need_a_reason_and_an_authorized_actor() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;

    let blank = CorrectionLogic::balance_correction(
        &mut pool,
        &ctx(&rules),
        ann,
        MealCategory::Lunch,
        dec("10"),
        "  ",
    );
    assert_eq!(blank.unwrap_err().kind(), ErrorKind::Validation);

    let admins = ConfigAuthorizer::new(&["boss".to_string()]);
    let outsider = CorrectionContext {
        auth: &admins,
        actor: "ann",
        rules: &rules,
        decimals: 2,
    };
    let denied =
        CorrectionLogic::balance_correction(&mut pool, &outsider, ann, MealCategory::Lunch, dec("10"), "x");
    assert_eq!(denied.unwrap_err().kind(), ErrorKind::Authorization);

    assert!(CorrectionLogic::history(&mut pool, None, Page::default()).unwrap().is_empty());
}

#[test]
fn history_lists_newest_first_and_filters_by_target() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, id) = finalized_month(&mut pool, &rules);

    CorrectionLogic::balance_correction(&mut pool, &ctx(&rules), ann, MealCategory::Lunch, dec("0"), "reset")
        .unwrap();
    CorrectionLogic::force_unfinalize(&mut pool, &ctx(&rules), TargetType::MonthSettings, &id.to_string(), "reopen")
        .unwrap();

    let all = CorrectionLogic::history(&mut pool, None, Page::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].action, CorrectionAction::ForceUnfinalize);

    let months = CorrectionLogic::history(&mut pool, Some(TargetType::MonthSettings), Page::default()).unwrap();
    assert_eq!(months.len(), 1);

    let again = CorrectionLogic::force_unfinalize(
        &mut pool,
        &ctx(&rules),
        TargetType::MonthSettings,
        &id.to_string(),
        "reopen twice",
    );
    assert_eq!(again.unwrap_err().kind(), ErrorKind::State);
}

#[test]
fn month_charges_cannot_be_voided() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, id) = finalized_month(&mut pool, &rules);
    let bob = UserLogic::add(&mut pool, "bob").unwrap().id;

    let lunch = LedgerLogic::history(&mut pool, Some(ann), &Default::default(), Page::default())
        .unwrap()
        .into_iter()
        .find(|t| t.category == MealCategory::Lunch && t.kind == TransactionType::Deduction)
        .unwrap();
    assert_eq!(lunch.source, TxSource::Month(id));

    let err = CorrectionLogic::transaction_void(&mut pool, &ctx(&rules), lunch.id, "waive")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert!(!LedgerLogic::transaction(&mut pool, lunch.id).unwrap().is_reversed);

    // A later correction of someone else leaves ann's charge as it was.
    CorrectionLogic::force_update(
        &mut pool,
        &ctx(&rules),
        TargetType::MealRecord,
        &format!("2025-09-02:{bob}:lunch"),
        json!({ "is_on": false }),
        "away",
    )
    .unwrap();
    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Lunch).unwrap().amount,
        dec("-1500")
    );
    assert!(CorrectionLogic::history(&mut pool, Some(TargetType::Transaction), Page::default())
        .unwrap()
        .is_empty());
}

#[test]
fn breakfast_charges_cannot_be_voided() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    let input = CostInput::Individual(vec![(ann, dec("12"))]);
    let date = NaiveDate::from_ymd_opt(2025, 9, 4).unwrap();
    let entry = BreakfastLogic::submit(&mut pool, date, &input, "", "admin", 2).unwrap();
    let txs = BreakfastLogic::deduct(&mut pool, entry.id, "admin").unwrap();

    let err = CorrectionLogic::transaction_void(&mut pool, &ctx(&rules), txs[0].id, "free")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Breakfast).unwrap().amount,
        dec("-12")
    );
}

#[test]
fn breakfast_update_rejects_a_repeated_participant() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    let input = CostInput::Individual(vec![(ann, dec("10"))]);
    let date = NaiveDate::from_ymd_opt(2025, 9, 4).unwrap();
    let entry = BreakfastLogic::submit(&mut pool, date, &input, "", "admin", 2).unwrap();

    let err = CorrectionLogic::force_update(
        &mut pool,
        &ctx(&rules),
        TargetType::BreakfastEntry,
        &entry.id.to_string(),
        json!({ "participants": [{ "user_id": ann, "cost": "5" }, { "user_id": ann, "cost": "7" }] }),
        "split",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let stored = BreakfastLogic::get(&mut pool, entry.id).unwrap();
    assert_eq!(stored.participants.len(), 1);
    assert_eq!(stored.total_cost, dec("10"));
}

#[test]
fn meal_update_recharges_every_overlapping_month() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, _) = finalized_month(&mut pool, &rules);

    // October starts early and shares 2025-09-25..30 with September.
    let october = MonthLogic::save(
        &mut pool,
        2025,
        10,
        &MonthSettingsPatch {
            start_date: NaiveDate::from_ymd_opt(2025, 9, 25),
            lunch_rate: Some(dec("50")),
            dinner_rate: Some(dec("40")),
            ..Default::default()
        },
    )
    .unwrap();
    MonthLogic::finalize(&mut pool, &AllowAll, "admin", &rules, october.id).unwrap();
    let lunch = |pool: &mut DbPool| LedgerLogic::balance(pool, ann, MealCategory::Lunch).unwrap().amount;
    // 30 + 37 lunches
    assert_eq!(lunch(&mut pool), dec("-3350"));

    let entry = CorrectionLogic::force_update(
        &mut pool,
        &ctx(&rules),
        TargetType::MealRecord,
        &format!("2025-09-27:{ann}:lunch"),
        json!({ "is_on": false }),
        "away",
    )
    .unwrap();
    assert_eq!(entry.new_value["compensating_transactions"].as_array().unwrap().len(), 2);
    assert_eq!(lunch(&mut pool), dec("-3250"));
    assert!(LedgerLogic::verify(&mut pool).unwrap().is_empty());
}
