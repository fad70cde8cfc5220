use chrono::NaiveDate;
use mealbook::core::attendance::{AttendanceLogic, AttendanceRules};
use mealbook::core::auth::{AllowAll, ConfigAuthorizer};
use mealbook::core::correction::{CorrectionContext, CorrectionLogic};
use mealbook::core::ledger::LedgerLogic;
use mealbook::core::month::MonthLogic;
use mealbook::core::users::UserLogic;
use mealbook::db::pool::DbPool;
use mealbook::errors::{AppError, ErrorKind};
use mealbook::models::category::MealCategory;
use mealbook::models::correction::TargetType;
use mealbook::models::month_settings::{MonthSettingsPatch, SettlementStatus};
use mealbook::models::transaction::{HistoryFilter, Page};
use std::thread;

mod common;
use common::{dec, file_pool};

fn sep(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
}

fn rated_patch() -> MonthSettingsPatch {
    MonthSettingsPatch {
        lunch_rate: Some(dec("50")),
        dinner_rate: Some(dec("40")),
        ..Default::default()
    }
}

/// ann and bob, September 2025 with rates; ann skips lunch on the 1st.
fn setup(pool: &mut DbPool) -> (i64, i64, i64) {
    let rules = AttendanceRules::default();
    let ann = UserLogic::add(pool, "ann").unwrap().id;
    let bob = UserLogic::add(pool, "bob").unwrap().id;
    AttendanceLogic::set(pool, &rules, sep(1), ann, MealCategory::Lunch, false).unwrap();
    let month = MonthLogic::save(pool, 2025, 9, &rated_patch()).unwrap();
    (ann, bob, month.id)
}

fn tx_count(pool: &mut DbPool) -> usize {
    let page = Page { offset: 0, limit: 10_000 };
    let filter = HistoryFilter {
        include_reversed: true,
        ..Default::default()
    };
    LedgerLogic::history(pool, None, &filter, page).unwrap().len()
}

#[test]
fn default_month_covers_the_calendar_month() {
    let mut pool = DbPool::in_memory().unwrap();
    let m = MonthLogic::get_or_create_default(&mut pool, 2024, 2).unwrap();
    assert_eq!(m.start_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(m.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert!(m.lunch_rate.is_none());

    let again = MonthLogic::get_or_create_default(&mut pool, 2024, 2).unwrap();
    assert_eq!(again.id, m.id);
}

#[test]
fn finalize_charges_meals_and_locks_the_month() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, bob, id) = setup(&mut pool);

    let txs = MonthLogic::finalize(&mut pool, &AllowAll, "admin", &rules, id).unwrap();
    assert_eq!(txs.len(), 4);

    let lunch = |pool: &mut DbPool, u| LedgerLogic::balance(pool, u, MealCategory::Lunch).unwrap().amount;
    let dinner = |pool: &mut DbPool, u| LedgerLogic::balance(pool, u, MealCategory::Dinner).unwrap().amount;
    assert_eq!(lunch(&mut pool, ann), dec("-1450"));
    assert_eq!(lunch(&mut pool, bob), dec("-1500"));
    assert_eq!(dinner(&mut pool, ann), dec("-1200"));
    assert_eq!(dinner(&mut pool, bob), dec("-1200"));

    let m = MonthLogic::get(&mut pool, id).unwrap();
    assert!(m.is_finalized());

    let again = MonthLogic::finalize(&mut pool, &AllowAll, "admin", &rules, id).unwrap_err();
    assert!(matches!(again, AppError::AlreadyFinalized(_)));

    let save = MonthLogic::save(&mut pool, 2025, 9, &rated_patch()).unwrap_err();
    assert!(matches!(save, AppError::AlreadyFinalized(_)));

    let toggle = AttendanceLogic::toggle(&mut pool, &rules, sep(2), ann, MealCategory::Dinner)
        .unwrap_err();
    assert_eq!(toggle.kind(), ErrorKind::State);
}

#[test]
fn finalize_requires_rates_and_an_admin() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    UserLogic::add(&mut pool, "ann").unwrap();
    let m = MonthLogic::get_or_create_default(&mut pool, 2025, 10).unwrap();

    let admins = ConfigAuthorizer::new(&["boss".to_string()]);
    let denied = MonthLogic::finalize(&mut pool, &admins, "ann", &rules, m.id).unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::Authorization);

    let unrated = MonthLogic::finalize(&mut pool, &admins, "boss", &rules, m.id).unwrap_err();
    assert_eq!(unrated.kind(), ErrorKind::Validation);
    assert!(!MonthLogic::get(&mut pool, m.id).unwrap().is_finalized());
}

#[test]
fn preview_is_pure_and_repeatable() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, _, id) = setup(&mut pool);
    let threshold = dec("500");

    let before = tx_count(&mut pool);
    let first = MonthLogic::preview(&mut pool, &rules, threshold, id).unwrap();
    let second = MonthLogic::preview(&mut pool, &rules, threshold, id).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(tx_count(&mut pool), before);
    assert!(!MonthLogic::get(&mut pool, id).unwrap().is_finalized());

    let row = first.rows.iter().find(|r| r.user_id == ann).unwrap();
    assert_eq!(row.lunch_meals, 29);
    assert_eq!(row.dinner_meals, 30);
    assert_eq!(row.total_cost, dec("2650"));
    assert_eq!(row.net, row.deposits - row.total_cost);
    assert_eq!(row.status, SettlementStatus::Due);
    assert!(row.is_defaulter);
}

#[test]
fn refinalize_after_unfinalize_commits_only_differences() {
    let mut pool = DbPool::in_memory().unwrap();
    let rules = AttendanceRules::default();
    let (ann, _, id) = setup(&mut pool);

    MonthLogic::finalize(&mut pool, &AllowAll, "admin", &rules, id).unwrap();

    let ctx = CorrectionContext {
        auth: &AllowAll,
        actor: "admin",
        rules: &rules,
        decimals: 2,
    };
    CorrectionLogic::force_unfinalize(&mut pool, &ctx, TargetType::MonthSettings, &id.to_string(), "late meal")
        .unwrap();

    // Unchanged data: nothing more is charged.
    let txs = MonthLogic::finalize(&mut pool, &AllowAll, "admin", &rules, id).unwrap();
    assert!(txs.iter().all(|t| t.amount.is_zero()));
    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Lunch).unwrap().amount,
        dec("-1450")
    );

    CorrectionLogic::force_unfinalize(&mut pool, &ctx, TargetType::MonthSettings, &id.to_string(), "one more")
        .unwrap();
    AttendanceLogic::set(&mut pool, &rules, sep(2), ann, MealCategory::Lunch, false).unwrap();
    MonthLogic::finalize(&mut pool, &AllowAll, "admin", &rules, id).unwrap();
    assert_eq!(
        LedgerLogic::balance(&mut pool, ann, MealCategory::Lunch).unwrap().amount,
        dec("-1400")
    );
    assert!(LedgerLogic::verify(&mut pool).unwrap().is_empty());
}

#[test]
fn concurrent_finalize_has_exactly_one_winner() {
    let (db_path, mut pool) = file_pool("concurrent_finalize");
    let (_, _, id) = setup(&mut pool);
    drop(pool);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let path = db_path.clone();
            thread::spawn(move || {
                let mut pool = DbPool::new(&path).unwrap();
                MonthLogic::finalize(&mut pool, &AllowAll, "admin", &AttendanceRules::default(), id)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::AlreadyFinalized(_)))));

    let mut pool = DbPool::new(&db_path).unwrap();
    assert_eq!(tx_count(&mut pool), 4);
}
