use chrono::{NaiveDate, Weekday};
use mealbook::core::attendance::{AttendanceLogic, AttendanceRules};
use mealbook::core::users::UserLogic;
use mealbook::db::pool::DbPool;
use mealbook::errors::ErrorKind;
use mealbook::models::category::MealCategory::{Dinner, Lunch};

fn sep(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
}

fn setup() -> (DbPool, i64) {
    let mut pool = DbPool::in_memory().unwrap();
    let ann = UserLogic::add(&mut pool, "ann").unwrap().id;
    (pool, ann)
}

#[test]
fn weekday_rule_and_holidays_turn_meals_off() {
    let (mut pool, ann) = setup();
    // 2025-09-05 is a Friday.
    let rules = AttendanceRules {
        default_off: vec![Weekday::Fri],
        max_count: 10,
    };

    assert!(!AttendanceLogic::get(&mut pool, &rules, sep(5), ann, Lunch).unwrap().is_on);
    assert!(AttendanceLogic::get(&mut pool, &rules, sep(4), ann, Lunch).unwrap().is_on);

    AttendanceLogic::add_holiday(&mut pool, sep(4), "festival").unwrap();
    let rec = AttendanceLogic::get(&mut pool, &rules, sep(4), ann, Dinner).unwrap();
    assert!(!rec.is_on);
    assert!(!rec.is_manually_set);

    // A manual choice wins over the holiday.
    AttendanceLogic::set(&mut pool, &rules, sep(4), ann, Dinner, true).unwrap();
    assert!(AttendanceLogic::get(&mut pool, &rules, sep(4), ann, Dinner).unwrap().is_on);

    AttendanceLogic::remove_holiday(&mut pool, sep(4)).unwrap();
    let missing = AttendanceLogic::remove_holiday(&mut pool, sep(4)).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn toggle_flips_the_effective_state() {
    let (mut pool, ann) = setup();
    let rules = AttendanceRules::default();

    let off = AttendanceLogic::toggle(&mut pool, &rules, sep(2), ann, Lunch).unwrap();
    assert!(!off.is_on);
    assert!(off.is_manually_set);

    let on = AttendanceLogic::toggle(&mut pool, &rules, sep(2), ann, Lunch).unwrap();
    assert!(on.is_on);
}

#[test]
fn counts_are_clamped_and_summed() {
    let (mut pool, ann) = setup();
    let rules = AttendanceRules::default();

    let high = AttendanceLogic::update_count(&mut pool, &rules, sep(3), ann, Lunch, 99).unwrap();
    assert_eq!(high.count, 10);
    let low = AttendanceLogic::update_count(&mut pool, &rules, sep(3), ann, Dinner, -4).unwrap();
    assert_eq!(low.count, 0);

    let lunches = AttendanceLogic::meal_count(&mut pool, &rules, ann, Lunch, sep(1), sep(30)).unwrap();
    assert_eq!(lunches, 29 + 10);
    let dinners = AttendanceLogic::meal_count(&mut pool, &rules, ann, Dinner, sep(1), sep(30)).unwrap();
    assert_eq!(dinners, 29);
}

#[test]
fn sheet_covers_every_day() {
    let (mut pool, ann) = setup();
    let rules = AttendanceRules::default();
    AttendanceLogic::add_holiday(&mut pool, sep(15), "").unwrap();

    let sheet = AttendanceLogic::sheet(&mut pool, &rules, ann, sep(1), sep(30)).unwrap();
    assert_eq!(sheet.len(), 30);
    assert!(sheet[14].is_holiday);
    assert!(!sheet[14].lunch.is_on);
    assert!(sheet[0].lunch.is_on && sheet[0].dinner.is_on);
}

#[test]
fn inactive_users_cannot_change_attendance() {
    let (mut pool, ann) = setup();
    let rules = AttendanceRules::default();
    UserLogic::deactivate(&mut pool, "ann").unwrap();

    let err = AttendanceLogic::toggle(&mut pool, &rules, sep(2), ann, Lunch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn breakfast_is_not_an_attendance_meal() {
    let (mut pool, ann) = setup();
    let rules = AttendanceRules::default();
    let err = AttendanceLogic::toggle(
        &mut pool,
        &rules,
        sep(2),
        ann,
        mealbook::models::category::MealCategory::Breakfast,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
