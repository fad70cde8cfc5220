use crate::cli::parser::{Commands, HolidayCmd, MealCmd};
use crate::config::Config;
use crate::core::attendance::{AttendanceLogic, AttendanceRules};
use crate::errors::AppResult;
use crate::models::meal_record::DailyMealRecord;
use crate::ui::messages::{info, success};
use crate::utils::colors::{RESET, YELLOW, colorize_meal};
use crate::utils::date::{month_bounds, parse_date, parse_period, parse_year_month, today};
use crate::utils::table::Table;
use chrono::Datelike;

use super::{open_pool, parse_meal, resolve_user};

fn describe(user: &str, rec: &DailyMealRecord) -> String {
    let state = if rec.is_on { "on" } else { "off" };
    let origin = if rec.is_manually_set { "manual" } else { "default" };
    format!(
        "{} {} {}: {} (count {}, {})",
        rec.date, user, rec.meal, state, rec.count, origin
    )
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Meal { action } = cmd else {
        return Ok(());
    };
    let rules = AttendanceRules::from_config(cfg)?;
    let mut pool = open_pool(cfg)?;

    match action {
        MealCmd::Toggle { date, user, meal } => {
            let date = parse_date(date)?;
            let meal = parse_meal(meal)?;
            let u = resolve_user(&mut pool, user)?;
            let rec = AttendanceLogic::toggle(&mut pool, &rules, date, u.id, meal)?;
            success(describe(&u.name, &rec));
        }
        MealCmd::Set {
            date,
            user,
            meal,
            state,
        } => {
            let date = parse_date(date)?;
            let meal = parse_meal(meal)?;
            let u = resolve_user(&mut pool, user)?;
            let rec = AttendanceLogic::set(&mut pool, &rules, date, u.id, meal, state == "on")?;
            success(describe(&u.name, &rec));
        }
        MealCmd::Count {
            date,
            user,
            meal,
            count,
        } => {
            let date = parse_date(date)?;
            let meal = parse_meal(meal)?;
            let u = resolve_user(&mut pool, user)?;
            let rec = AttendanceLogic::update_count(&mut pool, &rules, date, u.id, meal, *count)?;
            success(describe(&u.name, &rec));
        }
        MealCmd::Show { date, user, meal } => {
            let date = parse_date(date)?;
            let meal = parse_meal(meal)?;
            let u = resolve_user(&mut pool, user)?;
            let rec = AttendanceLogic::get(&mut pool, &rules, date, u.id, meal)?;
            println!("{}", describe(&u.name, &rec));
        }
        MealCmd::Sheet { user, month } => {
            let (year, m) = match month {
                Some(s) => parse_year_month(s)?,
                None => {
                    let t = today();
                    (t.year(), t.month())
                }
            };
            let (start, end) = month_bounds(year, m)?;
            let u = resolve_user(&mut pool, user)?;
            let days = AttendanceLogic::sheet(&mut pool, &rules, u.id, start, end)?;

            println!("🍽️  {}  {:04}-{:02}\n", u.name, year, m);
            let mut table = Table::new(vec!["Date", "Day", "Lunch", "Dinner", ""]);
            let (mut lunches, mut dinners) = (0u32, 0u32);
            for d in &days {
                lunches += d.lunch.billable();
                dinners += d.dinner.billable();
                let note = if d.is_holiday {
                    format!("{YELLOW}holiday{RESET}")
                } else {
                    String::new()
                };
                table.add_row(vec![
                    d.date.to_string(),
                    d.date.weekday().to_string(),
                    colorize_meal(d.lunch.is_on, d.lunch.count, d.lunch.is_manually_set),
                    colorize_meal(d.dinner.is_on, d.dinner.count, d.dinner.is_manually_set),
                    note,
                ]);
            }
            print!("{}", table.render());
            println!("\nTotal: {} lunch, {} dinner  (* = set by hand)", lunches, dinners);
        }
        MealCmd::Holiday { action } => match action {
            HolidayCmd::Add { date, description } => {
                let date = parse_date(date)?;
                AttendanceLogic::add_holiday(&mut pool, date, description)?;
                success(format!("Holiday added on {date}"));
            }
            HolidayCmd::Remove { date } => {
                let date = parse_date(date)?;
                AttendanceLogic::remove_holiday(&mut pool, date)?;
                success(format!("Holiday on {date} removed"));
            }
            HolidayCmd::List { period } => {
                let (start, end) = match period {
                    Some(p) => parse_period(p)?,
                    None => parse_period(&today().year().to_string())?,
                };
                let holidays = AttendanceLogic::list_holidays(&mut pool, start, end)?;
                if holidays.is_empty() {
                    info("No holidays in range.");
                    return Ok(());
                }
                let mut table = Table::new(vec!["Date", "Day", "Description"]);
                for h in holidays {
                    table.add_row(vec![
                        h.date.to_string(),
                        h.date.weekday().to_string(),
                        h.description,
                    ]);
                }
                print!("{}", table.render());
            }
        },
    }

    Ok(())
}
