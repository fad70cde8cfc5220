use crate::cli::parser::{Commands, MonthCmd};
use crate::config::Config;
use crate::core::attendance::AttendanceRules;
use crate::core::auth::ConfigAuthorizer;
use crate::core::month::{MonthLogic, rate_label};
use crate::errors::AppResult;
use crate::models::month_settings::{MonthPreview, MonthSettings, MonthSettingsPatch};
use crate::ui::messages::{info, success};
use crate::utils::colors::{RED, RESET, colorize_amount, colorize_status};
use crate::utils::date::{parse_date, parse_year_month};
use crate::utils::table::Table;

use super::{name_of, open_pool, parse_amount, print_json, resolve_month_id, user_names};

fn print_settings(s: &MonthSettings) {
    println!("📅 {:04}-{:02}  (id {})  [{}]", s.year, s.month, s.id, s.state);
    println!("   range       : {} .. {}", s.start_date, s.end_date);
    println!("   lunch rate  : {}", rate_label(s.lunch_rate));
    println!("   dinner rate : {}", rate_label(s.dinner_rate));
}

fn print_preview(p: &MonthPreview) {
    println!(
        "📊 Preview {:04}-{:02}  {} .. {}  lunch {} / dinner {}\n",
        p.year,
        p.month,
        p.start_date,
        p.end_date,
        p.lunch_rate.normalize(),
        p.dinner_rate.normalize()
    );
    let mut table = Table::new(vec![
        "User", "Lunch", "Dinner", "Meal cost", "Breakfast", "Total", "Deposits", "Net", "Status",
    ]);
    for r in &p.rows {
        let name = if r.is_defaulter {
            format!("{RED}{}!{RESET}", r.user_name)
        } else {
            r.user_name.clone()
        };
        table.add_row(vec![
            name,
            r.lunch_meals.to_string(),
            r.dinner_meals.to_string(),
            (r.lunch_cost + r.dinner_cost).normalize().to_string(),
            r.breakfast_cost.normalize().to_string(),
            r.total_cost.normalize().to_string(),
            r.deposits.normalize().to_string(),
            colorize_amount(r.net),
            colorize_status(r.status),
        ]);
    }
    print!("{}", table.render());
    if p.rows.iter().any(|r| r.is_defaulter) {
        println!("\n{RED}!{RESET} due above the defaulter threshold");
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Month { action } = cmd else {
        return Ok(());
    };
    let mut pool = open_pool(cfg)?;

    match action {
        MonthCmd::Show { month } => {
            let id = resolve_month_id(&mut pool, month, true)?;
            print_settings(&MonthLogic::get(&mut pool, id)?);
        }
        MonthCmd::Save {
            month,
            start,
            end,
            lunch_rate,
            dinner_rate,
        } => {
            let (year, m) = parse_year_month(month)?;
            let patch = MonthSettingsPatch {
                start_date: start.as_deref().map(parse_date).transpose()?,
                end_date: end.as_deref().map(parse_date).transpose()?,
                lunch_rate: lunch_rate.as_deref().map(parse_amount).transpose()?,
                dinner_rate: dinner_rate.as_deref().map(parse_amount).transpose()?,
            };
            let saved = MonthLogic::save(&mut pool, year, m, &patch)?;
            success(format!("Saved {}", saved.label()));
            print_settings(&saved);
        }
        MonthCmd::Preview { month, json } => {
            let rules = AttendanceRules::from_config(cfg)?;
            let id = resolve_month_id(&mut pool, month, true)?;
            let preview = MonthLogic::preview(&mut pool, &rules, cfg.defaulter_threshold, id)?;
            if *json {
                return print_json(&preview);
            }
            print_preview(&preview);
        }
        MonthCmd::Finalize { month } => {
            let rules = AttendanceRules::from_config(cfg)?;
            let auth = ConfigAuthorizer::new(&cfg.admins);
            let id = resolve_month_id(&mut pool, month, false)?;
            let txs = MonthLogic::finalize(&mut pool, &auth, &cfg.operator, &rules, id)?;
            let names = user_names(&mut pool)?;
            success(format!("Month {month} finalized, {} transaction(s) recorded", txs.len()));
            for t in &txs {
                println!(
                    "   {:<16} {:<7} {}  → {}",
                    name_of(&names, t.user_id),
                    t.category.to_string(),
                    colorize_amount(t.amount),
                    colorize_amount(t.new_balance)
                );
            }
        }
        MonthCmd::List => {
            let months = MonthLogic::list(&mut pool)?;
            if months.is_empty() {
                info("No months configured.");
                return Ok(());
            }
            let mut table = Table::new(vec!["ID", "Month", "Start", "End", "Lunch", "Dinner", "Status"]);
            for s in months {
                table.add_row(vec![
                    s.id.to_string(),
                    format!("{:04}-{:02}", s.year, s.month),
                    s.start_date.to_string(),
                    s.end_date.to_string(),
                    rate_label(s.lunch_rate),
                    rate_label(s.dinner_rate),
                    s.state.to_string(),
                ]);
            }
            print!("{}", table.render());
        }
    }

    Ok(())
}
