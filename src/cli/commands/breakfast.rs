use crate::cli::parser::{BreakfastCmd, Commands};
use crate::config::Config;
use crate::core::breakfast::BreakfastLogic;
use crate::errors::{AppError, AppResult};
use crate::models::breakfast::BreakfastEntry;
use crate::ui::messages::{info, success};
use crate::utils::colors::{GREY, RESET, colorize_amount};
use crate::utils::date::{parse_date, parse_period, today};
use crate::utils::table::Table;
use chrono::Datelike;
use std::collections::HashMap;

use super::{name_of, open_pool, parse_cost_input, print_json, user_names};

fn print_entry(entry: &BreakfastEntry, names: &HashMap<i64, String>) {
    println!(
        "🥐 Breakfast #{}  {}  [{}]  total {}",
        entry.id,
        entry.date,
        entry.state.to_db_str(),
        entry.total_cost.normalize()
    );
    if !entry.description.is_empty() {
        println!("   {}", entry.description);
    }
    if let Some(reason) = &entry.reverse_reason {
        println!("   {GREY}reversed: {reason}{RESET}");
    }
    println!();

    let mut table = Table::new(vec!["User", "Cost", "Deducted"]);
    for p in &entry.participants {
        table.add_row(vec![
            name_of(names, p.user_id),
            p.cost.normalize().to_string(),
            if p.deducted { "yes" } else { "no" }.to_string(),
        ]);
    }
    print!("{}", table.render());
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Breakfast { action } = cmd else {
        return Ok(());
    };
    let decimals = cfg.currency_decimals;
    let mut pool = open_pool(cfg)?;

    match action {
        BreakfastCmd::Submit {
            date,
            equal,
            users,
            costs,
            description,
        } => {
            let date = parse_date(date)?;
            let input = parse_cost_input(&mut pool, equal.as_deref(), users, costs)?
                .ok_or_else(|| {
                    AppError::Validation("give --equal <TOTAL> --users … or --cost USER=AMOUNT".into())
                })?;
            let entry =
                BreakfastLogic::submit(&mut pool, date, &input, description, &cfg.operator, decimals)?;
            success(format!(
                "Breakfast #{} saved as draft ({} participant(s), total {})",
                entry.id,
                entry.participants.len(),
                entry.total_cost.normalize()
            ));
        }
        BreakfastCmd::Edit {
            id,
            date,
            description,
            equal,
            users,
            costs,
        } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            let input = parse_cost_input(&mut pool, equal.as_deref(), users, costs)?;
            let entry = BreakfastLogic::edit(
                &mut pool,
                *id,
                date,
                description.as_deref(),
                input.as_ref(),
                decimals,
            )?;
            success(format!("Breakfast #{} updated", entry.id));
        }
        BreakfastCmd::Delete { id } => {
            BreakfastLogic::delete(&mut pool, *id)?;
            success(format!("Breakfast #{id} deleted"));
        }
        BreakfastCmd::Deduct { id } => {
            let txs = BreakfastLogic::deduct(&mut pool, *id, &cfg.operator)?;
            let names = user_names(&mut pool)?;
            success(format!("Breakfast #{id} finalized"));
            for t in &txs {
                println!(
                    "   {:<16} {}  → {}",
                    name_of(&names, t.user_id),
                    colorize_amount(t.amount),
                    colorize_amount(t.new_balance)
                );
            }
        }
        BreakfastCmd::Reverse { id, reason } => {
            let txs = BreakfastLogic::reverse(&mut pool, *id, reason, &cfg.operator)?;
            success(format!(
                "Breakfast #{id} reversed, {} refund(s) recorded",
                txs.len()
            ));
        }
        BreakfastCmd::List { period } => {
            let (start, end) = match period {
                Some(p) => parse_period(p)?,
                None => {
                    let t = today();
                    parse_period(&format!("{:04}-{:02}", t.year(), t.month()))?
                }
            };
            let entries = BreakfastLogic::list(&mut pool, start, end)?;
            if entries.is_empty() {
                info("No breakfast entries in range.");
                return Ok(());
            }
            let mut table = Table::new(vec!["ID", "Date", "Status", "Total", "People", "Description"]);
            for e in entries {
                table.add_row(vec![
                    e.id.to_string(),
                    e.date.to_string(),
                    e.state.to_db_str().to_string(),
                    e.total_cost.normalize().to_string(),
                    e.participants.len().to_string(),
                    e.description,
                ]);
            }
            print!("{}", table.render());
        }
        BreakfastCmd::Show { id, json } => {
            let entry = BreakfastLogic::get(&mut pool, *id)?;
            if *json {
                return print_json(&entry);
            }
            let names = user_names(&mut pool)?;
            print_entry(&entry, &names);
        }
    }

    Ok(())
}
