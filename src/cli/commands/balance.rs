use crate::cli::parser::{BalanceCmd, Commands};
use crate::config::Config;
use crate::core::ledger::LedgerLogic;
use crate::errors::AppResult;
use crate::export::BalanceRecord;
use crate::models::balance::Balance;
use crate::models::category::MealCategory;
use crate::ui::messages::{info, success};
use crate::utils::colors::{CYAN, RESET, colorize_amount};
use crate::utils::table::Table;
use std::collections::BTreeMap;

use super::{name_of, open_pool, parse_category, print_json, resolve_user, user_names};

fn cell(b: Option<&Balance>) -> String {
    match b {
        Some(b) if b.is_frozen => format!("{} {CYAN}❄{RESET}", colorize_amount(b.amount)),
        Some(b) => colorize_amount(b.amount),
        None => colorize_amount(Default::default()),
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Balance { action } = cmd else {
        return Ok(());
    };
    let mut pool = open_pool(cfg)?;

    match action {
        BalanceCmd::Show { user, json } => {
            let balances = match user {
                Some(name) => {
                    let u = resolve_user(&mut pool, name)?;
                    LedgerLogic::balances(&mut pool, u.id)?
                }
                None => LedgerLogic::all_balances(&mut pool)?,
            };
            let names = user_names(&mut pool)?;

            if *json {
                let records: Vec<BalanceRecord> = balances
                    .iter()
                    .map(|b| BalanceRecord::new(b, &name_of(&names, b.user_id)))
                    .collect();
                return print_json(&records);
            }

            if balances.is_empty() {
                info("No balances recorded yet.");
                return Ok(());
            }

            let mut by_user: BTreeMap<i64, Vec<Balance>> = BTreeMap::new();
            for b in balances {
                by_user.entry(b.user_id).or_default().push(b);
            }

            let mut table = Table::new(vec!["User", "Breakfast", "Lunch", "Dinner"]);
            for (user_id, rows) in &by_user {
                let find = |c: MealCategory| rows.iter().find(|b| b.category == c);
                table.add_row(vec![
                    name_of(&names, *user_id),
                    cell(find(MealCategory::Breakfast)),
                    cell(find(MealCategory::Lunch)),
                    cell(find(MealCategory::Dinner)),
                ]);
            }
            print!("{}", table.render());
        }
        BalanceCmd::Freeze { user, category } => {
            let category = parse_category(category)?;
            let u = resolve_user(&mut pool, user)?;
            LedgerLogic::freeze(&mut pool, u.id, category, &cfg.operator)?;
            success(format!("{} balance of {} is frozen", category, u.name));
        }
        BalanceCmd::Unfreeze { user, category } => {
            let category = parse_category(category)?;
            let u = resolve_user(&mut pool, user)?;
            LedgerLogic::unfreeze(&mut pool, u.id, category, &cfg.operator)?;
            success(format!("{} balance of {} is unfrozen", category, u.name));
        }
    }

    Ok(())
}
