use crate::cli::parser::{Commands, CorrectCmd};
use crate::config::Config;
use crate::core::attendance::AttendanceRules;
use crate::core::auth::ConfigAuthorizer;
use crate::core::correction::{CorrectionContext, CorrectionLogic};
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::export::CorrectionRecord;
use crate::models::correction::{CorrectionLogEntry, TargetType};
use crate::models::transaction::Page;
use crate::ui::messages::{info, success};
use crate::utils::colors::colorize_amount;
use crate::utils::table::Table;
use serde_json::Value;

use super::{
    open_pool, parse_amount, parse_category, parse_meal, print_json, resolve_month_id,
    resolve_user,
};

fn parse_target(code: &str) -> AppResult<TargetType> {
    TargetType::from_code(code).ok_or_else(|| {
        AppError::Validation(format!(
            "unknown target '{code}' (expected month, breakfast or meal)"
        ))
    })
}

/// Translate the CLI form of a target id into the stored one: `YYYY-MM` for
/// months and `DATE:USER:MEAL` with a user name for meal records.
fn normalize_target_id(pool: &mut DbPool, target: TargetType, id: &str) -> AppResult<String> {
    match target {
        TargetType::MonthSettings => Ok(resolve_month_id(pool, id, false)?.to_string()),
        TargetType::MealRecord => {
            let parts: Vec<&str> = id.split(':').collect();
            match parts.as_slice() {
                [date, user, meal] => {
                    let user_id = match user.parse::<i64>() {
                        Ok(n) => n,
                        Err(_) => resolve_user(pool, user)?.id,
                    };
                    Ok(format!("{date}:{user_id}:{}", parse_meal(meal)?))
                }
                _ => Ok(id.to_string()),
            }
        }
        _ => Ok(id.to_string()),
    }
}

fn print_entry(e: &CorrectionLogEntry) {
    success(format!(
        "Correction #{} {} on {} {}",
        e.id, e.action.to_db_str(), e.target_type, e.target_id
    ));
    println!("   before : {}", e.previous_value);
    println!("   after  : {}", e.new_value);
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Correct { action } = cmd else {
        return Ok(());
    };
    let rules = AttendanceRules::from_config(cfg)?;
    let auth = ConfigAuthorizer::new(&cfg.admins);
    let ctx = CorrectionContext {
        auth: &auth,
        actor: &cfg.operator,
        rules: &rules,
        decimals: cfg.currency_decimals,
    };
    let mut pool = open_pool(cfg)?;

    match action {
        CorrectCmd::Update {
            target,
            id,
            values,
            reason,
        } => {
            let target = parse_target(target)?;
            let values: Value = serde_json::from_str(values)
                .map_err(|e| AppError::Validation(format!("--values is not valid JSON: {e}")))?;
            let id = normalize_target_id(&mut pool, target, id)?;
            let entry = CorrectionLogic::force_update(&mut pool, &ctx, target, &id, values, reason)?;
            print_entry(&entry);
        }
        CorrectCmd::Unfinalize { target, id, reason } => {
            let target = parse_target(target)?;
            let id = normalize_target_id(&mut pool, target, id)?;
            let entry = CorrectionLogic::force_unfinalize(&mut pool, &ctx, target, &id, reason)?;
            print_entry(&entry);
        }
        CorrectCmd::Balance {
            user,
            category,
            amount,
            reason,
        } => {
            let category = parse_category(category)?;
            let amount = parse_amount(amount)?;
            let u = resolve_user(&mut pool, user)?;
            let (entry, tx) =
                CorrectionLogic::balance_correction(&mut pool, &ctx, u.id, category, amount, reason)?;
            print_entry(&entry);
            println!(
                "   {} {}: {} → {}",
                u.name,
                category,
                colorize_amount(tx.previous_balance),
                colorize_amount(tx.new_balance)
            );
        }
        CorrectCmd::Void { tx_id, reason } => {
            let (entry, reversal) = CorrectionLogic::transaction_void(&mut pool, &ctx, *tx_id, reason)?;
            print_entry(&entry);
            println!(
                "   reversal #{} amount {}",
                reversal.id,
                colorize_amount(reversal.amount)
            );
        }
        CorrectCmd::Log {
            target,
            limit,
            offset,
            json,
        } => {
            let target = target.as_deref().map(parse_target).transpose()?;
            let page = Page {
                offset: *offset,
                limit: *limit,
            };
            let entries = CorrectionLogic::history(&mut pool, target, page)?;

            if *json {
                let records: Vec<CorrectionRecord> = entries.iter().map(CorrectionRecord::from).collect();
                return print_json(&records);
            }
            if entries.is_empty() {
                info("No corrections recorded.");
                return Ok(());
            }
            let mut table = Table::new(vec!["ID", "When", "Action", "Target", "By", "Reason"]);
            for e in entries {
                table.add_row(vec![
                    e.id.to_string(),
                    e.created_at.get(..16).unwrap_or(&e.created_at).replace('T', " "),
                    e.action.to_db_str().to_string(),
                    format!("{} {}", e.target_type, e.target_id),
                    e.performed_by,
                    e.reason,
                ]);
            }
            print!("{}", table.render());
        }
    }

    Ok(())
}
