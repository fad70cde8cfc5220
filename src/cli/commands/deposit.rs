use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ledger::LedgerLogic;
use crate::errors::AppResult;
use crate::ui::messages::success;
use crate::utils::colors::colorize_amount;

use super::{open_pool, parse_amount, parse_category, resolve_user};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Deposit {
        user,
        category,
        amount,
        note,
    } = cmd
    {
        let category = parse_category(category)?;
        let amount = parse_amount(amount)?;
        let mut pool = open_pool(cfg)?;
        let user = resolve_user(&mut pool, user)?;

        let tx = LedgerLogic::deposit(&mut pool, user.id, category, amount, note, &cfg.operator)?;
        success(format!(
            "Deposit #{} for {} ({}): balance {} → {}",
            tx.id,
            user.name,
            category,
            colorize_amount(tx.previous_balance),
            colorize_amount(tx.new_balance)
        ));
    }
    Ok(())
}
