use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ledger::LedgerLogic;
use crate::errors::{AppError, AppResult};
use crate::export::TransactionRecord;
use crate::models::transaction::{HistoryFilter, Page, TransactionType, TxSource};
use crate::ui::messages::info;
use crate::utils::colors::{GREY, RESET, colorize_amount};
use crate::utils::date::parse_period;
use crate::utils::table::Table;

use super::{name_of, open_pool, parse_category, print_json, resolve_user, user_names};

fn source_label(source: &TxSource) -> String {
    match source {
        TxSource::Manual => "manual".to_string(),
        TxSource::Breakfast(id) => format!("breakfast #{id}"),
        TxSource::Month(id) => format!("month #{id}"),
        TxSource::Correction(id) => format!("correction #{id}"),
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::History {
        user,
        category,
        kind,
        period,
        include_reversed,
        limit,
        offset,
        json,
    } = cmd
    {
        let mut filter = HistoryFilter {
            include_reversed: *include_reversed,
            ..Default::default()
        };
        if let Some(c) = category {
            filter.category = Some(parse_category(c)?);
        }
        if let Some(k) = kind {
            filter.kind = Some(TransactionType::from_db_str(&k.to_lowercase()).ok_or_else(|| {
                AppError::Validation(format!("unknown transaction type '{k}'"))
            })?);
        }
        if let Some(p) = period {
            let (from, to) = parse_period(p)?;
            filter.from = Some(from);
            filter.to = Some(to);
        }

        let mut pool = open_pool(cfg)?;
        let user_id = match user {
            Some(name) => Some(resolve_user(&mut pool, name)?.id),
            None => None,
        };
        let page = Page {
            offset: *offset,
            limit: *limit,
        };
        let txs = LedgerLogic::history(&mut pool, user_id, &filter, page)?;

        if *json {
            let records: Vec<TransactionRecord> = txs.iter().map(TransactionRecord::from).collect();
            return print_json(&records);
        }

        if txs.is_empty() {
            info("No transactions found.");
            return Ok(());
        }

        let names = user_names(&mut pool)?;
        let mut table = Table::new(vec![
            "ID", "Date", "User", "Cat", "Type", "Amount", "Balance", "Source", "By", "Note",
        ]);
        for t in &txs {
            let mut kind = t.kind.to_string();
            if t.is_reversed {
                kind = format!("{GREY}{kind} (rev){RESET}");
            }
            table.add_row(vec![
                t.id.to_string(),
                t.created_at.get(..10).unwrap_or(&t.created_at).to_string(),
                name_of(&names, t.user_id),
                t.category.to_string(),
                kind,
                colorize_amount(t.amount),
                t.new_balance.normalize().to_string(),
                source_label(&t.source),
                t.performed_by.clone(),
                t.description.clone(),
            ]);
        }
        print!("{}", table.render());
    }
    Ok(())
}
