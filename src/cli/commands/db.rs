use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ledger::LedgerLogic;
use crate::db::migrate::run_pending_migrations;
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::{AppError, AppResult};
use crate::utils::colors::{CYAN, GREEN, RED, RESET};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        vacuum,
        info,
        verify,
    } = cmd
    {
        // Opened on first use and shared by every flag.
        let mut slot: Option<DbPool> = None;

        fn get_pool<'a>(slot: &'a mut Option<DbPool>, db_path: &str) -> AppResult<&'a mut DbPool> {
            if slot.is_none() {
                *slot = Some(DbPool::new(db_path)?);
            }
            slot.as_mut()
                .ok_or_else(|| AppError::Other("database is not open".into()))
        }

        if *migrate {
            let pool = get_pool(&mut slot, &cfg.database)?;
            println!("{}▶ Running migrations…{}", CYAN, RESET);
            run_pending_migrations(&pool.conn)?;
            println!("{}✔ Migration completed.{}\n", GREEN, RESET);
        }

        if *info {
            let pool = get_pool(&mut slot, &cfg.database)?;
            stats::print_db_info(pool, &cfg.database)?;
        }

        if *check {
            let pool = get_pool(&mut slot, &cfg.database)?;

            println!("{}▶ Running integrity check…{}", CYAN, RESET);

            let integrity: String = pool
                .conn
                .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

            if integrity == "ok" {
                println!("{}✔ Integrity check passed.{}\n", GREEN, RESET);
            } else {
                println!("{}✘ Integrity check failed:{} {}\n", RED, RESET, integrity);
            }
        }

        if *verify {
            let pool = get_pool(&mut slot, &cfg.database)?;
            println!("{}▶ Replaying ledger…{}", CYAN, RESET);

            let issues = LedgerLogic::verify(pool)?;
            if issues.is_empty() {
                println!("{}✔ Every balance matches its transaction history.{}\n", GREEN, RESET);
            } else {
                for issue in &issues {
                    println!(
                        "{}✘ user #{} {}:{} {}",
                        RED, issue.user_id, issue.category, RESET, issue.detail
                    );
                }
                println!();
            }
        }

        if *vacuum {
            let pool = get_pool(&mut slot, &cfg.database)?;
            println!("{}▶ Running VACUUM…{}", CYAN, RESET);

            pool.conn.execute_batch("VACUUM;")?;

            println!("{}✔ Vacuum completed.{}\n", GREEN, RESET);
        }
    }

    Ok(())
}
