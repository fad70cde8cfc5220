//! mealbook library root.
//! Exposes the CLI parser, the high-level run() function and the internal
//! modules (ledger, attendance, breakfast, months, corrections).

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod export;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::commands;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use utils::path::expand_str;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => commands::init::handle(cli),
        Commands::Config { .. } => commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => commands::log::handle(&cli.command, cfg),
        Commands::User { .. } => commands::user::handle(&cli.command, cfg),
        Commands::Deposit { .. } => commands::deposit::handle(&cli.command, cfg),
        Commands::Balance { .. } => commands::balance::handle(&cli.command, cfg),
        Commands::History { .. } => commands::history::handle(&cli.command, cfg),
        Commands::Meal { .. } => commands::meal::handle(&cli.command, cfg),
        Commands::Breakfast { .. } => commands::breakfast::handle(&cli.command, cfg),
        Commands::Month { .. } => commands::month::handle(&cli.command, cfg),
        Commands::Correct { .. } => commands::correct::handle(&cli.command, cfg),
        Commands::Backup { .. } => commands::backup::handle(&cli.command, cfg),
        Commands::Export { .. } => commands::export::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // `init` writes the configuration, everything else reads it once.
    if matches!(cli.command, Commands::Init) {
        return dispatch(&cli, &Config::default());
    }

    let mut cfg = if cli.test {
        Config::default()
    } else {
        Config::load()?
    };

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }
    if let Some(actor) = &cli.actor {
        cfg.operator = actor.clone();
    }
    cfg.database = expand_str(&cfg.database);

    dispatch(&cli, &cfg)
}
