use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::log::LogLogic;
use crate::errors::AppResult;

use super::open_pool;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Log { print, operation } = cmd
        && (*print || operation.is_some())
    {
        let mut pool = open_pool(cfg)?;
        LogLogic::print_log(&mut pool, operation.as_deref())?;
    }

    Ok(())
}
