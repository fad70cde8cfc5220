use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::backup::BackupLogic;
use crate::errors::AppResult;
use crate::utils::path::expand_str;

use super::open_pool;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Backup {
        file,
        compress,
        force,
    } = cmd
    {
        let mut pool = open_pool(cfg)?;
        BackupLogic::backup(&mut pool, &expand_str(file), *compress, *force)?;
    }

    Ok(())
}
