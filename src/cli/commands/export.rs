use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::export::ExportLogic;
use crate::utils::path::expand_str;

use super::open_pool;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Export {
        what,
        format,
        file,
        range,
        force,
    } = cmd
    {
        let mut pool = open_pool(cfg)?;
        ExportLogic::export(&mut pool, *what, *format, &expand_str(file), range, *force)?;
    }
    Ok(())
}
