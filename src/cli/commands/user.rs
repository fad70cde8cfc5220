use crate::cli::parser::{Commands, UserCmd};
use crate::config::Config;
use crate::core::users::UserLogic;
use crate::errors::AppResult;
use crate::ui::messages::{info, success};
use crate::utils::colors::{GREY, RESET};
use crate::utils::table::Table;

use super::open_pool;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::User { action } = cmd else {
        return Ok(());
    };
    let mut pool = open_pool(cfg)?;

    match action {
        UserCmd::Add { name } => {
            let user = UserLogic::add(&mut pool, name)?;
            success(format!("User '{}' added (id {})", user.name, user.id));
        }
        UserCmd::Activate { name } => {
            let user = UserLogic::activate(&mut pool, name)?;
            success(format!("User '{}' is active", user.name));
        }
        UserCmd::Deactivate { name } => {
            let user = UserLogic::deactivate(&mut pool, name)?;
            success(format!("User '{}' is inactive", user.name));
        }
        UserCmd::List { all } => {
            let users = UserLogic::list(&mut pool, !*all)?;
            if users.is_empty() {
                info("No users.");
                return Ok(());
            }
            let mut table = Table::new(vec!["ID", "Name", "Status", "Since"]);
            for u in users {
                let status = if u.is_active {
                    "active".to_string()
                } else {
                    format!("{GREY}inactive{RESET}")
                };
                let since = u.created_at.get(..10).unwrap_or(&u.created_at).to_string();
                table.add_row(vec![u.id.to_string(), u.name, status, since]);
            }
            print!("{}", table.render());
        }
    }

    Ok(())
}
