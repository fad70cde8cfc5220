use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::users::{find_by_name, insert_user, list_users, set_active};
use crate::errors::{AppError, AppResult};
use crate::models::user::User;

pub struct UserLogic;

impl UserLogic {
    pub fn add(pool: &mut DbPool, name: &str) -> AppResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("user name must not be empty".into()));
        }
        pool.atomic(|conn| {
            if find_by_name(conn, name)?.is_some() {
                return Err(AppError::Validation(format!("user '{name}' already exists")));
            }
            let user = insert_user(conn, name)?;
            ttlog(conn, "user_add", &format!("user#{}", user.id), name)?;
            Ok(user)
        })
    }

    /// Look a user up by name.
    pub fn resolve(pool: &mut DbPool, name: &str) -> AppResult<User> {
        find_by_name(&pool.conn, name.trim())?
            .ok_or_else(|| AppError::NotFound(format!("user '{name}'")))
    }

    pub fn activate(pool: &mut DbPool, name: &str) -> AppResult<User> {
        Self::set_active(pool, name, true)
    }

    /// Inactive users keep their balances and history but are left out of
    /// new attendance, breakfasts, deposits and month closings.
    pub fn deactivate(pool: &mut DbPool, name: &str) -> AppResult<User> {
        Self::set_active(pool, name, false)
    }

    fn set_active(pool: &mut DbPool, name: &str, active: bool) -> AppResult<User> {
        pool.atomic(|conn| {
            let mut user = find_by_name(conn, name.trim())?
                .ok_or_else(|| AppError::NotFound(format!("user '{name}'")))?;
            if user.is_active == active {
                return Err(AppError::State(format!(
                    "user '{}' is already {}",
                    user.name,
                    if active { "active" } else { "inactive" }
                )));
            }
            set_active(conn, user.id, active)?;
            user.is_active = active;
            ttlog(
                conn,
                if active { "user_activate" } else { "user_deactivate" },
                &format!("user#{}", user.id),
                &user.name,
            )?;
            Ok(user)
        })
    }

    pub fn list(pool: &mut DbPool, only_active: bool) -> AppResult<Vec<User>> {
        pool.read(|conn| list_users(conn, only_active))
    }
}
