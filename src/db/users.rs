use crate::db::db_utils::{bool_col, now_ts};
use crate::errors::{AppError, AppResult};
use crate::models::user::User;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        is_active: bool_col(row, "is_active")?,
        created_at: row.get("created_at")?,
    })
}

pub fn insert_user(conn: &Connection, name: &str) -> AppResult<User> {
    let created_at = now_ts();
    conn.execute(
        "INSERT INTO users (name, is_active, created_at) VALUES (?1, 1, ?2)",
        params![name, created_at],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        is_active: true,
        created_at,
    })
}

pub fn find_by_name(conn: &Connection, name: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row("SELECT * FROM users WHERE name = ?1", [name], map_user)
        .optional()?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row("SELECT * FROM users WHERE id = ?1", [id], map_user)
        .optional()?;
    Ok(user)
}

pub fn get_by_id(conn: &Connection, id: i64) -> AppResult<User> {
    find_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("user #{id}")))
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2",
        params![active as i64, id],
    )?;
    Ok(())
}

pub fn list_users(conn: &Connection, only_active: bool) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM users
         WHERE (?1 = 0 OR is_active = 1)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([only_active as i64], map_user)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
