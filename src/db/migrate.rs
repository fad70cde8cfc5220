use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension};

/// Ensure that the `log` table exists. Migrations record themselves there.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

const CREATE_USERS: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        is_active   INTEGER NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL
    );
"#;

const CREATE_LEDGER: &str = r#"
    CREATE TABLE IF NOT EXISTS balances (
        user_id     INTEGER NOT NULL REFERENCES users(id),
        category    TEXT NOT NULL CHECK (category IN ('breakfast','lunch','dinner')),
        amount      TEXT NOT NULL DEFAULT '0',
        is_frozen   INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, category)
    );

    CREATE TABLE IF NOT EXISTS transactions (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id          INTEGER NOT NULL REFERENCES users(id),
        category         TEXT NOT NULL CHECK (category IN ('breakfast','lunch','dinner')),
        kind             TEXT NOT NULL CHECK (kind IN ('deposit','deduction','adjustment','refund','reversal')),
        amount           TEXT NOT NULL,
        previous_balance TEXT NOT NULL,
        new_balance      TEXT NOT NULL,
        description      TEXT NOT NULL DEFAULT '',
        performed_by     TEXT NOT NULL,
        created_at       TEXT NOT NULL,
        is_reversed      INTEGER NOT NULL DEFAULT 0,
        source_type      TEXT NOT NULL DEFAULT 'manual',
        source_id        INTEGER,
        reverses_id      INTEGER REFERENCES transactions(id)
    );

    CREATE INDEX IF NOT EXISTS idx_tx_user_cat ON transactions(user_id, category, id);
    CREATE INDEX IF NOT EXISTS idx_tx_source ON transactions(source_type, source_id);

    CREATE TRIGGER IF NOT EXISTS trg_tx_no_delete
    BEFORE DELETE ON transactions
    BEGIN
        SELECT RAISE(ABORT, 'transactions are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS trg_tx_immutable
    BEFORE UPDATE OF user_id, category, kind, amount, previous_balance, new_balance,
                     description, performed_by, created_at, source_type, source_id, reverses_id
    ON transactions
    BEGIN
        SELECT RAISE(ABORT, 'transactions are immutable');
    END;
"#;

const CREATE_ATTENDANCE: &str = r#"
    CREATE TABLE IF NOT EXISTS holidays (
        date        TEXT PRIMARY KEY,
        description TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS meal_records (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        date            TEXT NOT NULL,
        user_id         INTEGER NOT NULL REFERENCES users(id),
        meal            TEXT NOT NULL CHECK (meal IN ('lunch','dinner')),
        is_on           INTEGER NOT NULL,
        count           INTEGER NOT NULL DEFAULT 1 CHECK (count >= 0),
        is_manually_set INTEGER NOT NULL DEFAULT 0,
        updated_at      TEXT NOT NULL,
        UNIQUE (date, user_id, meal)
    );

    CREATE INDEX IF NOT EXISTS idx_meal_user_date ON meal_records(user_id, date);
"#;

const CREATE_BREAKFAST: &str = r#"
    CREATE TABLE IF NOT EXISTS breakfast_entries (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        date            TEXT NOT NULL,
        description     TEXT NOT NULL DEFAULT '',
        total_cost      TEXT NOT NULL,
        status          TEXT NOT NULL DEFAULT 'draft'
                        CHECK (status IN ('draft','finalized','reopened','reversed')),
        reverse_reason  TEXT,
        created_by      TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS breakfast_participants (
        entry_id    INTEGER NOT NULL REFERENCES breakfast_entries(id) ON DELETE CASCADE,
        user_id     INTEGER NOT NULL REFERENCES users(id),
        position    INTEGER NOT NULL,
        cost        TEXT NOT NULL,
        deducted    INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (entry_id, user_id)
    );

    CREATE INDEX IF NOT EXISTS idx_breakfast_date ON breakfast_entries(date);
"#;

const CREATE_MONTHS: &str = r#"
    CREATE TABLE IF NOT EXISTS month_settings (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        year         INTEGER NOT NULL,
        month        INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
        start_date   TEXT NOT NULL,
        end_date     TEXT NOT NULL,
        lunch_rate   TEXT,
        dinner_rate  TEXT,
        status       TEXT NOT NULL DEFAULT 'draft'
                     CHECK (status IN ('draft','finalized','reopened')),
        finalized_at TEXT,
        UNIQUE (year, month)
    );
"#;

const CREATE_CORRECTIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS correction_log (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        action         TEXT NOT NULL CHECK (action IN
                       ('force_update','force_unfinalize','balance_correction','transaction_void')),
        target_type    TEXT NOT NULL,
        target_id      TEXT NOT NULL,
        previous_value TEXT NOT NULL,
        new_value      TEXT NOT NULL,
        reason         TEXT NOT NULL CHECK (length(trim(reason)) > 0),
        performed_by   TEXT NOT NULL,
        created_at     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_correction_target ON correction_log(target_type, id);

    CREATE TRIGGER IF NOT EXISTS trg_correction_no_update
    BEFORE UPDATE ON correction_log
    BEGIN
        SELECT RAISE(ABORT, 'correction log is immutable');
    END;

    CREATE TRIGGER IF NOT EXISTS trg_correction_no_delete
    BEFORE DELETE ON correction_log
    BEGIN
        SELECT RAISE(ABORT, 'correction log is immutable');
    END;
"#;

/// Ordered list of schema migrations. Versions are never renamed or reordered.
const MIGRATIONS: &[(&str, &str, &str)] = &[
    ("20250901_0001_users", CREATE_USERS, "Created users table"),
    ("20250901_0002_ledger", CREATE_LEDGER, "Created balances and transactions"),
    ("20250901_0003_attendance", CREATE_ATTENDANCE, "Created holidays and meal_records"),
    ("20250901_0004_breakfast", CREATE_BREAKFAST, "Created breakfast tables"),
    ("20250901_0005_month_settings", CREATE_MONTHS, "Created month_settings"),
    ("20250901_0006_correction_log", CREATE_CORRECTIONS, "Created correction_log"),
];

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

/// Public entry point: run all pending migrations.
///
/// Each migration runs in its own transaction together with the log row that
/// marks it applied.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    ensure_log_table(conn)?;

    for (version, sql, message) in MIGRATIONS {
        if is_applied(conn, version)? {
            continue;
        }

        let batch = format!(
            "BEGIN;\n{sql}\nINSERT INTO log (date, operation, target, message)
             VALUES (strftime('%Y-%m-%dT%H:%M:%S+00:00', 'now'), 'migration_applied', '{version}', '{message}');\nCOMMIT;"
        );

        if let Err(e) = conn.execute_batch(&batch) {
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(AppError::Migration(format!("{version}: {e}")));
        }
    }

    Ok(())
}

/// Versions recorded as applied, oldest first.
pub fn applied_versions(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();
        run_pending_migrations(&conn).unwrap();
        assert_eq!(applied_versions(&conn).unwrap().len(), MIGRATIONS.len());
    }

    #[test]
    fn transactions_reject_deletes() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (name, created_at) VALUES ('a', 'now')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (user_id, category, kind, amount, previous_balance,
                new_balance, performed_by, created_at)
             VALUES (1, 'lunch', 'deposit', '10', '0', '10', 'x', 'now')",
            [],
        )
        .unwrap();
        assert!(conn.execute("DELETE FROM transactions", []).is_err());
        assert!(
            conn.execute("UPDATE transactions SET amount = '11'", [])
                .is_err()
        );
        // flagging a reversal pair is the only permitted update
        conn.execute("UPDATE transactions SET is_reversed = 1", [])
            .unwrap();
    }
}
