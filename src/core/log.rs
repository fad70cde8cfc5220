use crate::db::log::{LogRow, load_log};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use std::sync::OnceLock;

const MAX_OP_WIDTH: usize = 60;

fn strip_ansi(s: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re = ANSI.get_or_init(|| Regex::new(r"\x1B\[[0-9;]*[mK]").expect("valid ANSI pattern"));
    re.replace_all(s, "").into_owned()
}

fn color_for_operation(op: &str) -> Colour {
    match op {
        "deposit" | "refund" | "user_add" | "user_activate" => Colour::Green,
        "deduction" | "breakfast_deduct" | "user_deactivate" | "breakfast_del" => Colour::Red,
        "month_finalize" | "freeze" | "unfreeze" => Colour::Cyan,
        "migration_applied" => Colour::Purple,
        "backup" => Colour::Blue,
        "init" => Colour::RGB(255, 153, 51),
        other if other.starts_with("force_")
            || other == "balance_correction"
            || other == "transaction_void"
            || other == "breakfast_reverse" =>
        {
            Colour::Yellow
        }
        _ => Colour::White,
    }
}

/// One printable line: coloured operation (plus target), truncated on its
/// visible width.
fn render_op(row: &LogRow) -> String {
    let color = color_for_operation(&row.operation);
    let visible = if row.target.is_empty() {
        row.operation.clone()
    } else {
        format!("{} ({})", row.operation, row.target)
    };

    let truncated = if visible.chars().count() > MAX_OP_WIDTH {
        let mut s: String = visible.chars().take(MAX_OP_WIDTH - 3).collect();
        s.push_str("...");
        s
    } else {
        visible
    };

    match truncated.split_once(' ') {
        Some((op, rest)) => format!("{} {}", color.paint(op), rest),
        None => color.paint(truncated.as_str()).to_string(),
    }
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(pool: &mut DbPool, operation: Option<&str>) -> AppResult<()> {
        let entries = load_log(&pool.conn, operation)?;
        if entries.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let rendered: Vec<(String, String)> = entries
            .iter()
            .map(|r| {
                let date = chrono::DateTime::parse_from_rfc3339(&r.date)
                    .map(|dt| dt.format("%FT%T%:z").to_string())
                    .unwrap_or_else(|_| r.date.clone());
                (date, render_op(r))
            })
            .collect();

        let id_w = entries.iter().map(|r| r.id.to_string().len()).max().unwrap_or(1);
        let date_w = rendered.iter().map(|(d, _)| d.len()).max().unwrap_or(10);
        let op_w = rendered
            .iter()
            .map(|(_, op)| strip_ansi(op).chars().count())
            .max()
            .unwrap_or(10)
            .min(MAX_OP_WIDTH);

        println!("📜 Internal log:\n");

        for (row, (date, op)) in entries.iter().zip(rendered) {
            let padding = " ".repeat(op_w.saturating_sub(strip_ansi(&op).chars().count()));
            println!(
                "{:>id_w$}: {:<date_w$} | {}{} => {}",
                row.id,
                date,
                op,
                padding,
                row.message,
                id_w = id_w,
                date_w = date_w
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_targets_are_truncated_on_visible_width() {
        let row = LogRow {
            id: 1,
            date: "2025-09-01T10:00:00+00:00".into(),
            operation: "force_update".into(),
            target: "x".repeat(200),
            message: "m".into(),
        };
        let out = strip_ansi(&render_op(&row));
        assert_eq!(out.chars().count(), MAX_OP_WIDTH);
        assert!(out.ends_with("..."));
    }
}
