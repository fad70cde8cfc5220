//! ANSI colour helpers for terminal tables.

use crate::models::month_settings::SettlementStatus;
use rust_decimal::Decimal;

pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Positive → green, negative → red, zero → plain.
pub fn color_for_amount(value: Decimal) -> &'static str {
    if value.is_zero() {
        RESET
    } else if value.is_sign_negative() {
        RED
    } else {
        GREEN
    }
}

pub fn colorize_amount(value: Decimal) -> String {
    format!("{}{}{RESET}", color_for_amount(value), value.normalize())
}

pub fn colorize_status(status: SettlementStatus) -> String {
    let (color, label) = match status {
        SettlementStatus::Due => (RED, "due"),
        SettlementStatus::Advance => (GREEN, "advance"),
        SettlementStatus::Settled => (RESET, "settled"),
    };
    format!("{color}{label}{RESET}")
}

/// Greys out meals that are off.
pub fn colorize_meal(is_on: bool, count: u32, manual: bool) -> String {
    let mark = if manual { "*" } else { "" };
    if is_on {
        format!("{count}{mark}")
    } else {
        format!("{GREY}off{mark}{RESET}")
    }
}
