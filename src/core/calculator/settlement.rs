//! Charge arithmetic shared by month finalization, breakfast deduction and
//! override corrections.

use crate::models::category::MealCategory;
use crate::models::month_settings::SettlementStatus;
use crate::models::transaction::TransactionType;
use rust_decimal::Decimal;

/// What one user owes for one category of an artifact. `charge >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeTarget {
    pub user_id: i64,
    pub category: MealCategory,
    pub charge: Decimal,
}

/// A transaction the commit step will ask the ledger for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedTx {
    pub user_id: i64,
    pub category: MealCategory,
    pub kind: TransactionType,
    /// Magnitude for deductions, signed for adjustments.
    pub amount: Decimal,
}

pub fn classify(net: Decimal) -> SettlementStatus {
    if net.is_zero() {
        SettlementStatus::Settled
    } else if net.is_sign_negative() {
        SettlementStatus::Due
    } else {
        SettlementStatus::Advance
    }
}

pub fn is_defaulter(net: Decimal, threshold: Decimal) -> bool {
    -net > threshold
}

/// Plan the transactions that bring an artifact's ledger footprint to
/// `targets`.
///
/// `committed` is the net signed amount already linked to the artifact per
/// (user, category). Nothing committed yet means plain deductions; otherwise
/// only the difference is committed as adjustments. Users present only in
/// `committed` are brought back to zero.
pub fn plan_commit(
    targets: &[ChargeTarget],
    committed: &[(i64, MealCategory, Decimal)],
    include_zero: bool,
) -> Vec<PlannedTx> {
    if committed.is_empty() {
        return targets
            .iter()
            .filter(|t| include_zero || !t.charge.is_zero())
            .map(|t| PlannedTx {
                user_id: t.user_id,
                category: t.category,
                kind: TransactionType::Deduction,
                amount: t.charge,
            })
            .collect();
    }

    let already = |user: i64, cat: MealCategory| -> Decimal {
        committed
            .iter()
            .filter(|(u, c, _)| *u == user && *c == cat)
            .map(|(_, _, a)| *a)
            .sum()
    };

    let mut plan: Vec<PlannedTx> = targets
        .iter()
        .map(|t| PlannedTx {
            user_id: t.user_id,
            category: t.category,
            kind: TransactionType::Adjustment,
            amount: -t.charge - already(t.user_id, t.category),
        })
        .collect();

    for (user, cat, net) in committed {
        let known = targets
            .iter()
            .any(|t| t.user_id == *user && t.category == *cat);
        if !known {
            plan.push(PlannedTx {
                user_id: *user,
                category: *cat,
                kind: TransactionType::Adjustment,
                amount: -*net,
            });
        }
    }

    plan.retain(|p| include_zero || !p.amount.is_zero());
    plan
}
