use crate::errors::{AppError, AppResult};
use rust_decimal::{Decimal, RoundingStrategy};

/// Divide `total` into `count` shares with `decimals` places.
///
/// Every share is `total / count` truncated to the currency unit; the minor
/// units left over go one each to the first participants, so the shares
/// always add up to `total`.
pub fn equal_shares(total: Decimal, count: usize, decimals: u32) -> AppResult<Vec<Decimal>> {
    if count == 0 {
        return Err(AppError::Validation("at least one participant is required".into()));
    }
    if total.is_sign_negative() && !total.is_zero() {
        return Err(AppError::Validation(format!("total cost must not be negative: {total}")));
    }
    if total.normalize().scale() > decimals {
        return Err(AppError::Validation(format!(
            "total cost {total} has more than {decimals} decimal places"
        )));
    }

    let n = Decimal::from(count as u64);
    let unit = Decimal::new(1, decimals);
    let base = (total / n).round_dp_with_strategy(decimals, RoundingStrategy::ToZero);

    let mut left = total - base * n;
    let mut shares = vec![base; count];
    for share in shares.iter_mut() {
        if left < unit {
            break;
        }
        *share += unit;
        left -= unit;
    }

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        let s = equal_shares(Decimal::new(300, 0), 3, 2).unwrap();
        assert_eq!(s, vec![Decimal::new(100, 0); 3]);
    }

    #[test]
    fn remainder_goes_to_first_participants() {
        let s = equal_shares(Decimal::new(100, 0), 3, 2).unwrap();
        assert_eq!(
            s,
            vec![Decimal::new(3334, 2), Decimal::new(3333, 2), Decimal::new(3333, 2)]
        );
        assert_eq!(s.iter().copied().sum::<Decimal>(), Decimal::new(100, 0));
    }

    #[test]
    fn rejects_sub_unit_totals_and_empty_lists() {
        assert!(equal_shares(Decimal::new(1001, 3), 2, 2).is_err());
        assert!(equal_shares(Decimal::new(10, 0), 0, 2).is_err());
    }
}
