//! Money and rate primitives.
//!
//! All amounts are `rust_decimal::Decimal`. The simulation carries full
//! precision and only rounds when a value leaves the engine.

use crate::error::{PayoffError, PayoffResult};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Balances at or below this are treated as fully paid.
pub const PAID_OFF_THRESHOLD: Decimal = dec!(0.01);

pub const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Largest APR accepted on input, in either fraction or percentage form.
pub const MAX_APR: Decimal = dec!(99.999);

/// APRs above 1 were entered as percentage points (`20` means 20%).
pub fn normalize_apr(apr: Decimal) -> Decimal {
    if apr > Decimal::ONE {
        apr / dec!(100)
    } else {
        apr
    }
}

/// Monthly periodic rate for an annual rate.
pub fn monthly_rate(apr: Decimal) -> Decimal {
    apr / MONTHS_PER_YEAR
}

/// Round to cents at the emission boundary.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_paid_off(balance: Decimal) -> bool {
    balance <= PAID_OFF_THRESHOLD
}

pub fn check_non_negative(field: &'static str, amount: Decimal) -> PayoffResult<()> {
    if amount < Decimal::ZERO {
        return Err(PayoffError::invalid(field, format!("must not be negative, got {amount}")));
    }
    Ok(())
}

/// An APR must lie in `0..=MAX_APR`.
pub fn check_apr(field: &'static str, apr: Decimal) -> PayoffResult<()> {
    check_non_negative(field, apr)?;
    if apr > MAX_APR {
        return Err(PayoffError::invalid(field, format!("must be at most {MAX_APR}, got {apr}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_aprs_are_normalized() {
        assert_eq!(normalize_apr(dec!(20)), dec!(0.20));
        assert_eq!(normalize_apr(dec!(0.199)), dec!(0.199));
        assert_eq!(normalize_apr(Decimal::ONE), Decimal::ONE);
    }

    #[test]
    fn rounding_happens_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn apr_bounds_are_enforced() {
        assert!(check_apr("apr", dec!(0)).is_ok());
        assert!(check_apr("apr", dec!(99.999)).is_ok());
        assert!(check_apr("apr", dec!(100)).is_err());
        assert!(check_apr("apr", dec!(-0.01)).is_err());
    }

    #[test]
    fn dust_counts_as_paid_off() {
        assert!(is_paid_off(dec!(0.01)));
        assert!(is_paid_off(Decimal::ZERO));
        assert!(!is_paid_off(dec!(0.011)));
    }
}
