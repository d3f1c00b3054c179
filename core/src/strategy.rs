//! Repayment strategies and the extra-payment priority score.
//!
//! Higher score = paid first. Both strategies sort descending.

use crate::{error::PayoffError, money::is_paid_off, types::Position};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const APR_WEIGHT: Decimal = dec!(1000000);
const POSITION_BASE: Decimal = dec!(30);
const POSITION_SCALE: Decimal = dec!(1000);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Highest effective APR first.
    #[default]
    Avalanche,
    /// Lowest remaining balance first.
    Snowball,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avalanche => "avalanche",
            Self::Snowball  => "snowball",
        }
    }

    /// Priority score for a bucket, or `None` when it is already paid off
    /// and takes no part in extra allocation.
    pub fn score(&self, effective_apr: Decimal, position: Position, remaining: Decimal) -> Option<Decimal> {
        if is_paid_off(remaining) {
            return None;
        }
        Some(match self {
            Self::Avalanche => avalanche_score(effective_apr, position),
            Self::Snowball  => -remaining,
        })
    }
}

/// `apr × 1,000,000 + (30 − position) / 1000`. The position term only
/// separates buckets with identical APRs; earlier buckets win.
pub fn avalanche_score(effective_apr: Decimal, position: Position) -> Decimal {
    effective_apr * APR_WEIGHT + (POSITION_BASE - Decimal::from(position)) / POSITION_SCALE
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = PayoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avalanche" => Ok(Self::Avalanche),
            "snowball"  => Ok(Self::Snowball),
            other => Err(PayoffError::invalid(
                "strategy",
                format!("expected 'avalanche' or 'snowball', got '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_apr_scores_higher() {
        assert!(avalanche_score(dec!(0.20), 0) > avalanche_score(dec!(0.18), 0));
    }

    #[test]
    fn earlier_position_breaks_ties() {
        assert!(avalanche_score(dec!(0.20), 0) > avalanche_score(dec!(0.20), 1));
    }

    #[test]
    fn apr_difference_dominates_position() {
        assert!(avalanche_score(dec!(0.20), 29) > avalanche_score(dec!(0.19), 0));
        assert!(avalanche_score(dec!(0.1901), 200) > avalanche_score(dec!(0.19), 0));
    }

    #[test]
    fn avalanche_score_matches_formula() {
        assert_eq!(avalanche_score(dec!(0.20), 1), dec!(200000.029));
        assert_eq!(avalanche_score(dec!(0), 5), dec!(0.025));
    }

    #[test]
    fn snowball_prefers_smaller_balances() {
        let small = Strategy::Snowball.score(dec!(0.10), 5, dec!(200)).unwrap();
        let large = Strategy::Snowball.score(dec!(0.30), 0, dec!(900)).unwrap();
        assert!(small > large);
    }

    #[test]
    fn paid_off_buckets_are_not_scored() {
        assert_eq!(Strategy::Avalanche.score(dec!(0.3), 0, dec!(0.01)), None);
        assert_eq!(Strategy::Snowball.score(dec!(0.3), 0, dec!(0)), None);
    }

    #[test]
    fn strategy_round_trips_through_text() {
        assert_eq!("snowball".parse::<Strategy>().unwrap(), Strategy::Snowball);
        assert_eq!(Strategy::Avalanche.to_string(), "avalanche");
        assert!("optimal".parse::<Strategy>().is_err());
    }
}
