//! Buckets: independently rated sub-balances of a card.

use crate::{
    error::{PayoffError, PayoffResult},
    money::{check_apr, check_non_negative, normalize_apr},
    types::EntityId,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    #[default]
    Purchases,
    Transfer,
}

impl BucketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchases => "purchases",
            Self::Transfer  => "transfer",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketKind {
    type Err = PayoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchases" => Ok(Self::Purchases),
            "transfer"  => Ok(Self::Transfer),
            other => Err(PayoffError::invalid(
                "bucket_type",
                format!("expected 'purchases' or 'transfer', got '{other}'"),
            )),
        }
    }
}

/// Promotional rate terms. A rate without an end date is permanent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromoTerms {
    pub apr:      Option<Decimal>,
    pub end_date: Option<NaiveDate>,
}

impl PromoTerms {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn permanent(apr: Decimal) -> Self {
        Self { apr: Some(apr), end_date: None }
    }

    pub fn until(apr: Decimal, end_date: NaiveDate) -> Self {
        Self { apr: Some(apr), end_date: Some(end_date) }
    }

    /// True when `month` is the first month past the promo end date,
    /// given the month before it.
    pub fn crossed_between(&self, previous: NaiveDate, current: NaiveDate) -> bool {
        match self.end_date {
            Some(end) => previous <= end && current > end,
            None => false,
        }
    }
}

/// Resolve the APR that applies to a bucket for `month`.
///
/// The promo end date is inclusive. Both the promo and the standard APR
/// are normalized independently, so a card entered as `20` yields `0.20`.
pub fn effective_apr(
    balance: Decimal,
    promo: &PromoTerms,
    standard_apr: Option<Decimal>,
    month: NaiveDate,
) -> Decimal {
    if balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let standard = standard_apr.unwrap_or(Decimal::ZERO);
    let apr = match (promo.apr, promo.end_date) {
        (Some(promo_apr), Some(end)) if month <= end => promo_apr,
        (Some(_), Some(_)) => standard,
        (Some(promo_apr), None) => promo_apr,
        (None, _) => standard,
    };
    normalize_apr(apr)
}

/// A bucket as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketSnapshot {
    pub id:      EntityId,
    pub card_id: EntityId,
    pub name:    String,
    pub kind:    BucketKind,
    pub balance: Decimal,
    pub promo:   PromoTerms,
}

impl BucketSnapshot {
    /// Reject shapes the engine cannot forecast: negative balance, an APR
    /// outside `0..=99.999`, or a blank name.
    pub fn validate(&self) -> PayoffResult<()> {
        let name_len = self.name.chars().count();
        if !(1..=100).contains(&name_len) {
            return Err(PayoffError::invalid("bucket_name", "must be 1 to 100 characters"));
        }
        check_non_negative("current_balance", self.balance)?;
        if let Some(apr) = self.promo.apr {
            check_apr("promo_apr", apr)?;
        }
        Ok(())
    }

    pub fn effective_apr(&self, standard_apr: Option<Decimal>, month: NaiveDate) -> Decimal {
        effective_apr(self.balance, &self.promo, standard_apr, month)
    }
}
