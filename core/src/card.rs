//! Cards: debt instruments that own one or more buckets.

use crate::{
    bucket::{BucketKind, BucketSnapshot, PromoTerms},
    error::{PayoffError, PayoffResult},
    money::{check_apr, check_non_negative},
    types::EntityId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_PERCENTAGE: Decimal = dec!(0.02);
pub const DEFAULT_MIN_FLOOR: Decimal = dec!(25);

/// Contractual minimum-payment terms of a card.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MinimumTerms {
    pub percentage: Option<Decimal>,
    pub floor:      Option<Decimal>,
}

impl MinimumTerms {
    /// `min(balance, max(balance × percentage, floor))`, zero for a
    /// non-positive balance.
    pub fn minimum_for(&self, balance: Decimal) -> Decimal {
        if balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let by_percent = balance * self.percentage.unwrap_or(DEFAULT_MIN_PERCENTAGE);
        let floor = self.floor.unwrap_or(DEFAULT_MIN_FLOOR);
        by_percent.max(floor).min(balance)
    }
}

/// A card as persisted, with its buckets in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSnapshot {
    pub id:             EntityId,
    pub name:           String,
    pub standard_apr:   Option<Decimal>,
    pub minimum:        MinimumTerms,
    pub credit_limit:   Option<Decimal>,
    pub statement_day:  Option<u32>,
    pub buckets:        Vec<BucketSnapshot>,
}

impl CardSnapshot {
    /// A new card with a fresh id, default minimum terms and no buckets.
    pub fn new(name: impl Into<String>, standard_apr: impl Into<Option<Decimal>>) -> Self {
        Self {
            id:            uuid::Uuid::new_v4().to_string(),
            name:          name.into(),
            standard_apr:  standard_apr.into(),
            minimum:       MinimumTerms::default(),
            credit_limit:  None,
            statement_day: None,
            buckets:       Vec::new(),
        }
    }

    pub fn with_minimum(mut self, percentage: Decimal, floor: Decimal) -> Self {
        self.minimum = MinimumTerms { percentage: Some(percentage), floor: Some(floor) };
        self
    }

    pub fn with_limit(mut self, credit_limit: Decimal, statement_day: u32) -> Self {
        self.credit_limit = Some(credit_limit);
        self.statement_day = Some(statement_day);
        self
    }

    /// Append a bucket owned by this card.
    pub fn with_bucket(
        mut self,
        name: impl Into<String>,
        kind: BucketKind,
        balance: Decimal,
        promo: PromoTerms,
    ) -> Self {
        self.buckets.push(BucketSnapshot {
            id:      uuid::Uuid::new_v4().to_string(),
            card_id: self.id.clone(),
            name:    name.into(),
            kind,
            balance,
            promo,
        });
        self
    }

    /// Check the card's terms and every bucket before it is stored.
    pub fn validate(&self) -> PayoffResult<()> {
        let name_len = self.name.chars().count();
        if !(1..=100).contains(&name_len) {
            return Err(PayoffError::invalid("name", "must be 1 to 100 characters"));
        }
        if let Some(apr) = self.standard_apr {
            check_apr("standard_apr", apr)?;
        }
        if let Some(percentage) = self.minimum.percentage {
            check_non_negative("min_percentage", percentage)?;
        }
        if let Some(floor) = self.minimum.floor {
            check_non_negative("min_floor", floor)?;
        }
        if let Some(limit) = self.credit_limit {
            check_non_negative("credit_limit", limit)?;
        }
        if let Some(day) = self.statement_day {
            if !(1..=31).contains(&day) {
                return Err(PayoffError::invalid("statement_day", format!("must be 1 to 31, got {day}")));
            }
        }
        for bucket in &self.buckets {
            if bucket.card_id != self.id {
                return Err(PayoffError::invalid("card_id", "bucket belongs to another card"));
            }
            bucket.validate()?;
        }
        Ok(())
    }

    pub fn total_balance(&self) -> Decimal {
        self.buckets.iter().map(|b| b.balance).sum()
    }

    pub fn minimum_payment(&self) -> Decimal {
        self.minimum.minimum_for(self.total_balance())
    }
}
