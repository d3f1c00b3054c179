//! Snapshot of every card and bucket, as handed to the engine and the
//! read-side reports.
//!
//! A snapshot is an owned copy. The engine never writes back into it.

use crate::card::CardSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DebtSnapshot {
    pub cards: Vec<CardSnapshot>,
}

impl DebtSnapshot {
    pub fn new(cards: Vec<CardSnapshot>) -> Self {
        Self { cards }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn total_debt(&self) -> Decimal {
        self.cards.iter().map(CardSnapshot::total_balance).sum()
    }

    /// Cards the engine simulates: those with at least one bucket.
    pub fn simulated_cards(&self) -> impl Iterator<Item = &CardSnapshot> {
        self.cards.iter().filter(|c| !c.buckets.is_empty())
    }
}
