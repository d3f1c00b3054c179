//! Read-side reports over the live snapshot.
//!
//! Neither report runs the engine. They answer "what does the debt look
//! like today", while the engine answers "what happens over the next N
//! months". The cliff lookahead assumes balances stay where they are, so
//! it can report a cliff that a simulated run pays down before it lands.

use crate::{
    bucket::BucketKind,
    clock::add_months,
    money::{monthly_rate, normalize_apr, round_money},
    snapshot::DebtSnapshot,
    types::EntityId,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketRate {
    pub bucket_id:      EntityId,
    pub name:           String,
    pub kind:           BucketKind,
    pub balance:        Decimal,
    pub promo_apr:      Option<Decimal>,
    pub promo_end_date: Option<NaiveDate>,
    pub effective_apr:  Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardPriority {
    pub card_id:           EntityId,
    pub card_name:         String,
    pub standard_apr:      Decimal,
    pub max_effective_apr: Decimal,
    pub total_balance:     Decimal,
    pub min_payment:       Decimal,
    pub buckets:           Vec<BucketRate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyReport {
    pub cards:              Vec<CardPriority>,
    pub total_debt:         Decimal,
    pub total_min_payments: Decimal,
}

/// Avalanche order as of `today`: cards with a balance, highest current
/// effective APR first.
pub fn strategy_order(snapshot: &DebtSnapshot, today: NaiveDate) -> StrategyReport {
    let mut cards: Vec<CardPriority> = snapshot
        .cards
        .iter()
        .filter(|card| card.total_balance() > Decimal::ZERO)
        .map(|card| {
            let buckets: Vec<BucketRate> = card
                .buckets
                .iter()
                .map(|b| BucketRate {
                    bucket_id:      b.id.clone(),
                    name:           b.name.clone(),
                    kind:           b.kind,
                    balance:        round_money(b.balance),
                    promo_apr:      b.promo.apr,
                    promo_end_date: b.promo.end_date,
                    effective_apr:  b.effective_apr(card.standard_apr, today),
                })
                .collect();
            let max_effective_apr = buckets
                .iter()
                .map(|b| b.effective_apr)
                .max()
                .unwrap_or(Decimal::ZERO);

            CardPriority {
                card_id:       card.id.clone(),
                card_name:     card.name.clone(),
                standard_apr:  normalize_apr(card.standard_apr.unwrap_or(Decimal::ZERO)),
                max_effective_apr,
                total_balance: round_money(card.total_balance()),
                min_payment:   round_money(card.minimum_payment()),
                buckets,
            }
        })
        .collect();

    // Stable: equal APRs keep snapshot order.
    cards.sort_by(|a, b| b.max_effective_apr.cmp(&a.max_effective_apr));

    let total_debt = cards.iter().map(|c| c.total_balance).sum();
    let total_min_payments = cards.iter().map(|c| c.min_payment).sum();
    StrategyReport { cards, total_debt, total_min_payments }
}

/// A promo rate ending inside the lookahead window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliffWarning {
    pub card_id:                   EntityId,
    pub card_name:                 String,
    pub bucket_id:                 EntityId,
    pub bucket_name:               String,
    pub promo_end_date:            NaiveDate,
    pub balance:                   Decimal,
    pub promo_apr:                 Decimal,
    pub standard_apr:              Decimal,
    pub monthly_interest_increase: Decimal,
}

/// Buckets whose promo ends within `[today, today + lookahead_months]`,
/// soonest first.
pub fn cliff_lookahead(snapshot: &DebtSnapshot, today: NaiveDate, lookahead_months: u32) -> Vec<CliffWarning> {
    let horizon = add_months(today, lookahead_months);

    let mut warnings: Vec<CliffWarning> = snapshot
        .cards
        .iter()
        .flat_map(|card| card.buckets.iter().map(move |b| (card, b)))
        .filter_map(|(card, b)| {
            let end = b.promo.end_date?;
            if end < today || end > horizon {
                return None;
            }
            let promo_apr = normalize_apr(b.promo.apr.unwrap_or(Decimal::ZERO));
            let standard_apr = normalize_apr(card.standard_apr.unwrap_or(Decimal::ZERO));
            Some(CliffWarning {
                card_id:        card.id.clone(),
                card_name:      card.name.clone(),
                bucket_id:      b.id.clone(),
                bucket_name:    b.name.clone(),
                promo_end_date: end,
                balance:        round_money(b.balance),
                promo_apr,
                standard_apr,
                monthly_interest_increase: round_money(b.balance * monthly_rate(standard_apr - promo_apr)),
            })
        })
        .collect();

    warnings.sort_by_key(|w| w.promo_end_date);
    warnings
}
