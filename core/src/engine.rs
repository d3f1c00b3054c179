//! The forecast engine: month-by-month debt payoff simulation.
//!
//! PHASE ORDER (fixed, documented, never reordered):
//!   1. Interest accrual        (per bucket, cliff detection)
//!   2. Minimum sizing          (per card, scaled down if budget is short)
//!   3. Minimum allocation      (within a card, highest APR bucket first)
//!   4. Extra allocation        (across all cards, by strategy score)
//!   5. Settlement              (payoff detection, row emission)
//!
//! RULES:
//!   - A run owns its SimState. The input snapshot is only read.
//!   - Amounts carry full precision; rounding happens at emission.
//!   - A paid-off card is frozen for the rest of the run.

use crate::{
    bucket::{effective_apr, PromoTerms},
    card::MinimumTerms,
    clock::MonthClock,
    config::ForecastRequest,
    ledger::{
        CardMonthRow, CashFlowColumns, CliffEvent, ForecastOutcome, ForecastRow, ForecastSummary,
        MonthSummaryRow, PayoffEntry,
    },
    money::{is_paid_off, monthly_rate, normalize_apr, round_money, PAID_OFF_THRESHOLD},
    snapshot::DebtSnapshot,
    strategy::Strategy,
    types::{EntityId, Month, Position},
};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct BucketState {
    pub id:            EntityId,
    pub name:          String,
    /// Index of the owning card in `SimState::cards`.
    pub card:          usize,
    pub promo:         PromoTerms,
    pub balance:       Decimal,
    /// APR resolved in phase 1 of the current month.
    pub effective_apr: Decimal,
    pub position:      Position,
}

#[derive(Debug, Clone)]
pub struct CardState {
    pub id:             EntityId,
    pub name:           String,
    pub standard_apr:   Option<Decimal>,
    pub minimum:        MinimumTerms,
    /// Indices into `SimState::buckets`, in declaration order.
    pub buckets:        Vec<usize>,
    pub balance:        Decimal,
    pub paid_off:       bool,
    pub paid_off_month: Option<Month>,
    pub interest_paid:  Decimal,
    month:              CardMonth,
}

/// Per-month scratch totals for one card. Reset at settlement.
#[derive(Debug, Clone, Default)]
struct CardMonth {
    beginning:  Decimal,
    interest:   Decimal,
    minimum:    Decimal,
    min_paid:   Decimal,
    extra_paid: Decimal,
}

/// Totals for one simulated month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthTotals {
    pub beginning: Decimal,
    pub interest:  Decimal,
    pub minimum:   Decimal,
    pub extra:     Decimal,
    pub ending:    Decimal,
}

/// Mutable state of one forecast run: an arena of cards and buckets.
#[derive(Debug, Clone)]
pub struct SimState {
    pub clock:   MonthClock,
    pub cards:   Vec<CardState>,
    pub buckets: Vec<BucketState>,
}

impl SimState {
    /// Build fresh state from a snapshot. Cards without buckets are skipped;
    /// bucket positions are assigned in load order across all cards.
    pub fn from_snapshot(snapshot: &DebtSnapshot, clock: MonthClock) -> Self {
        let mut cards = Vec::new();
        let mut buckets = Vec::new();

        for card in snapshot.simulated_cards() {
            let card_ix = cards.len();
            let mut owned = Vec::with_capacity(card.buckets.len());
            for b in &card.buckets {
                owned.push(buckets.len());
                buckets.push(BucketState {
                    id:            b.id.clone(),
                    name:          b.name.clone(),
                    card:          card_ix,
                    promo:         b.promo.clone(),
                    balance:       b.balance,
                    effective_apr: Decimal::ZERO,
                    position:      buckets.len() as Position,
                });
            }
            let balance: Decimal = card.buckets.iter().map(|b| b.balance.max(Decimal::ZERO)).sum();
            cards.push(CardState {
                id:             card.id.clone(),
                name:           card.name.clone(),
                standard_apr:   card.standard_apr,
                minimum:        card.minimum,
                buckets:        owned,
                balance,
                paid_off:       balance <= Decimal::ZERO,
                paid_off_month: None,
                interest_paid:  Decimal::ZERO,
                month:          CardMonth::default(),
            });
        }

        Self { clock, cards, buckets }
    }

    pub fn total_debt(&self) -> Decimal {
        self.cards.iter().map(|c| c.balance.max(Decimal::ZERO)).sum()
    }

    pub fn total_interest(&self) -> Decimal {
        self.cards.iter().map(|c| c.interest_paid).sum()
    }

    fn active_cards(&self) -> impl Iterator<Item = usize> + '_ {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.paid_off)
            .map(|(i, _)| i)
    }

    fn card_bucket_total(&self, card: usize) -> Decimal {
        self.cards[card]
            .buckets
            .iter()
            .map(|&b| self.buckets[b].balance.max(Decimal::ZERO))
            .sum()
    }

    // ── Phase 1 ────────────────────────────────────────────────

    /// Accrue one month of interest on every positive bucket of every
    /// active card. Cliffs are reported with the post-interest balance.
    pub fn accrue_interest(&mut self, month: Month, previous: Month) -> (MonthTotals, Vec<CliffEvent>) {
        let mut totals = MonthTotals::default();
        let mut cliffs = Vec::new();

        for card_ix in self.active_cards().collect::<Vec<_>>() {
            let card = &mut self.cards[card_ix];
            card.month.beginning = card.balance;
            totals.beginning += card.balance;

            let mut card_interest = Decimal::ZERO;
            for &b in &card.buckets {
                let bucket = &mut self.buckets[b];
                if bucket.balance <= Decimal::ZERO {
                    bucket.effective_apr = Decimal::ZERO;
                    continue;
                }
                let apr = effective_apr(bucket.balance, &bucket.promo, card.standard_apr, month);
                bucket.effective_apr = apr;

                let interest = bucket.balance * monthly_rate(apr);
                bucket.balance += interest;
                card_interest += interest;

                if bucket.promo.crossed_between(previous, month) {
                    cliffs.push(CliffEvent {
                        month,
                        card_id:          card.id.clone(),
                        card_name:        card.name.clone(),
                        bucket_id:        bucket.id.clone(),
                        bucket_name:      bucket.name.clone(),
                        from_apr:         normalize_apr(bucket.promo.apr.unwrap_or(Decimal::ZERO)),
                        to_apr:           normalize_apr(card.standard_apr.unwrap_or(Decimal::ZERO)),
                        balance_at_cliff: round_money(bucket.balance),
                    });
                }
            }

            card.month.interest = card_interest;
            card.interest_paid += card_interest;
            totals.interest += card_interest;

            let balance = self.card_bucket_total(card_ix);
            self.cards[card_ix].balance = balance;
        }

        (totals, cliffs)
    }

    // ── Phase 2 ────────────────────────────────────────────────

    /// Size each active card's minimum and return the month's spend budget.
    ///
    /// Without a budget only minimums are paid. When the budget cannot
    /// cover all minimums, every minimum is scaled by the same factor.
    pub fn size_minimums(&mut self, monthly_budget: Option<Decimal>) -> Decimal {
        let mut total_required = Decimal::ZERO;
        for card_ix in self.active_cards().collect::<Vec<_>>() {
            let card = &mut self.cards[card_ix];
            card.month.minimum = card.minimum.minimum_for(card.balance);
            total_required += card.month.minimum;
        }

        let budget = monthly_budget.unwrap_or(total_required);
        if budget < total_required && total_required > Decimal::ZERO {
            let factor = budget / total_required;
            log::debug!("budget {budget} below minimums {total_required}, scaling by {factor}");
            for card_ix in self.active_cards().collect::<Vec<_>>() {
                self.cards[card_ix].month.minimum *= factor;
            }
        }
        budget
    }

    // ── Phase 3 ────────────────────────────────────────────────

    /// Pay each card's minimum into its buckets, highest APR first.
    /// Returns the minimums actually paid.
    pub fn allocate_minimums(&mut self) -> Decimal {
        let mut total_paid = Decimal::ZERO;

        for card_ix in self.active_cards().collect::<Vec<_>>() {
            let card_min = self.cards[card_ix].month.minimum.min(self.cards[card_ix].balance);

            let mut order: Vec<usize> = self.cards[card_ix]
                .buckets
                .iter()
                .copied()
                .filter(|&b| self.buckets[b].balance > Decimal::ZERO)
                .collect();
            order.sort_by(|&a, &b| self.buckets[b].effective_apr.cmp(&self.buckets[a].effective_apr));

            let mut remaining = card_min;
            for b in order {
                if remaining <= PAID_OFF_THRESHOLD {
                    break;
                }
                let bucket = &mut self.buckets[b];
                let payment = remaining.min(bucket.balance);
                bucket.balance -= payment;
                remaining -= payment;
            }

            let paid = card_min - remaining.max(Decimal::ZERO);
            let balance = self.card_bucket_total(card_ix);
            let card = &mut self.cards[card_ix];
            card.balance = balance;
            card.month.min_paid = paid;
            total_paid += paid;
        }

        total_paid
    }

    // ── Phase 4 ────────────────────────────────────────────────

    /// Sweep the extra pool across every remaining bucket in strategy
    /// order. Returns the amount actually paid.
    pub fn allocate_extra(&mut self, pool: Decimal, strategy: Strategy) -> Decimal {
        let mut scored: Vec<(Decimal, usize)> = Vec::new();
        for card_ix in self.active_cards() {
            for &b in &self.cards[card_ix].buckets {
                let bucket = &self.buckets[b];
                let remaining = bucket.balance.max(Decimal::ZERO);
                if let Some(score) = strategy.score(bucket.effective_apr, bucket.position, remaining) {
                    scored.push((score, b));
                }
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut remaining = pool;
        let mut paid = Decimal::ZERO;
        for (_, b) in scored {
            if remaining <= PAID_OFF_THRESHOLD {
                break;
            }
            let bucket = &mut self.buckets[b];
            let payment = remaining.min(bucket.balance);
            bucket.balance -= payment;
            self.cards[bucket.card].month.extra_paid += payment;
            remaining -= payment;
            paid += payment;
        }
        paid
    }

    // ── Phase 5 ────────────────────────────────────────────────

    /// Recompute card totals, mark payoffs and emit this month's card rows.
    pub fn settle(&mut self, month: Month, payoffs: &mut Vec<PayoffEntry>) -> (Decimal, Vec<CardMonthRow>) {
        let mut ending_total = Decimal::ZERO;
        let mut rows = Vec::new();

        for card_ix in self.active_cards().collect::<Vec<_>>() {
            let balance = self.card_bucket_total(card_ix);
            let paid_off = is_paid_off(balance);
            if paid_off {
                for &b in &self.cards[card_ix].buckets {
                    self.buckets[b].balance = Decimal::ZERO;
                }
            }

            let card = &mut self.cards[card_ix];
            card.balance = balance;
            if paid_off {
                card.paid_off = true;
                card.paid_off_month = Some(month);
                card.balance = Decimal::ZERO;
                log::debug!("{month}: card '{}' paid off", card.name);
                payoffs.push(PayoffEntry {
                    card_id:                card.id.clone(),
                    payoff_month:           month,
                    total_interest_on_card: round_money(card.interest_paid),
                });
            }
            ending_total += card.balance;

            let scratch = std::mem::take(&mut card.month);
            rows.push(CardMonthRow {
                month,
                card_id:           card.id.clone(),
                beginning_balance: round_money(scratch.beginning),
                interest:          round_money(scratch.interest),
                payment:           round_money(scratch.min_paid + scratch.extra_paid),
                ending_balance:    round_money(card.balance),
                payoff_date:       card.paid_off_month,
            });
        }

        (ending_total, rows)
    }

    /// Run all five phases for `month`.
    pub fn tick(
        &mut self,
        month: Month,
        previous: Month,
        strategy: Strategy,
        monthly_budget: Option<Decimal>,
        payoffs: &mut Vec<PayoffEntry>,
    ) -> TickResult {
        let (mut totals, cliffs) = self.accrue_interest(month, previous);
        let budget = self.size_minimums(monthly_budget);
        totals.minimum = self.allocate_minimums();
        let pool = (budget - totals.minimum).max(Decimal::ZERO);
        totals.extra = self.allocate_extra(pool, strategy);
        let (ending, card_rows) = self.settle(month, payoffs);
        totals.ending = ending;

        TickResult { totals, cliffs, card_rows }
    }
}

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickResult {
    pub totals:    MonthTotals,
    pub cliffs:    Vec<CliffEvent>,
    pub card_rows: Vec<CardMonthRow>,
}

/// Pure forecast runner. Holds only the request; every call to `run`
/// builds fresh state, so one engine may be reused freely.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    request: ForecastRequest,
}

impl ForecastEngine {
    pub fn new(request: ForecastRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &ForecastRequest {
        &self.request
    }

    pub fn run(&self, snapshot: &DebtSnapshot) -> ForecastOutcome {
        let req = &self.request;
        let mut state = SimState::from_snapshot(snapshot, MonthClock::new(req.start_month, req.months));
        let start = state.clock.current();

        if state.cards.iter().all(|c| c.paid_off) {
            log::info!("nothing to forecast: no outstanding card balances");
            return self.trivial_outcome(start);
        }

        let initial_debt = state.total_debt();
        let mut rows = Vec::new();
        let mut payoffs = Vec::new();
        let mut cliffs = Vec::new();
        let mut debt_free_date = None;

        while !state.clock.exhausted() {
            let month = state.clock.current();
            if is_paid_off(state.total_debt()) {
                debt_free_date = Some(month);
                break;
            }

            let previous = state.clock.previous();
            let tick = state.tick(month, previous, req.strategy, req.monthly_budget, &mut payoffs);
            log::debug!(
                "{month}: begin={} interest={} min={} extra={} end={}",
                tick.totals.beginning, tick.totals.interest, tick.totals.minimum,
                tick.totals.extra, tick.totals.ending,
            );

            rows.extend(tick.card_rows.into_iter().map(ForecastRow::Card));
            rows.push(ForecastRow::Summary(MonthSummaryRow {
                month,
                total_beginning_debt:   round_money(tick.totals.beginning),
                total_interest:         round_money(tick.totals.interest),
                total_minimum_payments: round_money(tick.totals.minimum),
                total_extra_payments:   round_money(tick.totals.extra),
                total_ending_debt:      round_money(tick.totals.ending),
                debt_free_date:         None,
                has_cliff:              !tick.cliffs.is_empty(),
                cliff_details:          tick.cliffs.clone(),
                cash_flow:              req.cash_flow.as_ref()
                    .map(|cf| CashFlowColumns::new(cf, req.monthly_budget)),
            }));
            cliffs.extend(tick.cliffs);

            state.clock.advance();
        }

        if let Some(date) = debt_free_date {
            if let Some(ForecastRow::Summary(last)) = rows
                .iter_mut()
                .rev()
                .find(|r| matches!(r, ForecastRow::Summary(_)))
            {
                last.debt_free_date = Some(date);
            }
        }

        let months_to_payoff = rows.iter().filter(|r| r.as_summary().is_some()).count() as u32;
        let total_interest = state.total_interest();
        log::info!(
            "forecast complete: strategy={} months={months_to_payoff} interest={} debt_free={:?}",
            req.strategy, round_money(total_interest), debt_free_date,
        );

        ForecastOutcome {
            forecast_rows: rows,
            payoff_schedule: payoffs,
            debt_free_date,
            cliffs,
            summary: ForecastSummary {
                total_debt:       round_money(initial_debt),
                total_interest:   round_money(total_interest),
                strategy:         req.strategy,
                months_to_payoff,
                monthly_budget:   req.monthly_budget,
            },
        }
    }

    fn trivial_outcome(&self, start: Month) -> ForecastOutcome {
        ForecastOutcome {
            forecast_rows:   Vec::new(),
            payoff_schedule: Vec::new(),
            debt_free_date:  Some(start),
            cliffs:          Vec::new(),
            summary: ForecastSummary {
                total_debt:       Decimal::ZERO,
                total_interest:   Decimal::ZERO,
                strategy:         self.request.strategy,
                months_to_payoff: 0,
                monthly_budget:   self.request.monthly_budget,
            },
        }
    }
}
