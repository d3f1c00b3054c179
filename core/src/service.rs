//! Forecast service: snapshot in, outcome out, result set replaced.
//!
//! The service is the only place where the store and the engine meet.
//! A run is computed entirely in memory before anything is written, so a
//! persistence failure leaves the previously stored forecast untouched.

use crate::{
    clock::first_of_month,
    config::ForecastRequest,
    engine::ForecastEngine,
    error::PayoffResult,
    ledger::ForecastOutcome,
    reports::{cliff_lookahead, strategy_order, CliffWarning, StrategyReport},
    store::{DebtStore, StoredForecastRow, StoredPayoff},
    strategy::Strategy,
    types::Month,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recalculation together with what the store now holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recalculation {
    pub outcome:         ForecastOutcome,
    pub stored_rows:     Vec<StoredForecastRow>,
    pub payoff_schedule: Vec<StoredPayoff>,
}

pub struct ForecastService<'a> {
    store: &'a DebtStore,
}

impl<'a> ForecastService<'a> {
    pub fn new(store: &'a DebtStore) -> Self {
        Self { store }
    }

    /// Validate, run against the live snapshot, and replace stored results.
    pub fn calculate(&self, request: ForecastRequest) -> PayoffResult<ForecastOutcome> {
        let request = request.validated()?;
        let snapshot = self.store.load_snapshot()?;
        log::debug!(
            "calculating {} months from {} for {} cards ({})",
            request.months,
            request.start_month,
            snapshot.cards.len(),
            request.strategy
        );

        let outcome = ForecastEngine::new(request).run(&snapshot);
        self.store.replace_forecast(&outcome)?;
        Ok(outcome)
    }

    /// Re-run from the month containing `today` and read the stored result back.
    pub fn recalculate(
        &self,
        strategy: Strategy,
        monthly_budget: Option<Decimal>,
        months: u32,
        today: NaiveDate,
    ) -> PayoffResult<Recalculation> {
        let request = ForecastRequest::new(first_of_month(today), strategy)
            .with_months(months)
            .with_budget(monthly_budget);
        let outcome = self.calculate(request)?;
        Ok(Recalculation {
            outcome,
            stored_rows: self.store.forecast_rows(None)?,
            payoff_schedule: self.store.payoff_schedule()?,
        })
    }

    pub fn strategy(&self, today: NaiveDate) -> PayoffResult<StrategyReport> {
        let snapshot = self.store.load_snapshot()?;
        Ok(strategy_order(&snapshot, today))
    }

    pub fn cliffs(&self, today: NaiveDate, lookahead_months: u32) -> PayoffResult<Vec<CliffWarning>> {
        let snapshot = self.store.load_snapshot()?;
        Ok(cliff_lookahead(&snapshot, today, lookahead_months))
    }

    pub fn forecasts(&self, month: Option<Month>) -> PayoffResult<Vec<StoredForecastRow>> {
        self.store.forecast_rows(month.map(first_of_month))
    }

    pub fn payoff(&self) -> PayoffResult<Vec<StoredPayoff>> {
        self.store.payoff_schedule()
    }

    pub fn clear(&self) -> PayoffResult<()> {
        self.store.clear_forecast()?;
        log::info!("cleared stored forecast");
        Ok(())
    }
}
