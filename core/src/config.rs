//! Forecast requests and runner configuration.

use crate::{
    clock::first_of_month,
    error::{PayoffError, PayoffResult},
    strategy::Strategy,
    types::Month,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HORIZON_MONTHS: u32 = 60;
pub const MAX_HORIZON_MONTHS: u32 = 360;
pub const RECALCULATE_HORIZON_MONTHS: u32 = 12;
pub const DEFAULT_LOOKAHEAD_MONTHS: u32 = 3;

/// Household cash flow, echoed onto every monthly summary row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CashFlow {
    #[serde(default)]
    pub account_balance:   Decimal,
    #[serde(default)]
    pub recurring_bills:   Decimal,
    #[serde(default)]
    pub budgeted_spending: Decimal,
}

/// Parameters of one forecast run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastRequest {
    pub start_month:    Month,
    #[serde(default = "default_horizon")]
    pub months:         u32,
    /// `None` pays contractual minimums only.
    #[serde(default)]
    pub monthly_budget: Option<Decimal>,
    #[serde(default)]
    pub strategy:       Strategy,
    #[serde(default)]
    pub cash_flow:      Option<CashFlow>,
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_MONTHS
}

impl ForecastRequest {
    pub fn new(start_month: NaiveDate, strategy: Strategy) -> Self {
        Self {
            start_month: first_of_month(start_month),
            months: DEFAULT_HORIZON_MONTHS,
            monthly_budget: None,
            strategy,
            cash_flow: None,
        }
    }

    pub fn with_months(mut self, months: u32) -> Self {
        self.months = months;
        self
    }

    pub fn with_budget(mut self, budget: impl Into<Option<Decimal>>) -> Self {
        self.monthly_budget = budget.into();
        self
    }

    pub fn with_cash_flow(mut self, cash_flow: CashFlow) -> Self {
        self.cash_flow = Some(cash_flow);
        self
    }

    /// Reject malformed requests before the engine sees them.
    /// Returns the request with its start snapped to the first of the month.
    pub fn validated(mut self) -> PayoffResult<Self> {
        if !(1..=MAX_HORIZON_MONTHS).contains(&self.months) {
            return Err(PayoffError::invalid(
                "months",
                format!("must be between 1 and {MAX_HORIZON_MONTHS}, got {}", self.months),
            ));
        }
        if let Some(budget) = self.monthly_budget {
            if budget < Decimal::ZERO {
                return Err(PayoffError::invalid("monthly_budget", "must not be negative"));
            }
            if budget.normalize().scale() > 2 {
                return Err(PayoffError::invalid("monthly_budget", "at most 2 decimal places"));
            }
        }
        self.start_month = first_of_month(self.start_month);
        Ok(self)
    }
}

/// Repayment settings saved for a month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtConfig {
    pub id:                     String,
    pub month:                  Month,
    pub monthly_payment_budget: Option<Decimal>,
    pub strategy:               Strategy,
    pub auto_calculate:         bool,
    pub notes:                  Option<String>,
}

impl DebtConfig {
    pub fn new(month: NaiveDate, monthly_payment_budget: Option<Decimal>, strategy: Strategy) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            month: first_of_month(month),
            monthly_payment_budget,
            strategy,
            auto_calculate: true,
            notes: None,
        }
    }

    /// A forecast request for this month's settings.
    pub fn request(&self, months: u32) -> ForecastRequest {
        ForecastRequest::new(self.month, self.strategy)
            .with_months(months)
            .with_budget(self.monthly_payment_budget)
    }
}

/// Settings for the headless runner, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub db_path:             String,
    pub default_months:      u32,
    pub default_strategy:    Strategy,
    pub recalculate_months:  u32,
    pub lookahead_months:    u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            db_path:            "payoff.db".into(),
            default_months:     DEFAULT_HORIZON_MONTHS,
            default_strategy:   Strategy::Avalanche,
            recalculate_months: RECALCULATE_HORIZON_MONTHS,
            lookahead_months:   DEFAULT_LOOKAHEAD_MONTHS,
        }
    }
}

impl RunnerConfig {
    /// Load from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RunnerConfig = serde_json::from_str(&content)?;
        if !(1..=MAX_HORIZON_MONTHS).contains(&config.default_months) {
            anyhow::bail!("default_months out of range in {path}: {}", config.default_months);
        }
        Ok(config)
    }

    /// In-memory database and short horizons, for tests.
    pub fn default_test() -> Self {
        Self {
            db_path: ":memory:".into(),
            default_months: 24,
            ..Self::default()
        }
    }
}
