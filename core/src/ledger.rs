//! Forecast output: rows, payoff entries, cliff events and the summary.
//!
//! Everything here is emitted already rounded to cents.

use crate::{
    config::CashFlow,
    strategy::Strategy,
    types::{EntityId, Month},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One card's result for one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardMonthRow {
    pub month:             Month,
    pub card_id:           EntityId,
    pub beginning_balance: Decimal,
    pub interest:          Decimal,
    pub payment:           Decimal,
    pub ending_balance:    Decimal,
    pub payoff_date:       Option<Month>,
}

/// Cash-flow columns carried on summary rows when the caller supplied them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowColumns {
    pub account_balance:    Decimal,
    pub recurring_bills:    Decimal,
    pub budgeted_spending:  Decimal,
    pub available_for_debt: Decimal,
}

impl CashFlowColumns {
    pub fn new(cash_flow: &CashFlow, monthly_budget: Option<Decimal>) -> Self {
        use crate::money::round_money;
        Self {
            account_balance:    round_money(cash_flow.account_balance),
            recurring_bills:    round_money(cash_flow.recurring_bills),
            budgeted_spending:  round_money(cash_flow.budgeted_spending),
            available_for_debt: round_money(monthly_budget.unwrap_or(Decimal::ZERO)),
        }
    }
}

/// Totals across all cards for one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthSummaryRow {
    pub month:                  Month,
    pub total_beginning_debt:   Decimal,
    pub total_interest:         Decimal,
    pub total_minimum_payments: Decimal,
    pub total_extra_payments:   Decimal,
    pub total_ending_debt:      Decimal,
    pub debt_free_date:         Option<Month>,
    pub has_cliff:              bool,
    pub cliff_details:          Vec<CliffEvent>,
    pub cash_flow:              Option<CashFlowColumns>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastRow {
    Card(CardMonthRow),
    Summary(MonthSummaryRow),
}

impl ForecastRow {
    pub fn month(&self) -> Month {
        match self {
            Self::Card(r)    => r.month,
            Self::Summary(r) => r.month,
        }
    }

    pub fn card_id(&self) -> Option<&str> {
        match self {
            Self::Card(r)    => Some(&r.card_id),
            Self::Summary(_) => None,
        }
    }

    pub fn as_summary(&self) -> Option<&MonthSummaryRow> {
        match self {
            Self::Summary(r) => Some(r),
            Self::Card(_)    => None,
        }
    }

    pub fn as_card(&self) -> Option<&CardMonthRow> {
        match self {
            Self::Card(r)    => Some(r),
            Self::Summary(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayoffEntry {
    pub card_id:                EntityId,
    pub payoff_month:           Month,
    pub total_interest_on_card: Decimal,
}

/// A promo rate expiring inside a simulated run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliffEvent {
    pub month:            Month,
    pub card_id:          EntityId,
    pub card_name:        String,
    pub bucket_id:        EntityId,
    pub bucket_name:      String,
    pub from_apr:         Decimal,
    pub to_apr:           Decimal,
    pub balance_at_cliff: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastSummary {
    pub total_debt:       Decimal,
    pub total_interest:   Decimal,
    pub strategy:         Strategy,
    pub months_to_payoff: u32,
    pub monthly_budget:   Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastOutcome {
    pub forecast_rows:   Vec<ForecastRow>,
    pub payoff_schedule: Vec<PayoffEntry>,
    pub debt_free_date:  Option<Month>,
    pub cliffs:          Vec<CliffEvent>,
    pub summary:         ForecastSummary,
}

impl ForecastOutcome {
    pub fn summary_rows(&self) -> impl Iterator<Item = &MonthSummaryRow> {
        self.forecast_rows.iter().filter_map(ForecastRow::as_summary)
    }

    pub fn card_rows<'a>(&'a self, card_id: &'a str) -> impl Iterator<Item = &'a CardMonthRow> + 'a {
        self.forecast_rows
            .iter()
            .filter_map(ForecastRow::as_card)
            .filter(move |r| r.card_id == card_id)
    }
}
