//! Credit-card debt payoff forecasting.
//!
//! A [`snapshot::DebtSnapshot`] of cards and their balance buckets goes
//! into the [`engine::ForecastEngine`], which steps month by month and
//! returns a [`ledger::ForecastOutcome`]. The [`service`] layer loads the
//! snapshot from the [`store`] and writes the outcome back.

pub mod bucket;
pub mod card;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod money;
pub mod reports;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod strategy;
pub mod types;
