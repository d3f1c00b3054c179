use super::{decimal_text, get_decimal, get_opt_decimal, opt_decimal_text, DebtStore};
use crate::{
    error::PayoffResult,
    ledger::{
        CardMonthRow, CashFlowColumns, CliffEvent, ForecastOutcome, ForecastRow, MonthSummaryRow,
        PayoffEntry,
    },
    types::{EntityId, Month},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A forecast row read back from the store, joined with its card's name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredForecastRow {
    pub id:            EntityId,
    pub card_name:     Option<String>,
    pub calculated_at: DateTime<Utc>,
    pub row:           ForecastRow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredPayoff {
    pub id:            EntityId,
    pub card_name:     String,
    pub calculated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub entry:         PayoffEntry,
}

const ROW_COLUMNS: &str = "
    f.id, f.month, f.card_id, c.name,
    f.card_beginning_balance, f.card_interest, f.card_payment_allocation,
    f.card_ending_balance, f.card_payoff_date,
    f.total_beginning_debt, f.total_interest, f.total_minimum_payments,
    f.total_extra_payments, f.total_ending_debt, f.debt_free_date,
    f.has_cliff, f.cliff_details,
    f.account_balance, f.recurring_bills, f.budgeted_spending, f.available_for_debt,
    f.calculated_at";

impl DebtStore {
    // ── Forecast results ──────────────────────────────────────────

    /// Replace every stored forecast row and payoff entry with `outcome`.
    ///
    /// Delete-then-insert inside one transaction: a failed write leaves
    /// the previous result set in place.
    pub fn replace_forecast(&self, outcome: &ForecastOutcome) -> PayoffResult<()> {
        let calculated_at = Utc::now();
        let tx = self.conn.unchecked_transaction()?;
        clear_results(&tx)?;

        for (seq, row) in outcome.forecast_rows.iter().enumerate() {
            insert_forecast_row(&tx, seq as i64, row, calculated_at)?;
        }
        for entry in &outcome.payoff_schedule {
            tx.execute(
                "INSERT INTO payoff_schedule (id, card_id, payoff_month, total_interest_on_card, calculated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    entry.card_id,
                    entry.payoff_month,
                    decimal_text(entry.total_interest_on_card),
                    calculated_at,
                ],
            )?;
        }
        tx.commit()?;

        log::info!(
            "stored {} forecast rows and {} payoff entries",
            outcome.forecast_rows.len(),
            outcome.payoff_schedule.len()
        );
        Ok(())
    }

    /// Delete all stored forecast rows and payoff entries.
    pub fn clear_forecast(&self) -> PayoffResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        clear_results(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Stored rows ordered by month, optionally for a single month.
    pub fn forecast_rows(&self, month: Option<Month>) -> PayoffResult<Vec<StoredForecastRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS}
             FROM forecast_results f
             LEFT JOIN credit_cards c ON c.id = f.card_id
             WHERE (?1 IS NULL OR f.month = ?1)
             ORDER BY f.month ASC, f.seq ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![month], read_forecast_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn forecast_row_count(&self) -> PayoffResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM forecast_results", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Stored payoff schedule ordered by payoff month.
    pub fn payoff_schedule(&self) -> PayoffResult<Vec<StoredPayoff>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.card_id, c.name, p.payoff_month, p.total_interest_on_card, p.calculated_at
             FROM payoff_schedule p
             JOIN credit_cards c ON c.id = p.card_id
             ORDER BY p.payoff_month ASC, p.rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredPayoff {
                    id:            row.get(0)?,
                    card_name:     row.get(2)?,
                    calculated_at: row.get(5)?,
                    entry: PayoffEntry {
                        card_id:                row.get(1)?,
                        payoff_month:           row.get(3)?,
                        total_interest_on_card: get_decimal(row, 4)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn clear_results(conn: &Connection) -> PayoffResult<()> {
    conn.execute("DELETE FROM forecast_results", [])?;
    conn.execute("DELETE FROM payoff_schedule", [])?;
    Ok(())
}

fn insert_forecast_row(
    conn: &Connection,
    seq: i64,
    row: &ForecastRow,
    calculated_at: DateTime<Utc>,
) -> PayoffResult<()> {
    let id = uuid::Uuid::new_v4().to_string();
    match row {
        ForecastRow::Card(r) => {
            conn.execute(
                "INSERT INTO forecast_results (
                    id, seq, month, card_id,
                    card_beginning_balance, card_interest, card_payment_allocation,
                    card_ending_balance, card_payoff_date, calculated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    seq,
                    r.month,
                    r.card_id,
                    decimal_text(r.beginning_balance),
                    decimal_text(r.interest),
                    decimal_text(r.payment),
                    decimal_text(r.ending_balance),
                    r.payoff_date,
                    calculated_at,
                ],
            )?;
        }
        ForecastRow::Summary(r) => {
            let cliff_details = if r.cliff_details.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&r.cliff_details)?)
            };
            let cf = r.cash_flow.as_ref();
            conn.execute(
                "INSERT INTO forecast_results (
                    id, seq, month, card_id,
                    total_beginning_debt, total_interest, total_minimum_payments,
                    total_extra_payments, total_ending_debt, debt_free_date,
                    has_cliff, cliff_details,
                    account_balance, recurring_bills, budgeted_spending, available_for_debt,
                    calculated_at
                ) VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    id,
                    seq,
                    r.month,
                    decimal_text(r.total_beginning_debt),
                    decimal_text(r.total_interest),
                    decimal_text(r.total_minimum_payments),
                    decimal_text(r.total_extra_payments),
                    decimal_text(r.total_ending_debt),
                    r.debt_free_date,
                    r.has_cliff,
                    cliff_details,
                    opt_decimal_text(cf.map(|c| c.account_balance)),
                    opt_decimal_text(cf.map(|c| c.recurring_bills)),
                    opt_decimal_text(cf.map(|c| c.budgeted_spending)),
                    opt_decimal_text(cf.map(|c| c.available_for_debt)),
                    calculated_at,
                ],
            )?;
        }
    }
    Ok(())
}

fn zero_if_null(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    Ok(get_opt_decimal(row, idx)?.unwrap_or(Decimal::ZERO))
}

fn read_forecast_row(row: &Row<'_>) -> rusqlite::Result<StoredForecastRow> {
    let month: Month = row.get(1)?;
    let card_id: Option<String> = row.get(2)?;

    let forecast = match card_id {
        Some(card_id) => ForecastRow::Card(CardMonthRow {
            month,
            card_id,
            beginning_balance: zero_if_null(row, 4)?,
            interest:          zero_if_null(row, 5)?,
            payment:           zero_if_null(row, 6)?,
            ending_balance:    zero_if_null(row, 7)?,
            payoff_date:       row.get(8)?,
        }),
        None => {
            let details: Option<String> = row.get(16)?;
            let cliff_details: Vec<CliffEvent> = match details {
                Some(json) => serde_json::from_str(&json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(16, Type::Text, Box::new(e))
                })?,
                None => Vec::new(),
            };
            let cash_flow = match get_opt_decimal(row, 20)? {
                Some(available_for_debt) => Some(CashFlowColumns {
                    account_balance:   zero_if_null(row, 17)?,
                    recurring_bills:   zero_if_null(row, 18)?,
                    budgeted_spending: zero_if_null(row, 19)?,
                    available_for_debt,
                }),
                None => None,
            };
            ForecastRow::Summary(MonthSummaryRow {
                month,
                total_beginning_debt:   zero_if_null(row, 9)?,
                total_interest:         zero_if_null(row, 10)?,
                total_minimum_payments: zero_if_null(row, 11)?,
                total_extra_payments:   zero_if_null(row, 12)?,
                total_ending_debt:      zero_if_null(row, 13)?,
                debt_free_date:         row.get(14)?,
                has_cliff:              row.get(15)?,
                cliff_details,
                cash_flow,
            })
        }
    };

    Ok(StoredForecastRow {
        id:            row.get(0)?,
        card_name:     row.get(3)?,
        calculated_at: row.get(21)?,
        row:           forecast,
    })
}
