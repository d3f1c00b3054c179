use super::{get_opt_decimal, opt_decimal_text, parse_text, DebtStore};
use crate::{config::DebtConfig, error::PayoffResult, types::Month};
use rusqlite::{params, OptionalExtension, Row};

const COLUMNS: &str =
    "id, month, monthly_payment_budget, strategy, auto_calculate, notes";

impl DebtStore {
    // ── Debt configuration ────────────────────────────────────────

    pub fn insert_debt_config(&self, config: &DebtConfig) -> PayoffResult<()> {
        self.conn.execute(
            "INSERT INTO debt_config (id, month, monthly_payment_budget, strategy, auto_calculate, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                config.id,
                config.month,
                opt_decimal_text(config.monthly_payment_budget),
                config.strategy.as_str(),
                config.auto_calculate,
                config.notes,
            ],
        )?;
        Ok(())
    }

    pub fn update_debt_config(&self, config: &DebtConfig) -> PayoffResult<bool> {
        let changed = self.conn.execute(
            "UPDATE debt_config
             SET monthly_payment_budget = ?2, strategy = ?3, auto_calculate = ?4, notes = ?5
             WHERE id = ?1",
            params![
                config.id,
                opt_decimal_text(config.monthly_payment_budget),
                config.strategy.as_str(),
                config.auto_calculate,
                config.notes,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_debt_config(&self, id: &str) -> PayoffResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM debt_config WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Configurations, newest month first, optionally for one month.
    pub fn debt_configs(&self, month: Option<Month>) -> PayoffResult<Vec<DebtConfig>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM debt_config
             WHERE (?1 IS NULL OR month = ?1)
             ORDER BY month DESC, rowid DESC"
        ))?;
        let configs = stmt
            .query_map(params![month], read_config)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(configs)
    }

    /// The most recent configuration, if any.
    pub fn latest_debt_config(&self) -> PayoffResult<Option<DebtConfig>> {
        let config = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM debt_config ORDER BY month DESC, rowid DESC LIMIT 1"),
                [],
                read_config,
            )
            .optional()?;
        Ok(config)
    }
}

fn read_config(row: &Row<'_>) -> rusqlite::Result<DebtConfig> {
    Ok(DebtConfig {
        id:                     row.get(0)?,
        month:                  row.get(1)?,
        monthly_payment_budget: get_opt_decimal(row, 2)?,
        strategy:               parse_text(row, 3)?,
        auto_calculate:         row.get(4)?,
        notes:                  row.get(5)?,
    })
}
