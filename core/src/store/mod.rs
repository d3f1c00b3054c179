//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine never sees a connection; it receives a snapshot and
//! returns an outcome that the store writes back.
//!
//! Decimals are stored as TEXT so balances and rates round-trip exactly.

use crate::error::{PayoffError, PayoffResult};
use rusqlite::{types::Type, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

mod cards;
mod debt_config;
mod forecast;

pub use forecast::{StoredForecastRow, StoredPayoff};

pub struct DebtStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

impl DebtStore {
    pub fn open(path: &str) -> PayoffResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("opened debt store at {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PayoffResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PayoffResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_cards.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_forecast.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_debt_config.sql"))?;
        Ok(())
    }
}

// ── Column helpers ─────────────────────────────────────────────

fn decimal_text(value: Decimal) -> String {
    value.to_string()
}

fn opt_decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(decimal_text)
}

fn parse_decimal(idx: usize, text: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    parse_decimal(idx, &text)
}

fn get_opt_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_decimal(idx, &t)).transpose()
}

/// Read a TEXT column through `FromStr`, e.g. a bucket type or strategy.
fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = PayoffError>,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e: PayoffError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a decimal supplied by a caller (runner flags, IPC payloads).
pub fn decimal_arg(value: &str) -> PayoffResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| PayoffError::InvalidDecimal {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bucket::BucketKind, strategy::Strategy};

    #[test]
    fn unreadable_enum_text_is_a_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        let bad = conn.query_row("SELECT 'weekly'", [], |row| parse_text::<Strategy>(row, 0));
        assert!(matches!(bad, Err(rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _))));

        let good = conn.query_row("SELECT 'transfer'", [], |row| parse_text::<BucketKind>(row, 0));
        assert_eq!(good.unwrap(), BucketKind::Transfer);
    }
}
