use super::{decimal_text, get_decimal, get_opt_decimal, opt_decimal_text, parse_text, DebtStore};
use crate::{
    bucket::{BucketSnapshot, PromoTerms},
    card::{CardSnapshot, MinimumTerms},
    error::{PayoffError, PayoffResult},
    money::check_non_negative,
    snapshot::DebtSnapshot,
};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::HashMap;

impl DebtStore {
    // ── Cards ─────────────────────────────────────────────────────

    /// Insert a card together with all of its buckets.
    pub fn insert_card(&self, card: &CardSnapshot) -> PayoffResult<()> {
        card.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO credit_cards (
                id, name, standard_apr, min_percentage, min_floor,
                credit_limit, statement_day, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                card.id,
                card.name,
                opt_decimal_text(card.standard_apr),
                opt_decimal_text(card.minimum.percentage),
                opt_decimal_text(card.minimum.floor),
                opt_decimal_text(card.credit_limit),
                card.statement_day,
                Utc::now(),
            ],
        )?;
        for bucket in &card.buckets {
            insert_bucket_row(&tx, bucket)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Add a bucket to an existing card.
    pub fn insert_bucket(&self, bucket: &BucketSnapshot) -> PayoffResult<()> {
        bucket.validate()?;
        if !self.card_exists(&bucket.card_id)? {
            return Err(PayoffError::CardNotFound { card_id: bucket.card_id.clone() });
        }
        insert_bucket_row(&self.conn, bucket)
    }

    pub fn card_exists(&self, card_id: &str) -> PayoffResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM credit_cards WHERE id = ?1", params![card_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn card_count(&self) -> PayoffResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM credit_cards", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn update_bucket_balance(&self, bucket_id: &str, balance: Decimal) -> PayoffResult<bool> {
        check_non_negative("current_balance", balance)?;
        let changed = self.conn.execute(
            "UPDATE card_buckets SET current_balance = ?1 WHERE id = ?2",
            params![decimal_text(balance), bucket_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a card. Its buckets and stored results go with it.
    pub fn delete_card(&self, card_id: &str) -> PayoffResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM credit_cards WHERE id = ?1", params![card_id])?;
        Ok(changed > 0)
    }

    pub fn delete_bucket(&self, bucket_id: &str) -> PayoffResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM card_buckets WHERE id = ?1", params![bucket_id])?;
        Ok(changed > 0)
    }

    // ── Snapshot ──────────────────────────────────────────────────

    /// Load every card and bucket in insertion order.
    pub fn load_snapshot(&self) -> PayoffResult<DebtSnapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT id, card_id, bucket_name, bucket_type, current_balance, promo_apr, promo_end_date
             FROM card_buckets ORDER BY rowid ASC",
        )?;
        let buckets = stmt
            .query_map([], |row| {
                Ok(BucketSnapshot {
                    id:      row.get(0)?,
                    card_id: row.get(1)?,
                    name:    row.get(2)?,
                    kind:    parse_text(row, 3)?,
                    balance: get_decimal(row, 4)?,
                    promo:   PromoTerms {
                        apr:      get_opt_decimal(row, 5)?,
                        end_date: row.get::<_, Option<NaiveDate>>(6)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_card: HashMap<String, Vec<BucketSnapshot>> = HashMap::new();
        for bucket in buckets {
            by_card.entry(bucket.card_id.clone()).or_default().push(bucket);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, name, standard_apr, min_percentage, min_floor, credit_limit, statement_day
             FROM credit_cards ORDER BY rowid ASC",
        )?;
        let cards = stmt
            .query_map([], |row| {
                Ok(CardSnapshot {
                    id:            row.get(0)?,
                    name:          row.get(1)?,
                    standard_apr:  get_opt_decimal(row, 2)?,
                    minimum:       MinimumTerms {
                        percentage: get_opt_decimal(row, 3)?,
                        floor:      get_opt_decimal(row, 4)?,
                    },
                    credit_limit:  get_opt_decimal(row, 5)?,
                    statement_day: row.get(6)?,
                    buckets:       Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|mut card| {
                card.buckets = by_card.remove(&card.id).unwrap_or_default();
                card
            })
            .collect();

        Ok(DebtSnapshot::new(cards))
    }
}

fn insert_bucket_row(conn: &rusqlite::Connection, bucket: &BucketSnapshot) -> PayoffResult<()> {
    conn.execute(
        "INSERT INTO card_buckets (
            id, card_id, bucket_name, bucket_type, current_balance, promo_apr, promo_end_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            bucket.id,
            bucket.card_id,
            bucket.name,
            bucket.kind.as_str(),
            decimal_text(bucket.balance),
            opt_decimal_text(bucket.promo.apr),
            bucket.promo.end_date,
        ],
    )?;
    Ok(())
}
