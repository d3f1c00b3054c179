//! Shared primitive types used across the tracker.

use chrono::NaiveDate;

/// A stable, unique identifier for a card or bucket (UUID v4 text).
pub type EntityId = String;

/// A calendar month, always held as the first day of that month.
pub type Month = NaiveDate;

/// Stable ordinal of a bucket inside one forecast run.
pub type Position = u32;
