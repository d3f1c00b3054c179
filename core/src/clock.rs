//! Forecast clock: owns the month cursor for one run.

use crate::types::Month;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthClock {
    pub start:   Month,
    pub horizon: u32,
    /// Months already simulated.
    pub elapsed: u32,
}

impl MonthClock {
    pub fn new(start: Month, horizon: u32) -> Self {
        Self {
            start: first_of_month(start),
            horizon,
            elapsed: 0,
        }
    }

    /// The month the next tick will simulate.
    pub fn current(&self) -> Month {
        add_months(self.start, self.elapsed)
    }

    /// The month before `current()`. Used for promo-cliff crossings.
    pub fn previous(&self) -> Month {
        self.current()
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn exhausted(&self) -> bool {
        self.elapsed >= self.horizon
    }

    /// Advance one month. Returns the month just completed.
    pub fn advance(&mut self) -> Month {
        let done = self.current();
        self.elapsed += 1;
        done
    }
}

pub fn first_of_month(date: NaiveDate) -> Month {
    date.with_day(1).unwrap_or(date)
}

pub fn add_months(month: Month, n: u32) -> Month {
    month.checked_add_months(Months::new(n)).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn start_is_snapped_to_first_of_month() {
        let clock = MonthClock::new(ymd(2026, 3, 17), 12);
        assert_eq!(clock.current(), ymd(2026, 3, 1));
    }

    #[test]
    fn advance_walks_across_year_end() {
        let mut clock = MonthClock::new(ymd(2026, 11, 1), 3);
        assert_eq!(clock.advance(), ymd(2026, 11, 1));
        assert_eq!(clock.advance(), ymd(2026, 12, 1));
        assert_eq!(clock.current(), ymd(2027, 1, 1));
        assert_eq!(clock.previous(), ymd(2026, 12, 1));
        assert!(!clock.exhausted());
        clock.advance();
        assert!(clock.exhausted());
    }
}
