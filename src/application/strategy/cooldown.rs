//! Per-symbol cooldown tracking (C8, §8.4.2). Two independent cooldowns
//! apply: one after a sell (before the same symbol can be sold again) and
//! one after an averaging-down buy (before another add-on buy on the same
//! symbol). Both are day-granularity, keyed on the broker's local trading
//! calendar date rather than wall-clock duration, so a cooldown set late
//! in a session still clears at local midnight rather than 24 wall-clock
//! hours later.

use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_sell_date: HashMap<String, NaiveDate>,
    last_add_buy_date: HashMap<String, NaiveDate>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sell(&mut self, symbol: &str, date: NaiveDate) {
        self.last_sell_date.insert(symbol.to_string(), date);
    }

    pub fn record_add_buy(&mut self, symbol: &str, date: NaiveDate) {
        self.last_add_buy_date.insert(symbol.to_string(), date);
    }

    pub fn sell_is_on_cooldown(&self, symbol: &str, today: NaiveDate, cooldown_days: i64) -> bool {
        self.last_sell_date
            .get(symbol)
            .is_some_and(|last| (today - *last).num_days() < cooldown_days)
    }

    pub fn add_buy_is_on_cooldown(&self, symbol: &str, today: NaiveDate, cooldown_days: i64) -> bool {
        self.last_add_buy_date
            .get(symbol)
            .is_some_and(|last| (today - *last).num_days() < cooldown_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_clears_once_enough_days_elapse() {
        let mut tracker = CooldownTracker::new();
        let day0 = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        tracker.record_sell("AAPL", day0);

        assert!(tracker.sell_is_on_cooldown("AAPL", day0, 1));
        let day1 = day0 + chrono::Duration::days(1);
        assert!(!tracker.sell_is_on_cooldown("AAPL", day1, 1));
    }

    #[test]
    fn cooldowns_are_independent_per_symbol() {
        let mut tracker = CooldownTracker::new();
        let day0 = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        tracker.record_sell("AAPL", day0);
        assert!(!tracker.sell_is_on_cooldown("MSFT", day0, 1));
    }
}
