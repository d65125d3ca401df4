//! In-memory per-symbol mirror used by the hot path (C4's payload type).
//! `TickerStateCache` is the exclusive owner/mutator; everyone else holds
//! read-only clones.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerState {
    pub symbol: String,
    pub name: String,
    pub current_price: Decimal,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub previous_close: Decimal,
    pub cumulative_volume: i64,
    /// Percentage change vs previous close, e.g. -5.2 for -5.2%.
    pub change_rate: f64,
    /// ema[span] -> value.
    pub ema: HashMap<u32, f64>,
    pub rsi: f64,
    pub bollinger: Option<Bollinger>,
    pub dcf_value: Option<f64>,
    pub target_buy_price: Option<Decimal>,
    pub target_sell_price: Option<Decimal>,
    pub is_ready: bool,
    pub updated_at: DateTime<Utc>,
}

impl TickerState {
    pub fn new(symbol: String, name: String) -> Self {
        Self {
            symbol,
            name,
            current_price: Decimal::ZERO,
            open_price: Decimal::ZERO,
            high_price: Decimal::ZERO,
            low_price: Decimal::ZERO,
            previous_close: Decimal::ZERO,
            cumulative_volume: 0,
            change_rate: 0.0,
            ema: HashMap::new(),
            rsi: 0.0,
            bollinger: None,
            dcf_value: None,
            target_buy_price: None,
            target_sell_price: None,
            is_ready: false,
            updated_at: Utc::now(),
        }
    }

    /// `is_ready` <=> `current_price>0 ∧ rsi>0 ∧ (ema200∨ema120∨ema60)>0`.
    pub fn recompute_is_ready(&mut self) {
        let has_long_ema = self
            .ema
            .get(&200)
            .or_else(|| self.ema.get(&120))
            .or_else(|| self.ema.get(&60))
            .is_some_and(|v| *v > 0.0);
        self.is_ready = self.current_price > Decimal::ZERO && self.rsi > 0.0 && has_long_ema;
    }

    /// Apply a live tick: price/open/high/low/change/volume updated
    /// atomically, then a fast incremental EMA reprice (no recomputation
    /// of older data): `ema_new = price*alpha + ema_prev*(1-alpha)`.
    pub fn apply_tick(&mut self, tick: &RealtimeTick) {
        self.current_price = tick.price;
        if tick.open > Decimal::ZERO {
            self.open_price = tick.open;
        }
        if tick.high > Decimal::ZERO {
            self.high_price = self.high_price.max(tick.high);
        }
        if tick.low > Decimal::ZERO {
            self.low_price = if self.low_price.is_zero() {
                tick.low
            } else {
                self.low_price.min(tick.low)
            };
        }
        self.cumulative_volume = tick.cumulative_volume;

        if self.previous_close > Decimal::ZERO {
            let change = (tick.price - self.previous_close) / self.previous_close * Decimal::ONE_HUNDRED;
            self.change_rate = change.to_f64().unwrap_or(tick.change_rate);
        } else {
            self.change_rate = tick.change_rate;
        }

        let price_f = tick.price.to_f64().unwrap_or(0.0);
        if price_f > 0.0 {
            for (&span, ema_val) in self.ema.iter_mut() {
                let alpha = 2.0 / (span as f64 + 1.0);
                *ema_val = price_f * alpha + *ema_val * (1.0 - alpha);
            }
        }

        self.updated_at = Utc::now();
        self.recompute_is_ready();
    }
}

/// Normalized realtime tick forwarded by the market-data feed (C5) to the
/// ticker-state cache (C4), after frame parsing.
#[derive(Debug, Clone)]
pub struct RealtimeTick {
    pub symbol: String,
    pub price: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub change_rate: f64,
    pub cumulative_volume: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ready_state() -> TickerState {
        let mut s = TickerState::new("AAPL".into(), "Apple".into());
        s.current_price = dec!(100);
        s.rsi = 50.0;
        s.ema.insert(200, 95.0);
        s.recompute_is_ready();
        s
    }

    #[test]
    fn is_ready_requires_price_rsi_and_long_ema() {
        let mut s = TickerState::new("X".into(), "X".into());
        s.recompute_is_ready();
        assert!(!s.is_ready);

        let s = ready_state();
        assert!(s.is_ready);
    }

    #[test]
    fn apply_tick_reprices_ema_incrementally_not_from_scratch() {
        let mut s = ready_state();
        let before = s.ema[&200];
        s.apply_tick(&RealtimeTick {
            symbol: "AAPL".into(),
            price: dec!(110),
            open: dec!(100),
            high: dec!(111),
            low: dec!(99),
            change_rate: 10.0,
            cumulative_volume: 1000,
        });
        let alpha = 2.0 / 201.0;
        let expected = 110.0 * alpha + before * (1.0 - alpha);
        assert!((s.ema[&200] - expected).abs() < 1e-9);
    }
}
