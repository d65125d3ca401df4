//! Per-instrument, per-date fundamentals + indicator snapshot. Upserted by
//! (instrument, base_date). The warm-up DB fast path reads the latest row
//! per symbol; the daily sync job writes a new row once a day.

use crate::domain::ticker_state::TickerState;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSnapshot {
    pub symbol: String,
    pub base_date: NaiveDate,
    pub current_price: Decimal,
    pub market_cap: Decimal,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub roe: Option<f64>,
    pub eps: Option<f64>,
    pub bps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub week52_high: Decimal,
    pub week52_low: Decimal,
    pub volume: i64,
    pub amount: Decimal,
    pub rsi: f64,
    /// ema[span] -> value, spans {5,10,20,60,100,120,200}.
    pub ema: HashMap<u32, f64>,
    pub dcf_fair_value: Option<f64>,
}

impl FinancialSnapshot {
    /// Whether this snapshot, taken at `as_of`, is fresh enough for the
    /// warm-up DB fast path (within the last 24 hours).
    pub fn is_fresh(&self, as_of: chrono::DateTime<chrono::Utc>) -> bool {
        let age = as_of.date_naive() - self.base_date;
        age.num_hours() <= 24
    }

    /// Build the in-memory TickerState this snapshot would populate, with
    /// target buy/sell prices derived from EMA200 (falling back to the
    /// longest available EMA span per the indicator kernel's contract).
    pub fn to_ticker_state(&self, name: &str) -> TickerState {
        let mut state = TickerState::new(self.symbol.clone(), name.to_string());
        state.current_price = self.current_price;
        state.previous_close = self.current_price;
        state.cumulative_volume = self.volume;
        state.rsi = self.rsi;
        state.ema = self.ema.clone();
        state.dcf_value = self.dcf_fair_value;

        let anchor = self
            .ema
            .get(&200)
            .or_else(|| self.ema.get(&120))
            .or_else(|| self.ema.get(&60))
            .copied();
        if let Some(anchor) = anchor.and_then(Decimal::from_f64) {
            state.target_buy_price = Some(anchor * dec!(1.01));
            state.target_sell_price = Some(anchor * dec!(1.15));
        }
        state.recompute_is_ready();
        state
    }
}
