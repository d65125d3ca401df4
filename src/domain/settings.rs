//! Runtime-tunable knobs (C11). Stored as typed key/value rows so an
//! operator can adjust thresholds without a redeploy; `Settings` is the
//! strongly-typed view the strategy engine actually reads, built from the
//! raw rows with hard-coded defaults for anything unset.

use crate::domain::market::Market;
use serde::{Deserialize, Serialize};

/// One raw row as persisted by the settings repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_by: String,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>, updated_by: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            updated_by: updated_by.into(),
        }
    }
}

/// Strongly-typed settings snapshot consumed by the scoring/gating/sizing
/// stages of the strategy engine (C8).
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Score at/below which a ready, unheld ticker becomes a buy candidate.
    pub buy_threshold_max: i32,
    /// Score at/above which a held ticker becomes a sell candidate.
    pub sell_threshold_min: i32,
    /// Target cash ratio held in each market under a neutral regime.
    pub target_cash_ratio_neutral: f64,
    /// Target cash ratio held under a bull regime (lower, more invested).
    pub target_cash_ratio_bull: f64,
    /// Target cash ratio held under a bear regime (higher, more defensive).
    pub target_cash_ratio_bear: f64,
    pub sector_deviation_cap_pct: f64,
    pub sell_cooldown_days: i64,
    pub add_buy_cooldown_days: i64,
    pub max_buy_tranches: u32,
    pub max_sell_splits: u32,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub average_down_drawdown_pct: f64,
    /// Fraction of a market's total portfolio value committed to a single
    /// buy tranche's target investment, before the split-count division.
    pub per_trade_ratio: f64,
    /// Number of equal slices a buy's target investment (or a sell's held
    /// quantity) is divided into.
    pub split_count: u32,
    /// Score at/above which the tiny-account guard rounds a would-be
    /// zero-share buy up to one share.
    pub aggressive_buy_threshold: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            buy_threshold_max: 30,
            sell_threshold_min: 70,
            target_cash_ratio_neutral: 0.20,
            target_cash_ratio_bull: 0.10,
            target_cash_ratio_bear: 0.35,
            sector_deviation_cap_pct: 10.0,
            sell_cooldown_days: 1,
            add_buy_cooldown_days: 1,
            max_buy_tranches: 5,
            max_sell_splits: 3,
            take_profit_pct: 15.0,
            stop_loss_pct: -8.0,
            average_down_drawdown_pct: -5.0,
            per_trade_ratio: 0.05,
            split_count: 3,
            aggressive_buy_threshold: 75,
        }
    }
}

impl Settings {
    pub fn target_cash_ratio(&self, regime: crate::domain::market_regime::Regime) -> f64 {
        use crate::domain::market_regime::Regime;
        match regime {
            Regime::Bull => self.target_cash_ratio_bull,
            Regime::Neutral => self.target_cash_ratio_neutral,
            Regime::Bear => self.target_cash_ratio_bear,
        }
    }

    /// Build from raw rows, falling back to defaults for anything unset or
    /// unparseable. Unknown keys (e.g. a stale key from a prior version)
    /// are ignored rather than rejected.
    pub fn from_rows(rows: &[Setting]) -> Self {
        let mut s = Settings::default();
        for row in rows {
            let parsed = row.value.parse::<f64>();
            match (row.key.as_str(), parsed) {
                ("buy_threshold_max", Ok(v)) => s.buy_threshold_max = v as i32,
                ("sell_threshold_min", Ok(v)) => s.sell_threshold_min = v as i32,
                ("target_cash_ratio_neutral", Ok(v)) => s.target_cash_ratio_neutral = v,
                ("target_cash_ratio_bull", Ok(v)) => s.target_cash_ratio_bull = v,
                ("target_cash_ratio_bear", Ok(v)) => s.target_cash_ratio_bear = v,
                ("sector_deviation_cap_pct", Ok(v)) => s.sector_deviation_cap_pct = v,
                ("sell_cooldown_days", Ok(v)) => s.sell_cooldown_days = v as i64,
                ("add_buy_cooldown_days", Ok(v)) => s.add_buy_cooldown_days = v as i64,
                ("max_buy_tranches", Ok(v)) => s.max_buy_tranches = v as u32,
                ("max_sell_splits", Ok(v)) => s.max_sell_splits = v as u32,
                ("take_profit_pct", Ok(v)) => s.take_profit_pct = v,
                ("stop_loss_pct", Ok(v)) => s.stop_loss_pct = v,
                ("average_down_drawdown_pct", Ok(v)) => s.average_down_drawdown_pct = v,
                ("per_trade_ratio", Ok(v)) => s.per_trade_ratio = v,
                ("split_count", Ok(v)) => s.split_count = v as u32,
                ("aggressive_buy_threshold", Ok(v)) => s.aggressive_buy_threshold = v as i32,
                _ => {}
            }
        }
        s
    }
}

/// Settings that vary only by market (currently unused by defaults but
/// kept distinct so per-market overrides don't require a schema change).
#[derive(Debug, Clone, Copy)]
pub struct MarketSettings {
    pub market: Market,
    pub settings: Settings,
}
