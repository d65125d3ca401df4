//! Macro regime snapshot (C6): bull when the S&P 500 closes above its
//! 200-day moving average, bear when below. Feeds the target-cash-ratio
//! gate and the composite score's regime delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Bull,
    Neutral,
    Bear,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Bull => "bull",
            Regime::Neutral => "neutral",
            Regime::Bear => "bear",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Regime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bull" => Ok(Regime::Bull),
            "neutral" => Ok(Regime::Neutral),
            "bear" => Ok(Regime::Bear),
            other => anyhow::bail!("invalid regime: {other}"),
        }
    }
}

impl Regime {
    /// S&P 500 close vs its 200-day MA. Neutral is not reachable by this
    /// rule alone (it requires an unavailable MA) but kept as a variant so
    /// callers don't have to special-case a missing snapshot as bull.
    pub fn classify(sp500_close: f64, sp500_ma200: f64) -> Regime {
        if sp500_close > sp500_ma200 {
            Regime::Bull
        } else {
            Regime::Bear
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketRegimeSnapshot {
    pub as_of: DateTime<Utc>,
    pub sp500_close: f64,
    pub sp500_ma200: f64,
    pub vix: Option<f64>,
    pub fear_greed_index: Option<f64>,
    pub regime: Regime,
}

impl MarketRegimeSnapshot {
    pub fn new(as_of: DateTime<Utc>, sp500_close: f64, sp500_ma200: f64, vix: Option<f64>, fear_greed_index: Option<f64>) -> Self {
        let regime = Regime::classify(sp500_close, sp500_ma200);
        Self {
            as_of,
            sp500_close,
            sp500_ma200,
            vix,
            fear_greed_index,
            regime,
        }
    }

    /// VIX-based fear regime: a VIX above 30 is treated as a fear spike
    /// regardless of the 200-day-MA regime classification.
    pub fn is_fear_spike(&self) -> bool {
        self.vix.is_some_and(|v| v > 30.0)
    }

    /// Complacent-market signal: low VIX (<15) combined with a bull regime.
    /// Used by the scoring engine's +15 "complacent market" branch.
    pub fn is_complacent(&self) -> bool {
        self.regime == Regime::Bull && self.vix.is_some_and(|v| v < 15.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_bull_above_ma_and_bear_below() {
        assert_eq!(Regime::classify(110.0, 100.0), Regime::Bull);
        assert_eq!(Regime::classify(90.0, 100.0), Regime::Bear);
    }

    #[test]
    fn fear_spike_requires_vix_above_30() {
        let snap = MarketRegimeSnapshot::new(Utc::now(), 100.0, 90.0, Some(31.0), None);
        assert!(snap.is_fear_spike());
        let snap = MarketRegimeSnapshot::new(Utc::now(), 100.0, 90.0, Some(20.0), None);
        assert!(!snap.is_fear_spike());
    }
}
