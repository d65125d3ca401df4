//! Macro regime provider (C6): periodically refreshes the S&P 500 / VIX /
//! fear-greed snapshot used by the gating target-cash-ratio and the
//! scoring engine's regime delta. Fetched via the broker's overseas
//! index quote endpoint (reusing `BrokerClient::historical_bars` against
//! the index symbol) rather than a dedicated macro-data port, since the
//! broker already exposes index-level candles.

use crate::domain::market::Market;
use crate::domain::market_regime::MarketRegimeSnapshot;
use crate::domain::ports::BrokerClient;
use crate::domain::repositories::MarketRegimeRepository;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

const SP500_INDEX_SYMBOL: &str = "SPX";
const MA_WINDOW_DAYS: i64 = 200;

pub struct MacroProvider {
    broker: Arc<dyn BrokerClient>,
    repository: Arc<dyn MarketRegimeRepository>,
}

impl MacroProvider {
    pub fn new(broker: Arc<dyn BrokerClient>, repository: Arc<dyn MarketRegimeRepository>) -> Self {
        Self { broker, repository }
    }

    pub async fn latest(&self) -> Result<Option<MarketRegimeSnapshot>> {
        self.repository.latest().await
    }

    /// Pull `MA_WINDOW_DAYS` of S&P 500 daily bars, compute the close and
    /// its 200-day moving average, and persist the resulting regime
    /// snapshot. VIX/fear-greed are left `None` here since the broker's
    /// index feed doesn't carry them; a dedicated adapter can populate
    /// those fields later without touching this refresh's shape.
    pub async fn refresh(&self) -> Result<MarketRegimeSnapshot> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(MA_WINDOW_DAYS + 30);

        let bars = self
            .broker
            .historical_bars(SP500_INDEX_SYMBOL, Market::Us, start, end)
            .await
            .context("failed to fetch S&P 500 bars for macro regime refresh")?;

        if bars.len() < MA_WINDOW_DAYS as usize {
            warn!(count = bars.len(), "insufficient S&P 500 history for 200-day MA");
        }

        let closes: Vec<f64> = bars
            .iter()
            .map(|b| b.close.to_string().parse::<f64>().unwrap_or(0.0))
            .collect();
        let window = &closes[closes.len().saturating_sub(MA_WINDOW_DAYS as usize)..];
        let ma200 = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f64>() / window.len() as f64
        };
        let close = closes.last().copied().unwrap_or(0.0);

        let snapshot = MarketRegimeSnapshot::new(end, close, ma200, None, None);
        self.repository.insert(&snapshot).await?;
        info!(regime = %snapshot.regime, close, ma200, "macro regime refreshed");
        Ok(snapshot)
    }
}
