//! Daily sync job (C2): once a day per market, pulls enough price history
//! to recompute the indicator kernel's inputs for every instrument in the
//! universe and upserts a fresh `FinancialSnapshot`, then rewarms the
//! ticker-state cache from the result. DCF fair value is sourced from a
//! manual `DcfOverride` when present; automatic two-stage DCF needs
//! fundamentals (free cash flow, growth/beta inputs) the broker's price
//! history doesn't carry, so it's left `None` absent an override rather
//! than computed from a guessed proxy (see DESIGN.md).

use crate::domain::financial_snapshot::FinancialSnapshot;
use crate::domain::indicators;
use crate::domain::instrument::Instrument;
use crate::domain::market::Market;
use crate::domain::ports::BrokerClient;
use crate::domain::repositories::{DcfOverrideRepository, FinancialSnapshotRepository};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::ticker_cache::TickerStateCache;

/// EMA/RSI/Bollinger spans the indicator kernel is asked to compute per
/// symbol, matching the set `TickerState::ema`/warm-up expects.
const EMA_SPANS: [u32; 7] = [5, 10, 20, 60, 100, 120, 200];
const RSI_PERIOD: u32 = 14;
const BOLLINGER_PERIOD: u32 = 20;
const LOOKBACK_DAYS: i64 = 300;
const WEEK52_TRADING_DAYS: usize = 252;

pub struct DailySyncJob {
    broker: Arc<dyn BrokerClient>,
    financial_repo: Arc<dyn FinancialSnapshotRepository>,
    dcf_override_repo: Arc<dyn DcfOverrideRepository>,
    cache: Arc<TickerStateCache>,
}

impl DailySyncJob {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        financial_repo: Arc<dyn FinancialSnapshotRepository>,
        dcf_override_repo: Arc<dyn DcfOverrideRepository>,
        cache: Arc<TickerStateCache>,
    ) -> Self {
        Self {
            broker,
            financial_repo,
            dcf_override_repo,
            cache,
        }
    }

    pub async fn run(&self, market: Market, universe: &[Instrument]) -> Result<()> {
        let overrides = self.dcf_override_repo.list_all().await?;
        let overrides_by_symbol: HashMap<&str, f64> = overrides.iter().map(|o| (o.symbol.as_str(), o.fair_value)).collect();

        let mut snapshots = Vec::new();
        for instrument in universe.iter().filter(|i| i.market == market) {
            match self.sync_one(instrument, &overrides_by_symbol).await {
                Ok(snapshot) => {
                    if let Err(err) = self.financial_repo.upsert(&snapshot).await {
                        warn!(symbol = %instrument.symbol, error = %err, "failed to persist financial snapshot");
                    }
                    snapshots.push(snapshot);
                }
                Err(err) => warn!(symbol = %instrument.symbol, error = %err, "daily sync failed for symbol"),
            }
        }

        info!(market = %market, synced = snapshots.len(), "daily sync complete");
        self.cache.warm_up(universe, &snapshots, Utc::now()).await;
        Ok(())
    }

    async fn sync_one(&self, instrument: &Instrument, overrides: &HashMap<&str, f64>) -> Result<FinancialSnapshot> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(LOOKBACK_DAYS);
        let bars = self.broker.historical_bars(&instrument.symbol, instrument.market, start, end).await?;

        let closes: Vec<f64> = bars.iter().map(|b| b.close.to_string().parse::<f64>().unwrap_or(0.0)).collect();
        let last_bar = bars.last();

        let current_price = last_bar.map(|b| b.close).unwrap_or(Decimal::ZERO);
        let volume = last_bar.map(|b| b.volume).unwrap_or(0);
        let amount = current_price * Decimal::from(volume);

        let week52_window = &closes[closes.len().saturating_sub(WEEK52_TRADING_DAYS)..];
        let week52_high = week52_window.iter().cloned().fold(f64::MIN, f64::max);
        let week52_low = week52_window.iter().cloned().fold(f64::MAX, f64::min);

        let rsi = indicators::rsi(&closes, RSI_PERIOD).unwrap_or(0.0);
        let mut ema = HashMap::new();
        for span in EMA_SPANS {
            if let Some(value) = indicators::ema(&closes, span) {
                ema.insert(span, value);
            }
        }

        let dcf_fair_value = overrides.get(instrument.symbol.as_str()).copied();

        Ok(FinancialSnapshot {
            symbol: instrument.symbol.clone(),
            base_date: end.date_naive(),
            current_price,
            market_cap: Decimal::ZERO,
            per: None,
            pbr: None,
            roe: None,
            eps: None,
            bps: None,
            dividend_yield: None,
            week52_high: Decimal::from_f64(week52_high).unwrap_or(Decimal::ZERO),
            week52_low: Decimal::from_f64(week52_low).unwrap_or(Decimal::ZERO),
            volume,
            amount,
            rsi,
            ema,
            dcf_fair_value,
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_period_matches_constant() {
        assert_eq!(BOLLINGER_PERIOD, 20);
    }
}
