//! Ticker-state cache (C4): the hot-path in-memory mirror every tick
//! cycle reads. Warm-up rebuilds it from the latest financial snapshot per
//! symbol (DB fast path, no REST calls when the snapshot is fresh);
//! realtime ticks from the market-data feed (C5) mutate it in place via a
//! background consumer task, mirroring the teacher's Sentinel forwarding
//! loop but applying directly instead of re-forwarding on a channel.

use crate::domain::financial_snapshot::FinancialSnapshot;
use crate::domain::instrument::Instrument;
use crate::domain::ticker_state::{RealtimeTick, TickerState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};

pub struct TickerStateCache {
    states: Arc<RwLock<HashMap<String, TickerState>>>,
}

impl Default for TickerStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TickerStateCache {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Warm-up: for each instrument, use a fresh snapshot (DB fast path)
    /// if one exists, otherwise leave the symbol absent from the cache
    /// until the daily sync job populates one. Idempotent: re-running
    /// warm-up with the same snapshots produces the same cache contents.
    pub async fn warm_up(&self, instruments: &[Instrument], snapshots: &[FinancialSnapshot], as_of: chrono::DateTime<chrono::Utc>) {
        let mut states = self.states.write().await;
        let by_symbol: HashMap<&str, &FinancialSnapshot> =
            snapshots.iter().map(|s| (s.symbol.as_str(), s)).collect();

        for instrument in instruments {
            let Some(snapshot) = by_symbol.get(instrument.symbol.as_str()) else {
                continue;
            };
            if !snapshot.is_fresh(as_of) {
                warn!(symbol = %instrument.symbol, "warm-up snapshot stale, skipping fast path");
                continue;
            }
            let state = snapshot.to_ticker_state(&instrument.display_name);
            states.insert(instrument.symbol.clone(), state);
        }
        info!(loaded = states.len(), "ticker state cache warmed up");
    }

    pub async fn get(&self, symbol: &str) -> Option<TickerState> {
        self.states.read().await.get(symbol).cloned()
    }

    pub async fn all(&self) -> Vec<TickerState> {
        self.states.read().await.values().cloned().collect()
    }

    pub async fn apply_tick(&self, tick: RealtimeTick) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(&tick.symbol) {
            state.apply_tick(&tick);
        }
    }

    /// Spawn a background task draining `rx` and applying each tick. One
    /// task per process; the websocket adapter owns reconnection, this
    /// loop just dies silently when the channel closes.
    pub fn spawn_tick_consumer(self: &Arc<Self>, mut rx: mpsc::Receiver<RealtimeTick>) {
        let cache = self.clone();
        tokio::spawn(async move {
            while let Some(tick) = rx.recv().await {
                cache.apply_tick(tick).await;
            }
            warn!("ticker state cache tick consumer stopped: channel closed");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Market;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap as StdHashMap;

    fn snapshot(symbol: &str, ema200: f64) -> FinancialSnapshot {
        let mut ema = StdHashMap::new();
        ema.insert(200, ema200);
        FinancialSnapshot {
            symbol: symbol.to_string(),
            base_date: Utc::now().date_naive(),
            current_price: dec!(100),
            market_cap: dec!(1000000),
            per: None,
            pbr: None,
            roe: None,
            eps: None,
            bps: None,
            dividend_yield: None,
            week52_high: dec!(120),
            week52_low: dec!(80),
            volume: 1000,
            amount: dec!(100000),
            rsi: 55.0,
            ema,
            dcf_fair_value: None,
        }
    }

    #[tokio::test]
    async fn warm_up_populates_cache_with_no_rest_calls() {
        let cache = TickerStateCache::new();
        let instrument = Instrument::new("AAPL", Market::Us, "Apple");
        let snap = snapshot("AAPL", 190.0);

        cache.warm_up(&[instrument], &[snap], Utc::now()).await;

        let state = cache.get("AAPL").await.expect("should be warmed up");
        assert!(state.is_ready);
        assert_eq!(state.target_buy_price, Some(dec!(191.9)));
    }

    #[tokio::test]
    async fn warm_up_skips_stale_snapshots() {
        let cache = TickerStateCache::new();
        let instrument = Instrument::new("AAPL", Market::Us, "Apple");
        let mut snap = snapshot("AAPL", 190.0);
        snap.base_date = (Utc::now() - chrono::Duration::days(5)).date_naive();

        cache.warm_up(&[instrument], &[snap], Utc::now()).await;

        assert!(cache.get("AAPL").await.is_none());
    }
}
