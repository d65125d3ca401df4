//! Outbound ports the application layer depends on; infrastructure
//! provides the concrete adapters (broker REST client, websocket feed,
//! webhook notifier). Mirrors the teacher's `MarketDataService` /
//! `ExecutionService` split, generalized to a dual-market broker.

use crate::domain::market::Market;
use crate::domain::ticker_state::RealtimeTick;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc::Receiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub market: Market,
    pub side: OrderSide,
    pub quantity: i64,
    /// `None` submits a market order; the broker adapter decides venue
    /// semantics (KR market orders vs US extended-hours limit-only rules).
    pub limit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub broker_order_id: String,
    pub filled_quantity: i64,
    pub fill_price: Decimal,
    pub filled_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

/// REST surface of the broker (C1): order placement, account/position
/// queries, and historical bars for the indicator kernel's warm-up path.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn place_order(&self, order: OrderRequest) -> Result<OrderConfirmation>;
    async fn cash_balance(&self, market: Market) -> Result<Decimal>;
    async fn positions(&self, market: Market) -> Result<Vec<(String, i64, Decimal)>>;
    async fn historical_bars(
        &self,
        symbol: &str,
        market: Market,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;

    /// Symbols ranked by market cap, richest first, up to `limit`. Backs
    /// the universe refresh's "top 100 by market cap" step and the
    /// composite score's market-cap-rank bonus.
    async fn market_cap_ranking(&self, market: Market, limit: usize) -> Result<Vec<String>>;
}

/// Realtime market-data feed (C5): a persistent websocket connection that
/// streams normalized ticks on an mpsc channel. `subscribe` may be called
/// once per process lifetime per feed; reconnection is the adapter's
/// responsibility, invisible to callers except as a gap in the stream.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<Receiver<RealtimeTick>>;
}

/// Outbound alert channel (C10): trade confirmations, gate rejections at
/// warn level, and daily summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Wall-clock abstraction so gating/cooldown logic can be driven by fixed
/// timestamps in tests instead of `Utc::now()`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
