//! Persistence ports (SQLite-backed in infrastructure::persistence).
//! Kept separate from `ports.rs` since these are storage concerns, not
//! broker/market-data concerns, and the teacher draws the same line
//! between `ports.rs` and `persistence::repositories`.

use crate::domain::dcf_override::DcfOverride;
use crate::domain::financial_snapshot::FinancialSnapshot;
use crate::domain::instrument::Instrument;
use crate::domain::market::Market;
use crate::domain::market_regime::MarketRegimeSnapshot;
use crate::domain::portfolio::{CashBalance, PortfolioHolding};
use crate::domain::settings::Setting;
use crate::domain::trade::TradeRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait InstrumentRepository: Send + Sync {
    async fn upsert(&self, instrument: &Instrument) -> Result<()>;
    async fn get(&self, symbol: &str) -> Result<Option<Instrument>>;
    async fn list_by_market(&self, market: Market) -> Result<Vec<Instrument>>;
    async fn list_all(&self) -> Result<Vec<Instrument>>;
}

#[async_trait]
pub trait FinancialSnapshotRepository: Send + Sync {
    async fn upsert(&self, snapshot: &FinancialSnapshot) -> Result<()>;
    async fn latest(&self, symbol: &str) -> Result<Option<FinancialSnapshot>>;
    async fn latest_all(&self, market: Market) -> Result<Vec<FinancialSnapshot>>;
    async fn get_on(&self, symbol: &str, date: NaiveDate) -> Result<Option<FinancialSnapshot>>;
}

#[async_trait]
pub trait DcfOverrideRepository: Send + Sync {
    async fn upsert(&self, override_row: &DcfOverride) -> Result<()>;
    async fn get(&self, symbol: &str) -> Result<Option<DcfOverride>>;
    async fn list_all(&self) -> Result<Vec<DcfOverride>>;
}

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn upsert_holding(&self, holding: &PortfolioHolding) -> Result<()>;
    async fn get_holding(&self, symbol: &str) -> Result<Option<PortfolioHolding>>;
    async fn list_holdings(&self, market: Market) -> Result<Vec<PortfolioHolding>>;
    async fn upsert_cash(&self, cash: &CashBalance) -> Result<()>;
    async fn get_cash(&self, market: Market) -> Result<Option<CashBalance>>;
}

#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn insert(&self, trade: &TradeRecord) -> Result<()>;
    async fn list_for_symbol(&self, symbol: &str, limit: i64) -> Result<Vec<TradeRecord>>;
    async fn list_since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<Vec<TradeRecord>>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn upsert(&self, setting: &Setting) -> Result<()>;
    async fn list_all(&self) -> Result<Vec<Setting>>;
}

#[async_trait]
pub trait MarketRegimeRepository: Send + Sync {
    async fn insert(&self, snapshot: &MarketRegimeSnapshot) -> Result<()>;
    async fn latest(&self) -> Result<Option<MarketRegimeSnapshot>>;
}
