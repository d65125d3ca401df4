use crate::domain::dcf_override::DcfOverride;
use crate::domain::financial_snapshot::FinancialSnapshot;
use crate::domain::instrument::Instrument;
use crate::domain::market::Market;
use crate::domain::market_regime::{MarketRegimeSnapshot, Regime};
use crate::domain::portfolio::{CashBalance, PortfolioHolding};
use crate::domain::repositories::{
    DcfOverrideRepository, FinancialSnapshotRepository, InstrumentRepository,
    MarketRegimeRepository, PortfolioRepository, SettingsRepository, TradeRepository,
};
use crate::domain::sector::SectorGroup;
use crate::domain::settings::Setting;
use crate::domain::trade::{TradeRecord, TradeReason, TradeSide};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

pub struct SqliteInstrumentRepository {
    pool: SqlitePool,
}

impl SqliteInstrumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_instrument(row: &sqlx::sqlite::SqliteRow) -> Result<Instrument> {
        Ok(Instrument {
            symbol: row.try_get("symbol")?,
            market: Market::from_str(row.try_get("market")?)?,
            exchange_code: row.try_get("exchange_code")?,
            display_name: row.try_get("display_name")?,
            sector: row.try_get("sector")?,
            sector_group: SectorGroup::from_str(row.try_get("sector_group")?)?,
            routing_endpoint: row.try_get("routing_endpoint")?,
            routing_tr_id: row.try_get("routing_tr_id")?,
            routing_market_code: row.try_get("routing_market_code")?,
        })
    }
}

#[async_trait]
impl InstrumentRepository for SqliteInstrumentRepository {
    async fn upsert(&self, instrument: &Instrument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO instruments
                (symbol, market, exchange_code, display_name, sector, sector_group,
                 routing_endpoint, routing_tr_id, routing_market_code)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                market = excluded.market,
                exchange_code = excluded.exchange_code,
                display_name = excluded.display_name,
                sector = excluded.sector,
                sector_group = excluded.sector_group,
                routing_endpoint = excluded.routing_endpoint,
                routing_tr_id = excluded.routing_tr_id,
                routing_market_code = excluded.routing_market_code
            "#,
        )
        .bind(&instrument.symbol)
        .bind(instrument.market.to_string())
        .bind(&instrument.exchange_code)
        .bind(&instrument.display_name)
        .bind(&instrument.sector)
        .bind(instrument.sector_group.to_string())
        .bind(&instrument.routing_endpoint)
        .bind(&instrument.routing_tr_id)
        .bind(&instrument.routing_market_code)
        .execute(&self.pool)
        .await
        .context("failed to upsert instrument")?;
        Ok(())
    }

    async fn get(&self, symbol: &str) -> Result<Option<Instrument>> {
        let row = sqlx::query("SELECT * FROM instruments WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_instrument).transpose()
    }

    async fn list_by_market(&self, market: Market) -> Result<Vec<Instrument>> {
        let rows = sqlx::query("SELECT * FROM instruments WHERE market = ?")
            .bind(market.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_instrument).collect()
    }

    async fn list_all(&self) -> Result<Vec<Instrument>> {
        let rows = sqlx::query("SELECT * FROM instruments")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_instrument).collect()
    }
}

pub struct SqliteFinancialSnapshotRepository {
    pool: SqlitePool,
}

impl SqliteFinancialSnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_snapshot(row: &sqlx::sqlite::SqliteRow) -> Result<FinancialSnapshot> {
        let ema_json: String = row.try_get("ema_json")?;
        let ema: HashMap<u32, f64> = serde_json::from_str(&ema_json).unwrap_or_default();
        Ok(FinancialSnapshot {
            symbol: row.try_get("symbol")?,
            base_date: row.try_get("base_date")?,
            current_price: Decimal::from_str(row.try_get("current_price")?).unwrap_or_default(),
            market_cap: Decimal::from_str(row.try_get("market_cap")?).unwrap_or_default(),
            per: row.try_get("per")?,
            pbr: row.try_get("pbr")?,
            roe: row.try_get("roe")?,
            eps: row.try_get("eps")?,
            bps: row.try_get("bps")?,
            dividend_yield: row.try_get("dividend_yield")?,
            week52_high: Decimal::from_str(row.try_get("week52_high")?).unwrap_or_default(),
            week52_low: Decimal::from_str(row.try_get("week52_low")?).unwrap_or_default(),
            volume: row.try_get("volume")?,
            amount: Decimal::from_str(row.try_get("amount")?).unwrap_or_default(),
            rsi: row.try_get("rsi")?,
            ema,
            dcf_fair_value: row.try_get("dcf_fair_value")?,
        })
    }
}

#[async_trait]
impl FinancialSnapshotRepository for SqliteFinancialSnapshotRepository {
    async fn upsert(&self, snapshot: &FinancialSnapshot) -> Result<()> {
        let ema_json = serde_json::to_string(&snapshot.ema)?;
        sqlx::query(
            r#"
            INSERT INTO financial_snapshots
                (symbol, base_date, current_price, market_cap, per, pbr, roe, eps, bps,
                 dividend_yield, week52_high, week52_low, volume, amount, rsi, ema_json, dcf_fair_value)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol, base_date) DO UPDATE SET
                current_price = excluded.current_price,
                market_cap = excluded.market_cap,
                per = excluded.per,
                pbr = excluded.pbr,
                roe = excluded.roe,
                eps = excluded.eps,
                bps = excluded.bps,
                dividend_yield = excluded.dividend_yield,
                week52_high = excluded.week52_high,
                week52_low = excluded.week52_low,
                volume = excluded.volume,
                amount = excluded.amount,
                rsi = excluded.rsi,
                ema_json = excluded.ema_json,
                dcf_fair_value = excluded.dcf_fair_value
            "#,
        )
        .bind(&snapshot.symbol)
        .bind(snapshot.base_date)
        .bind(snapshot.current_price.to_string())
        .bind(snapshot.market_cap.to_string())
        .bind(snapshot.per)
        .bind(snapshot.pbr)
        .bind(snapshot.roe)
        .bind(snapshot.eps)
        .bind(snapshot.bps)
        .bind(snapshot.dividend_yield)
        .bind(snapshot.week52_high.to_string())
        .bind(snapshot.week52_low.to_string())
        .bind(snapshot.volume)
        .bind(snapshot.amount.to_string())
        .bind(snapshot.rsi)
        .bind(ema_json)
        .bind(snapshot.dcf_fair_value)
        .execute(&self.pool)
        .await
        .context("failed to upsert financial snapshot")?;
        Ok(())
    }

    async fn latest(&self, symbol: &str) -> Result<Option<FinancialSnapshot>> {
        let row = sqlx::query(
            "SELECT * FROM financial_snapshots WHERE symbol = ? ORDER BY base_date DESC LIMIT 1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_snapshot).transpose()
    }

    async fn latest_all(&self, market: Market) -> Result<Vec<FinancialSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT fs.* FROM financial_snapshots fs
            INNER JOIN (
                SELECT symbol, MAX(base_date) AS max_date FROM financial_snapshots GROUP BY symbol
            ) latest ON fs.symbol = latest.symbol AND fs.base_date = latest.max_date
            INNER JOIN instruments i ON i.symbol = fs.symbol
            WHERE i.market = ?
            "#,
        )
        .bind(market.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_snapshot).collect()
    }

    async fn get_on(&self, symbol: &str, date: NaiveDate) -> Result<Option<FinancialSnapshot>> {
        let row = sqlx::query("SELECT * FROM financial_snapshots WHERE symbol = ? AND base_date = ?")
            .bind(symbol)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_snapshot).transpose()
    }
}

pub struct SqliteDcfOverrideRepository {
    pool: SqlitePool,
}

impl SqliteDcfOverrideRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_override(row: &sqlx::sqlite::SqliteRow) -> Result<DcfOverride> {
        Ok(DcfOverride {
            symbol: row.try_get("symbol")?,
            fair_value: row.try_get("fair_value")?,
            reason: row.try_get("reason")?,
            set_by: row.try_get("set_by")?,
        })
    }
}

#[async_trait]
impl DcfOverrideRepository for SqliteDcfOverrideRepository {
    async fn upsert(&self, override_row: &DcfOverride) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dcf_overrides (symbol, fair_value, reason, set_by)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                fair_value = excluded.fair_value,
                reason = excluded.reason,
                set_by = excluded.set_by
            "#,
        )
        .bind(&override_row.symbol)
        .bind(override_row.fair_value)
        .bind(&override_row.reason)
        .bind(&override_row.set_by)
        .execute(&self.pool)
        .await
        .context("failed to upsert dcf override")?;
        Ok(())
    }

    async fn get(&self, symbol: &str) -> Result<Option<DcfOverride>> {
        let row = sqlx::query("SELECT * FROM dcf_overrides WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_override).transpose()
    }

    async fn list_all(&self) -> Result<Vec<DcfOverride>> {
        let rows = sqlx::query("SELECT * FROM dcf_overrides")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_override).collect()
    }
}

pub struct SqlitePortfolioRepository {
    pool: SqlitePool,
}

impl SqlitePortfolioRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_holding(row: &sqlx::sqlite::SqliteRow) -> Result<PortfolioHolding> {
        Ok(PortfolioHolding {
            symbol: row.try_get("symbol")?,
            market: Market::from_str(row.try_get("market")?)?,
            sector_group: SectorGroup::from_str(row.try_get("sector_group")?)?,
            quantity: row.try_get("quantity")?,
            average_price: Decimal::from_str(row.try_get("average_price")?).unwrap_or_default(),
            buy_tranche_count: row.try_get::<i64, _>("buy_tranche_count")? as u32,
            sell_split_count: row.try_get::<i64, _>("sell_split_count")? as u32,
        })
    }
}

#[async_trait]
impl PortfolioRepository for SqlitePortfolioRepository {
    async fn upsert_holding(&self, holding: &PortfolioHolding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO portfolio_holdings
                (symbol, market, sector_group, quantity, average_price, buy_tranche_count, sell_split_count)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                quantity = excluded.quantity,
                average_price = excluded.average_price,
                buy_tranche_count = excluded.buy_tranche_count,
                sell_split_count = excluded.sell_split_count
            "#,
        )
        .bind(&holding.symbol)
        .bind(holding.market.to_string())
        .bind(holding.sector_group.to_string())
        .bind(holding.quantity)
        .bind(holding.average_price.to_string())
        .bind(holding.buy_tranche_count as i64)
        .bind(holding.sell_split_count as i64)
        .execute(&self.pool)
        .await
        .context("failed to upsert portfolio holding")?;
        Ok(())
    }

    async fn get_holding(&self, symbol: &str) -> Result<Option<PortfolioHolding>> {
        let row = sqlx::query("SELECT * FROM portfolio_holdings WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_holding).transpose()
    }

    async fn list_holdings(&self, market: Market) -> Result<Vec<PortfolioHolding>> {
        let rows = sqlx::query("SELECT * FROM portfolio_holdings WHERE market = ? AND quantity > 0")
            .bind(market.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_holding).collect()
    }

    async fn upsert_cash(&self, cash: &CashBalance) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cash_balances (market, amount) VALUES (?, ?)
            ON CONFLICT(market) DO UPDATE SET amount = excluded.amount
            "#,
        )
        .bind(cash.market.to_string())
        .bind(cash.amount.to_string())
        .execute(&self.pool)
        .await
        .context("failed to upsert cash balance")?;
        Ok(())
    }

    async fn get_cash(&self, market: Market) -> Result<Option<CashBalance>> {
        let row = sqlx::query("SELECT * FROM cash_balances WHERE market = ?")
            .bind(market.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            Ok::<_, anyhow::Error>(CashBalance {
                market,
                amount: Decimal::from_str(r.try_get("amount")?).unwrap_or_default(),
            })
        })
        .transpose()
    }
}

pub struct SqliteTradeRepository {
    pool: SqlitePool,
}

impl SqliteTradeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_trade(row: &sqlx::sqlite::SqliteRow) -> Result<TradeRecord> {
        let id_str: String = row.try_get("id")?;
        Ok(TradeRecord {
            id: Uuid::parse_str(&id_str).context("invalid trade id")?,
            symbol: row.try_get("symbol")?,
            market: Market::from_str(row.try_get("market")?)?,
            side: TradeSide::from_str(row.try_get("side")?)?,
            reason: TradeReason::from_str(row.try_get("reason")?)?,
            quantity: row.try_get("quantity")?,
            price: Decimal::from_str(row.try_get("price")?).unwrap_or_default(),
            score_at_trade: row.try_get("score_at_trade")?,
            executed_at: row.try_get("executed_at")?,
        })
    }
}

#[async_trait]
impl TradeRepository for SqliteTradeRepository {
    async fn insert(&self, trade: &TradeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (id, symbol, market, side, reason, quantity, price, score_at_trade, executed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(trade.id.to_string())
        .bind(&trade.symbol)
        .bind(trade.market.to_string())
        .bind(trade.side.to_string())
        .bind(trade.reason.to_string())
        .bind(trade.quantity)
        .bind(trade.price.to_string())
        .bind(trade.score_at_trade)
        .bind(trade.executed_at)
        .execute(&self.pool)
        .await
        .context("failed to insert trade")?;
        Ok(())
    }

    async fn list_for_symbol(&self, symbol: &str, limit: i64) -> Result<Vec<TradeRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM trades WHERE symbol = ? ORDER BY executed_at DESC LIMIT ?",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_trade).collect()
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<TradeRecord>> {
        let rows = sqlx::query("SELECT * FROM trades WHERE executed_at >= ? ORDER BY executed_at ASC")
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_trade).collect()
    }
}

pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn upsert(&self, setting: &Setting) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_by) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_by = excluded.updated_by
            "#,
        )
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(&setting.updated_by)
        .execute(&self.pool)
        .await
        .context("failed to upsert setting")?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Setting>> {
        let rows = sqlx::query("SELECT * FROM settings")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Setting {
                    key: row.try_get("key")?,
                    value: row.try_get("value")?,
                    updated_by: row.try_get("updated_by")?,
                })
            })
            .collect()
    }
}

pub struct SqliteMarketRegimeRepository {
    pool: SqlitePool,
}

impl SqliteMarketRegimeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketRegimeRepository for SqliteMarketRegimeRepository {
    async fn insert(&self, snapshot: &MarketRegimeSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO market_regime_snapshots (as_of, sp500_close, sp500_ma200, vix, fear_greed_index, regime)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(as_of) DO NOTHING
            "#,
        )
        .bind(snapshot.as_of)
        .bind(snapshot.sp500_close)
        .bind(snapshot.sp500_ma200)
        .bind(snapshot.vix)
        .bind(snapshot.fear_greed_index)
        .bind(snapshot.regime.to_string())
        .execute(&self.pool)
        .await
        .context("failed to insert market regime snapshot")?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<MarketRegimeSnapshot>> {
        let row = sqlx::query("SELECT * FROM market_regime_snapshots ORDER BY as_of DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            Ok::<_, anyhow::Error>(MarketRegimeSnapshot {
                as_of: r.try_get("as_of")?,
                sp500_close: r.try_get("sp500_close")?,
                sp500_ma200: r.try_get("sp500_ma200")?,
                vix: r.try_get("vix")?,
                fear_greed_index: r.try_get("fear_greed_index")?,
                regime: Regime::from_str(r.try_get("regime")?)?,
            })
        })
        .transpose()
    }
}
