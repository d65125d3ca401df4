use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect to sqlite database")?;

        info!(db_url, "connected to database");

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS instruments (
                symbol TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                exchange_code TEXT NOT NULL,
                display_name TEXT NOT NULL,
                sector TEXT NOT NULL,
                sector_group TEXT NOT NULL,
                routing_endpoint TEXT NOT NULL,
                routing_tr_id TEXT NOT NULL,
                routing_market_code TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create instruments table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS financial_snapshots (
                symbol TEXT NOT NULL,
                base_date DATE NOT NULL,
                current_price TEXT NOT NULL,
                market_cap TEXT NOT NULL,
                per REAL,
                pbr REAL,
                roe REAL,
                eps REAL,
                bps REAL,
                dividend_yield REAL,
                week52_high TEXT NOT NULL,
                week52_low TEXT NOT NULL,
                volume INTEGER NOT NULL,
                amount TEXT NOT NULL,
                rsi REAL NOT NULL,
                ema_json TEXT NOT NULL,
                dcf_fair_value REAL,
                PRIMARY KEY (symbol, base_date)
            );
            CREATE INDEX IF NOT EXISTS idx_financial_snapshots_symbol
            ON financial_snapshots (symbol, base_date DESC);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create financial_snapshots table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dcf_overrides (
                symbol TEXT PRIMARY KEY,
                fair_value REAL NOT NULL,
                reason TEXT NOT NULL,
                set_by TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create dcf_overrides table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS portfolio_holdings (
                symbol TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                sector_group TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                average_price TEXT NOT NULL,
                buy_tranche_count INTEGER NOT NULL,
                sell_split_count INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create portfolio_holdings table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cash_balances (
                market TEXT PRIMARY KEY,
                amount TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create cash_balances table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                market TEXT NOT NULL,
                side TEXT NOT NULL,
                reason TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price TEXT NOT NULL,
                score_at_trade INTEGER NOT NULL,
                executed_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades (symbol, executed_at DESC);
            CREATE INDEX IF NOT EXISTS idx_trades_executed_at ON trades (executed_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create trades table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_by TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create settings table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_regime_snapshots (
                as_of DATETIME PRIMARY KEY,
                sp500_close REAL NOT NULL,
                sp500_ma200 REAL NOT NULL,
                vix REAL,
                fear_greed_index REAL,
                regime TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create market_regime_snapshots table")?;

        info!("database schema initialized");
        Ok(())
    }
}
