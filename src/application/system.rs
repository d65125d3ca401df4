//! Application wiring (C9 host): builds every adapter and service from
//! `Config`, assembles the strategy engine and scheduler, and exposes a
//! single `start()` that spawns the scheduler's background loops. Mirrors
//! the teacher's `Application::build`/`start` split so the binary entry
//! point stays a thin shell around this module.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::domain::ports::BrokerClient;
use crate::domain::repositories::InstrumentRepository;

use crate::application::daily_sync::DailySyncJob;
use crate::application::macro_provider::MacroProvider;
use crate::application::portfolio_service::PortfolioService;
use crate::application::scheduler::Scheduler;
use crate::application::settings_store::SettingsStore;
use crate::application::strategy::TickStrategy;
use crate::application::ticker_cache::TickerStateCache;
use crate::infrastructure::broker::KisBrokerClient;
use crate::infrastructure::market_data::BrokerWebSocketFeed;
use crate::infrastructure::notifier_webhook::WebhookNotifier;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::persistence::repositories::{
    SqliteDcfOverrideRepository, SqliteFinancialSnapshotRepository, SqliteInstrumentRepository, SqliteMarketRegimeRepository,
    SqlitePortfolioRepository, SqliteSettingsRepository, SqliteTradeRepository,
};

pub struct Application {
    pub config: Config,
    pub cache: Arc<TickerStateCache>,
    pub broker: Arc<dyn BrokerClient>,
    pub portfolio: Arc<PortfolioService>,
    pub scheduler: Arc<Scheduler>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(mode = ?config.run_mode, "building application");

        let db = Database::new(&config.database_url).await?;

        let instrument_repo: Arc<dyn InstrumentRepository> = Arc::new(SqliteInstrumentRepository::new(db.pool.clone()));
        let financial_repo = Arc::new(SqliteFinancialSnapshotRepository::new(db.pool.clone()));
        let dcf_override_repo = Arc::new(SqliteDcfOverrideRepository::new(db.pool.clone()));
        let portfolio_repo = Arc::new(SqlitePortfolioRepository::new(db.pool.clone()));
        let trade_repo = Arc::new(SqliteTradeRepository::new(db.pool.clone()));
        let settings_repo = Arc::new(SqliteSettingsRepository::new(db.pool.clone()));
        let regime_repo = Arc::new(SqliteMarketRegimeRepository::new(db.pool.clone()));

        let broker: Arc<dyn BrokerClient> = Arc::new(KisBrokerClient::new(
            config.broker_base_url.clone(),
            config.broker_app_key.clone(),
            config.broker_app_secret.clone(),
            config.broker_account_no.clone(),
            config.broker_min_request_interval_ms,
            config.broker_max_retries,
            config.token_cache_path.clone(),
        ));

        let notifier = Arc::new(WebhookNotifier::new(config.webhook_url.clone()));

        let cache = Arc::new(TickerStateCache::new());

        let universe = build_universe(&config, instrument_repo.as_ref()).await?;

        let macro_provider = Arc::new(MacroProvider::new(broker.clone(), regime_repo.clone()));
        let portfolio_service = Arc::new(PortfolioService::new(broker.clone(), portfolio_repo.clone()));
        let settings_store = Arc::new(SettingsStore::load(settings_repo.clone()).await?);
        let daily_sync = Arc::new(DailySyncJob::new(broker.clone(), financial_repo.clone(), dcf_override_repo.clone(), cache.clone()));

        let tick_strategy = Arc::new(TickStrategy::new(
            cache.clone(),
            broker.clone(),
            portfolio_service.clone(),
            portfolio_repo.clone(),
            trade_repo.clone(),
            macro_provider.clone(),
            notifier.clone(),
        ));

        let scheduler = Arc::new(Scheduler::new(
            tick_strategy,
            daily_sync,
            macro_provider,
            portfolio_service.clone(),
            settings_store,
            broker.clone(),
            instrument_repo.clone(),
            universe,
            config.tick_interval_ms,
            config.daily_sync_hour_kst,
            config.macro_refresh_interval_minutes,
        ));

        if config.warmup_on_start {
            warm_up_from_db(&cache, instrument_repo.as_ref(), financial_repo.as_ref()).await?;
        }

        let feed = Arc::new(BrokerWebSocketFeed::new(config.broker_ws_url.clone(), config.broker_app_key.clone()));
        spawn_feed(feed, cache.clone(), instrument_repo.as_ref()).await?;

        Ok(Self {
            config,
            cache,
            broker,
            portfolio: portfolio_service,
            scheduler,
        })
    }

    /// Spawn the scheduler's background job loops. Returns immediately;
    /// the loops run for the life of the process.
    pub async fn start(&self) -> Result<()> {
        self.scheduler.clone().spawn();
        info!("scheduler loops spawned");
        Ok(())
    }
}

async fn build_universe(config: &Config, instrument_repo: &dyn InstrumentRepository) -> Result<Vec<crate::domain::instrument::Instrument>> {
    let mut universe = instrument_repo.list_all().await?;
    if universe.is_empty() {
        for symbol in &config.universe_symbols {
            let market = if crate::domain::market::is_kr_symbol(symbol) {
                crate::domain::market::Market::Kr
            } else {
                crate::domain::market::Market::Us
            };
            let instrument = crate::domain::instrument::Instrument::new(symbol.clone(), market, symbol.clone());
            instrument_repo.upsert(&instrument).await?;
            universe.push(instrument);
        }
    }
    Ok(universe)
}

async fn warm_up_from_db(
    cache: &Arc<TickerStateCache>,
    instrument_repo: &dyn InstrumentRepository,
    financial_repo: &dyn crate::domain::repositories::FinancialSnapshotRepository,
) -> Result<()> {
    let universe = instrument_repo.list_all().await?;
    let mut snapshots = Vec::new();
    for market in [crate::domain::market::Market::Kr, crate::domain::market::Market::Us] {
        snapshots.extend(financial_repo.latest_all(market).await?);
    }
    cache.warm_up(&universe, &snapshots, chrono::Utc::now()).await;
    Ok(())
}

async fn spawn_feed(feed: Arc<BrokerWebSocketFeed>, cache: Arc<TickerStateCache>, instrument_repo: &dyn InstrumentRepository) -> Result<()> {
    use crate::domain::ports::MarketDataFeed;
    let symbols: Vec<String> = instrument_repo.list_all().await?.into_iter().map(|i| i.symbol).collect();
    if symbols.is_empty() {
        return Ok(());
    }
    let rx = feed.subscribe(symbols).await?;
    cache.spawn_tick_consumer(rx);
    Ok(())
}
