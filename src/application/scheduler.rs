//! Scheduler (C9): one independent `tokio::time::interval` loop per job
//! (tick, daily market-data sync, macro refresh, portfolio sync, hourly
//! report, weekly sector rebalance), spawned as background tasks and left
//! running for the life of the process. No cron crate — job cadence is
//! simple enough (fixed interval, or "once past a given local hour/week")
//! that an interval timer with an in-memory last-run marker is clearer
//! than a cron expression parser would be.

use crate::application::daily_sync::DailySyncJob;
use crate::application::macro_provider::MacroProvider;
use crate::application::portfolio_service::PortfolioService;
use crate::application::settings_store::SettingsStore;
use crate::application::strategy::TickStrategy;
use crate::domain::instrument::Instrument;
use crate::domain::market::Market;
use crate::domain::ports::BrokerClient;
use crate::domain::repositories::InstrumentRepository;
use chrono::{Datelike, IsoWeek, NaiveDate, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

const PORTFOLIO_SYNC_INTERVAL_MINUTES: u64 = 10;
const HOURLY_REPORT_INTERVAL_MINUTES: u64 = 60;
const REBALANCE_POLL_SECONDS: u64 = 60;
const REBALANCE_HOUR_KST: u32 = 9;
const REBALANCE_MINUTE_KST: u32 = 10;
const UNIVERSE_REFRESH_POLL_SECONDS: u64 = 60;
const UNIVERSE_REFRESH_HOUR_KST: u32 = 8;
const UNIVERSE_REFRESH_MINUTE_KST: u32 = 30;
const MARKET_CAP_RANKING_SIZE: usize = 100;
const MARKET_CAP_TOP_N: usize = 10;

pub struct Scheduler {
    tick_strategy: Arc<TickStrategy>,
    daily_sync: Arc<DailySyncJob>,
    macro_provider: Arc<MacroProvider>,
    portfolio: Arc<PortfolioService>,
    settings_store: Arc<SettingsStore>,
    broker: Arc<dyn BrokerClient>,
    instrument_repo: Arc<dyn InstrumentRepository>,
    universe: RwLock<Vec<Instrument>>,
    market_cap_ranks: RwLock<HashMap<Market, Vec<String>>>,
    tick_interval_ms: u64,
    daily_sync_hour_kst: u32,
    macro_refresh_interval_minutes: u64,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tick_strategy: Arc<TickStrategy>,
        daily_sync: Arc<DailySyncJob>,
        macro_provider: Arc<MacroProvider>,
        portfolio: Arc<PortfolioService>,
        settings_store: Arc<SettingsStore>,
        broker: Arc<dyn BrokerClient>,
        instrument_repo: Arc<dyn InstrumentRepository>,
        universe: Vec<Instrument>,
        tick_interval_ms: u64,
        daily_sync_hour_kst: u32,
        macro_refresh_interval_minutes: u64,
    ) -> Self {
        Self {
            tick_strategy,
            daily_sync,
            macro_provider,
            portfolio,
            settings_store,
            broker,
            instrument_repo,
            universe: RwLock::new(universe),
            market_cap_ranks: RwLock::new(HashMap::new()),
            tick_interval_ms,
            daily_sync_hour_kst,
            macro_refresh_interval_minutes,
        }
    }

    /// Spawn every job loop. Returns immediately; the loops run for the
    /// life of the process, logging and continuing past any single
    /// cycle's error rather than aborting the scheduler.
    pub fn spawn(self: Arc<Self>) {
        let tick = self.clone();
        tokio::spawn(async move { tick.run_tick_loop().await });

        let daily = self.clone();
        tokio::spawn(async move { daily.run_daily_sync_loop().await });

        let macro_loop = self.clone();
        tokio::spawn(async move { macro_loop.run_macro_refresh_loop().await });

        let portfolio_sync = self.clone();
        tokio::spawn(async move { portfolio_sync.run_portfolio_sync_loop().await });

        let hourly_report = self.clone();
        tokio::spawn(async move { hourly_report.run_hourly_report_loop().await });

        let rebalance = self.clone();
        tokio::spawn(async move { rebalance.run_rebalance_loop().await });

        let universe_refresh = self.clone();
        tokio::spawn(async move { universe_refresh.run_universe_refresh_loop().await });
    }

    async fn run_tick_loop(&self) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.tick_interval_ms));
        loop {
            interval.tick().await;
            let settings = self.settings_store.current().await;
            for market in [Market::Kr, Market::Us] {
                let top_10 = self.top_10_by_market_cap(market).await;
                let universe = self.universe.read().await;
                if let Err(err) = self.tick_strategy.run_tick(market, &universe, &settings, &top_10).await {
                    error!(market = %market, error = %err, "tick cycle failed");
                }
            }
        }
    }

    async fn run_daily_sync_loop(&self) {
        let last_run: Mutex<Option<NaiveDate>> = Mutex::new(None);
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let now_kst = Utc::now().with_timezone(&chrono_tz::Asia::Seoul);
            if now_kst.hour() != self.daily_sync_hour_kst {
                continue;
            }
            let today = now_kst.date_naive();
            let mut guard = last_run.lock().await;
            if *guard == Some(today) {
                continue;
            }
            *guard = Some(today);
            drop(guard);

            info!("daily sync job starting");
            let universe = self.universe.read().await.clone();
            for market in [Market::Kr, Market::Us] {
                if let Err(err) = self.portfolio.reconcile(market, &universe).await {
                    error!(market = %market, error = %err, "portfolio reconciliation failed during daily sync");
                }
                if let Err(err) = self.daily_sync.run(market, &universe).await {
                    error!(market = %market, error = %err, "daily sync failed");
                }
            }
            if let Err(err) = self.settings_store.refresh().await {
                error!(error = %err, "settings refresh failed during daily sync");
            }
        }
    }

    async fn run_macro_refresh_loop(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * self.macro_refresh_interval_minutes.max(1)));
        loop {
            interval.tick().await;
            if let Err(err) = self.macro_provider.refresh().await {
                error!(error = %err, "macro regime refresh failed");
            }
        }
    }

    async fn run_portfolio_sync_loop(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * PORTFOLIO_SYNC_INTERVAL_MINUTES));
        loop {
            interval.tick().await;
            let universe = self.universe.read().await.clone();
            for market in [Market::Kr, Market::Us] {
                if let Err(err) = self.portfolio.reconcile(market, &universe).await {
                    error!(market = %market, error = %err, "portfolio sync failed");
                }
            }
        }
    }

    async fn run_hourly_report_loop(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * HOURLY_REPORT_INTERVAL_MINUTES));
        loop {
            interval.tick().await;
            for market in [Market::Kr, Market::Us] {
                if let Err(err) = self.tick_strategy.send_hourly_report(market).await {
                    error!(market = %market, error = %err, "hourly report failed");
                }
            }
        }
    }

    /// Sector-cap rebalance, gated to fire at most once per ISO week, at
    /// or after the configured KST hour/minute - mirrors the daily-sync
    /// loop's "interval poll + last-run marker" shape but keyed on week
    /// instead of day.
    async fn run_rebalance_loop(&self) {
        let last_run: Mutex<Option<IsoWeek>> = Mutex::new(None);
        let mut interval = tokio::time::interval(Duration::from_secs(REBALANCE_POLL_SECONDS));
        loop {
            interval.tick().await;
            let now_kst = Utc::now().with_timezone(&chrono_tz::Asia::Seoul);
            let past_trigger_time =
                now_kst.hour() > REBALANCE_HOUR_KST || (now_kst.hour() == REBALANCE_HOUR_KST && now_kst.minute() >= REBALANCE_MINUTE_KST);
            if !past_trigger_time {
                continue;
            }

            let week = now_kst.iso_week();
            let mut guard = last_run.lock().await;
            if *guard == Some(week) {
                continue;
            }
            *guard = Some(week);
            drop(guard);

            info!("weekly sector rebalance starting");
            let settings = self.settings_store.current().await;
            for market in [Market::Kr, Market::Us] {
                if let Err(err) = self.tick_strategy.run_rebalance(market, &settings).await {
                    error!(market = %market, error = %err, "sector rebalance failed");
                }
            }
        }
    }

    /// Richest 10 symbols in `market`, per the ranking cache populated by
    /// the universe refresh job. Empty until the first refresh completes.
    async fn top_10_by_market_cap(&self, market: Market) -> Vec<String> {
        self.market_cap_ranks
            .read()
            .await
            .get(&market)
            .map(|ranks| ranks.iter().take(MARKET_CAP_TOP_N).cloned().collect())
            .unwrap_or_default()
    }

    /// Daily 08:30 KST job (spec.md §4.8.4 step 2 / §4.9): force-refresh
    /// the tradeable universe and market-cap ranking cache, gated to fire
    /// at most once per day like the other daily jobs.
    async fn run_universe_refresh_loop(&self) {
        let last_run: Mutex<Option<NaiveDate>> = Mutex::new(None);
        let mut interval = tokio::time::interval(Duration::from_secs(UNIVERSE_REFRESH_POLL_SECONDS));
        loop {
            interval.tick().await;
            let now_kst = Utc::now().with_timezone(&chrono_tz::Asia::Seoul);
            let past_trigger_time = now_kst.hour() > UNIVERSE_REFRESH_HOUR_KST
                || (now_kst.hour() == UNIVERSE_REFRESH_HOUR_KST && now_kst.minute() >= UNIVERSE_REFRESH_MINUTE_KST);
            if !past_trigger_time {
                continue;
            }

            let today = now_kst.date_naive();
            let mut guard = last_run.lock().await;
            if *guard == Some(today) {
                continue;
            }
            *guard = Some(today);
            drop(guard);

            info!("universe refresh job starting");
            for market in [Market::Kr, Market::Us] {
                if let Err(err) = self.refresh_universe(market).await {
                    error!(market = %market, error = %err, "universe refresh failed");
                }
            }
        }
    }

    /// Fetches the top-100-by-market-cap ranking from the broker, unions it
    /// with currently-held symbols (so a position that fell out of the
    /// top 100 is never orphaned), and swaps in the resulting universe and
    /// ranking cache for `market`. Falls back to the persisted instrument
    /// snapshot for that market when the ranking call fails or returns
    /// nothing - the closest analog this codebase has to a local
    /// master-file fallback.
    async fn refresh_universe(&self, market: Market) -> anyhow::Result<()> {
        let ranked = match self.broker.market_cap_ranking(market, MARKET_CAP_RANKING_SIZE).await {
            Ok(ranked) if !ranked.is_empty() => ranked,
            Ok(_) => {
                warn!(market = %market, "market-cap ranking returned no symbols, falling back to stored instrument snapshot");
                self.fallback_ranking(market).await?
            }
            Err(err) => {
                warn!(market = %market, error = %err, "market-cap ranking call failed, falling back to stored instrument snapshot");
                self.fallback_ranking(market).await?
            }
        };

        let held = self.portfolio.held_symbols(market).await?;
        let mut symbols: Vec<String> = ranked.clone();
        for symbol in held {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        let mut instruments = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let instrument = match self.instrument_repo.get(symbol).await? {
                Some(instrument) => instrument,
                None => {
                    let instrument = Instrument::new(symbol.clone(), market, symbol.clone());
                    self.instrument_repo.upsert(&instrument).await?;
                    instrument
                }
            };
            instruments.push(instrument);
        }

        let mut all_instruments = self
            .instrument_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|i| i.market != market)
            .collect::<Vec<_>>();
        all_instruments.extend(instruments);

        *self.universe.write().await = all_instruments;
        self.market_cap_ranks.write().await.insert(market, ranked);

        info!(market = %market, symbol_count = symbols.len(), "universe refreshed");
        Ok(())
    }

    async fn fallback_ranking(&self, market: Market) -> anyhow::Result<Vec<String>> {
        let stored = self.instrument_repo.list_by_market(market).await?;
        Ok(stored.into_iter().take(MARKET_CAP_RANKING_SIZE).map(|i| i.symbol).collect())
    }
}
