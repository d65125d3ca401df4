//! Tick strategy orchestrator (C8): the top of the strategy stack. Called
//! once per tick interval by the scheduler (C9) for each market in turn.
//! Evaluates every ready symbol in the universe against `engine::evaluate`,
//! submits at most one order per symbol, persists the resulting trade, and
//! notifies on both fills and gate vetoes worth an operator's attention.

use crate::application::macro_provider::MacroProvider;
use crate::application::portfolio_service::PortfolioService;
use crate::application::ticker_cache::TickerStateCache;
use crate::domain::instrument::Instrument;
use crate::domain::market::Market;
use crate::domain::ports::{BrokerClient, Notifier, OrderRequest};
use crate::domain::repositories::{PortfolioRepository, TradeRepository};
use crate::domain::settings::Settings;
use crate::domain::trade::{TradeRecord, TradeReason, TradeSide};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::cooldown::CooldownTracker;
use super::engine::{self, Decision, TickInput};
use super::rebalance;

pub struct TickStrategy {
    cache: Arc<TickerStateCache>,
    broker: Arc<dyn BrokerClient>,
    portfolio: Arc<PortfolioService>,
    portfolio_repo: Arc<dyn PortfolioRepository>,
    trades: Arc<dyn TradeRepository>,
    macro_provider: Arc<MacroProvider>,
    notifier: Arc<dyn Notifier>,
    cooldowns: tokio::sync::Mutex<CooldownTracker>,
}

impl TickStrategy {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<TickerStateCache>,
        broker: Arc<dyn BrokerClient>,
        portfolio: Arc<PortfolioService>,
        portfolio_repo: Arc<dyn PortfolioRepository>,
        trades: Arc<dyn TradeRepository>,
        macro_provider: Arc<MacroProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cache,
            broker,
            portfolio,
            portfolio_repo,
            trades,
            macro_provider,
            notifier,
            cooldowns: tokio::sync::Mutex::new(CooldownTracker::new()),
        }
    }

    /// One tick cycle over `universe` (already filtered to `market`).
    /// `top_10_symbols` is the market-cap leaderboard, recomputed once per
    /// daily sync and passed in rather than derived here.
    pub async fn run_tick(&self, market: Market, universe: &[Instrument], settings: &Settings, top_10_symbols: &[String]) -> Result<()> {
        let regime = self.macro_provider.latest().await?;
        let cash_ratio = self.portfolio.cash_ratio(market).await?;
        let sector_allocation = self.portfolio.sector_allocation(market).await?;
        let market_total = self.portfolio.market_total(market).await?;
        let cash_available = self
            .portfolio_repo
            .get_cash(market)
            .await?
            .map(|c| c.amount)
            .unwrap_or(rust_decimal::Decimal::ZERO);
        let now = Utc::now();
        let today = now.date_naive();

        let mut fired: Vec<(String, Decision)> = Vec::new();
        {
            let cooldowns = self.cooldowns.lock().await;
            for instrument in universe.iter().filter(|i| i.market == market) {
                let Some(state) = self.cache.get(&instrument.symbol).await else {
                    continue;
                };
                let holding = self.portfolio_repo.get_holding(&instrument.symbol).await?;

                let input = TickInput {
                    instrument,
                    state: &state,
                    holding: holding.as_ref(),
                    regime: regime.as_ref(),
                    cash_available,
                    market_total,
                    cash_ratio,
                    sector_allocation: &sector_allocation,
                    is_top_10_by_market_cap: top_10_symbols.iter().any(|s| s == &instrument.symbol),
                    settings,
                    cooldowns: &cooldowns,
                    now,
                    today,
                };

                if let Some(decision) = engine::evaluate(&input) {
                    fired.push((instrument.symbol.clone(), decision));
                }
            }
        }

        if !fired.is_empty() {
            let mut cooldowns = self.cooldowns.lock().await;
            for (symbol, decision) in &fired {
                match decision.reason {
                    TradeReason::TakeProfit | TradeReason::StopLoss | TradeReason::Rebalance => {
                        cooldowns.record_sell(symbol, today)
                    }
                    TradeReason::AverageDown => cooldowns.record_add_buy(symbol, today),
                    TradeReason::ScoreBuy => {}
                }
            }
        }

        for (_, decision) in fired {
            self.execute(market, decision).await?;
        }

        Ok(())
    }

    /// Sector-cap enforcement (C8 §8.4.2), run on its own daily/weekly
    /// cadence by the scheduler rather than every tick: trims at most one
    /// overweight holding per call, since a single sell shifts every other
    /// sector's relative weight too.
    pub async fn run_rebalance(&self, market: Market, settings: &Settings) -> Result<()> {
        let sector_allocation = self.portfolio.sector_allocation(market).await?;
        let holdings = self.portfolio_repo.list_holdings(market).await?;
        let targets = crate::domain::sector::SectorGroupTargets::default();

        let Some(plan) = rebalance::propose_trim(market, &sector_allocation, &targets, settings.sector_deviation_cap_pct, &holdings) else {
            return Ok(());
        };

        let symbol = plan.order.symbol.clone();
        match self.place_and_record(market, plan.order, plan.reason, 0, TradeSide::Sell).await {
            Ok(()) => {}
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "rebalance trim failed");
                let _ = self.notifier.notify(&format!("rebalance trim failed for {symbol}: {err}")).await;
            }
        }
        Ok(())
    }

    /// Hourly portfolio summary (C10), formatted and handed to the
    /// notifier as a single plain-text message.
    pub async fn send_hourly_report(&self, market: Market) -> Result<()> {
        let cash = self.portfolio_repo.get_cash(market).await?.map(|c| c.amount).unwrap_or(rust_decimal::Decimal::ZERO);
        let holdings = self.portfolio_repo.list_holdings(market).await?;
        let holdings_value: rust_decimal::Decimal = holdings.iter().map(|h| h.average_price * rust_decimal::Decimal::from(h.quantity)).sum();

        let mut lines = vec![format!("[{market}] hourly portfolio report"), format!("cash: {cash}, positions value: {holdings_value}")];
        for h in holdings.iter().filter(|h| h.quantity > 0) {
            lines.push(format!("  {} x{} @ avg {}", h.symbol, h.quantity, h.average_price));
        }

        let _ = self.notifier.notify(&lines.join("\n")).await;
        Ok(())
    }

    async fn execute(&self, market: Market, decision: Decision) -> Result<()> {
        let Decision { order, reason, score } = decision;
        let symbol = order.symbol.clone();
        let side = match order.side {
            crate::domain::ports::OrderSide::Buy => TradeSide::Buy,
            crate::domain::ports::OrderSide::Sell => TradeSide::Sell,
        };

        match self.place_and_record(market, order, reason, score, side).await {
            Ok(()) => {}
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "order placement failed");
                let _ = self.notifier.notify(&format!("order failed for {symbol}: {err}")).await;
            }
        }
        Ok(())
    }

    async fn place_and_record(&self, market: Market, order: OrderRequest, reason: TradeReason, score: i32, side: TradeSide) -> Result<()> {
        let symbol = order.symbol.clone();
        let quantity = order.quantity;
        let confirmation = self.broker.place_order(order).await?;

        let record = TradeRecord::new(
            symbol.clone(),
            market,
            side,
            reason,
            confirmation.filled_quantity,
            confirmation.fill_price,
            score,
            confirmation.filled_at,
        );
        self.trades.insert(&record).await?;

        info!(
            symbol = %symbol,
            side = %side,
            reason = %reason,
            quantity,
            fill_price = %confirmation.fill_price,
            score,
            "order filled"
        );
        let _ = self
            .notifier
            .notify(&format!("{side} {quantity} {symbol} @ {} ({reason}, score {score})", confirmation.fill_price))
            .await;

        Ok(())
    }
}

