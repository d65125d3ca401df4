//! Portfolio service (C7): the authoritative view of cash and holdings
//! per market. Reconciles against the broker's account/position endpoints
//! on a schedule and serves the gating/sizing stages of the strategy
//! engine (C8) from the persisted copy in between reconciliations.

use crate::domain::instrument::Instrument;
use crate::domain::market::Market;
use crate::domain::portfolio::{CashBalance, PortfolioHolding};
use crate::domain::ports::BrokerClient;
use crate::domain::repositories::PortfolioRepository;
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct PortfolioService {
    broker: Arc<dyn BrokerClient>,
    repository: Arc<dyn PortfolioRepository>,
}

impl PortfolioService {
    pub fn new(broker: Arc<dyn BrokerClient>, repository: Arc<dyn PortfolioRepository>) -> Self {
        Self { broker, repository }
    }

    /// Reconcile cash and positions for `market` against the broker,
    /// overwriting the persisted copy. Quantity/average-price drift from
    /// partial fills outside this process (manual trades, corporate
    /// actions) is corrected here rather than accumulated incrementally.
    pub async fn reconcile(&self, market: Market, instruments: &[Instrument]) -> Result<()> {
        let cash = self.broker.cash_balance(market).await?;
        self.repository
            .upsert_cash(&CashBalance { market, amount: cash })
            .await?;

        let sector_by_symbol: HashMap<&str, _> =
            instruments.iter().map(|i| (i.symbol.as_str(), i.sector_group)).collect();

        let positions = self.broker.positions(market).await?;
        for (symbol, quantity, average_price) in positions {
            let sector_group = sector_by_symbol.get(symbol.as_str()).copied().unwrap_or(crate::domain::sector::SectorGroup::Other);
            let mut holding = self
                .repository
                .get_holding(&symbol)
                .await?
                .unwrap_or_else(|| PortfolioHolding::new(symbol.clone(), market, sector_group));
            holding.quantity = quantity;
            holding.average_price = average_price;
            self.repository.upsert_holding(&holding).await?;
        }

        info!(market = %market, "portfolio reconciled against broker");
        Ok(())
    }

    pub async fn cash_ratio(&self, market: Market) -> Result<f64> {
        let cash = self
            .repository
            .get_cash(market)
            .await?
            .map(|c| c.amount)
            .unwrap_or(Decimal::ZERO);
        let total = self.market_total_with_cash(market, cash).await?;
        if total.is_zero() {
            return Ok(1.0);
        }
        Ok((cash / total).to_string().parse::<f64>().unwrap_or(0.0))
    }

    /// That market's sub-portfolio total (cash + holdings value), never
    /// mixed with the other market's total - buy sizing is a fraction of
    /// this figure, per market.
    pub async fn market_total(&self, market: Market) -> Result<Decimal> {
        let cash = self
            .repository
            .get_cash(market)
            .await?
            .map(|c| c.amount)
            .unwrap_or(Decimal::ZERO);
        self.market_total_with_cash(market, cash).await
    }

    async fn market_total_with_cash(&self, market: Market, cash: Decimal) -> Result<Decimal> {
        let holdings = self.repository.list_holdings(market).await?;
        let holdings_value: Decimal = holdings
            .iter()
            .map(|h| h.average_price * Decimal::from(h.quantity))
            .sum();
        Ok(cash + holdings_value)
    }

    /// Symbols currently held in `market`, regardless of whether they're
    /// still in the market-cap ranking - universe refresh unions these in
    /// so a held-but-fallen-out-of-top-100 position is never orphaned.
    pub async fn held_symbols(&self, market: Market) -> Result<Vec<String>> {
        Ok(self
            .repository
            .list_holdings(market)
            .await?
            .into_iter()
            .filter(|h| h.quantity > 0)
            .map(|h| h.symbol)
            .collect())
    }

    /// Current allocation of equity value across sector groups (tech,
    /// value, financial), as fraction of total holdings value. `other`
    /// sleeve is included in the denominator but has no target, so it's
    /// excluded from the returned map.
    pub async fn sector_allocation(&self, market: Market) -> Result<HashMap<crate::domain::sector::SectorGroup, f64>> {
        let holdings = self.repository.list_holdings(market).await?;
        let total: Decimal = holdings
            .iter()
            .map(|h| h.average_price * Decimal::from(h.quantity))
            .sum();
        if total.is_zero() {
            return Ok(HashMap::new());
        }

        let mut by_group: HashMap<crate::domain::sector::SectorGroup, Decimal> = HashMap::new();
        for h in &holdings {
            *by_group.entry(h.sector_group).or_insert(Decimal::ZERO) += h.average_price * Decimal::from(h.quantity);
        }

        Ok(by_group
            .into_iter()
            .filter(|(group, _)| *group != crate::domain::sector::SectorGroup::Other)
            .map(|(group, value)| (group, (value / total).to_string().parse::<f64>().unwrap_or(0.0)))
            .collect())
    }
}
