//! Portfolio state: one cash balance per market, plus per-symbol holdings.
//! Cash non-negativity and sector caps are enforced by the gating layer
//! (application::strategy::gating), not here — this module is pure state.

use crate::domain::market::Market;
use crate::domain::sector::SectorGroup;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashBalance {
    pub market: Market,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioHolding {
    pub symbol: String,
    pub market: Market,
    pub sector_group: SectorGroup,
    pub quantity: i64,
    pub average_price: Decimal,
    /// Running count of buy fills since the position was opened; drives the
    /// tranche-based position sizing formula.
    pub buy_tranche_count: u32,
    /// Running count of partial take-profit sells; drives split-count sell
    /// sizing so repeated take-profits shrink the remaining lot.
    pub sell_split_count: u32,
}

impl PortfolioHolding {
    pub fn new(symbol: impl Into<String>, market: Market, sector_group: SectorGroup) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            sector_group,
            quantity: 0,
            average_price: Decimal::ZERO,
            buy_tranche_count: 0,
            sell_split_count: 0,
        }
    }

    pub fn market_value(&self, current_price: Decimal) -> Decimal {
        current_price * Decimal::from(self.quantity)
    }

    pub fn cost_basis(&self) -> Decimal {
        self.average_price * Decimal::from(self.quantity)
    }

    pub fn unrealized_pnl_pct(&self, current_price: Decimal) -> Option<f64> {
        if self.average_price.is_zero() {
            return None;
        }
        let pct = (current_price - self.average_price) / self.average_price * Decimal::ONE_HUNDRED;
        pct.to_string().parse::<f64>().ok()
    }

    /// Fold a buy fill into the running average price and bump the tranche
    /// counter. Selling down to zero resets both counters on the caller side.
    pub fn apply_buy_fill(&mut self, quantity: i64, fill_price: Decimal) {
        let new_quantity = self.quantity + quantity;
        if new_quantity > 0 {
            let total_cost = self.cost_basis() + fill_price * Decimal::from(quantity);
            self.average_price = total_cost / Decimal::from(new_quantity);
        }
        self.quantity = new_quantity;
        self.buy_tranche_count += 1;
    }

    /// Fold a sell fill; average price is unchanged by a sell. Returns the
    /// realized quantity sold.
    pub fn apply_sell_fill(&mut self, quantity: i64) {
        self.quantity = (self.quantity - quantity).max(0);
        if self.quantity == 0 {
            self.buy_tranche_count = 0;
            self.sell_split_count = 0;
            self.average_price = Decimal::ZERO;
        } else {
            self.sell_split_count += 1;
        }
    }
}
