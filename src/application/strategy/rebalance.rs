//! Sector rebalancing (C8, §8.4.2 cap enforcement). Runs separately from
//! the per-tick scoring loop, typically once a day: trims the single most
//! overweight holding in any sector that has drifted past its deviation
//! cap, rather than waiting for that sector's score-driven sells to
//! eventually correct it.

use crate::domain::market::Market;
use crate::domain::portfolio::PortfolioHolding;
use crate::domain::ports::{OrderRequest, OrderSide};
use crate::domain::sector::{SectorGroup, SectorGroupTargets};
use crate::domain::trade::TradeReason;
use std::collections::HashMap;

pub struct RebalancePlan {
    pub order: OrderRequest,
    pub reason: TradeReason,
}

/// Given current sector allocation and the holdings backing it, propose a
/// trim order for the largest holding in the most-overweight sector, if
/// any sector exceeds `cap_pct` deviation from its target. Returns at
/// most one plan per call; callers re-evaluate after each trim executes
/// rather than planning the whole correction up front, since a single
/// sell changes every other sector's relative weight too.
pub fn propose_trim(
    market: Market,
    sector_allocation: &HashMap<SectorGroup, f64>,
    targets: &SectorGroupTargets,
    cap_pct: f64,
    holdings: &[PortfolioHolding],
) -> Option<RebalancePlan> {
    let (worst_group, worst_deviation) = sector_allocation
        .iter()
        .filter_map(|(group, current)| targets.target_for(*group).map(|target| (*group, (*current - target) * 100.0)))
        .filter(|(_, deviation)| *deviation >= cap_pct)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let _ = worst_deviation;

    let largest = holdings
        .iter()
        .filter(|h| h.sector_group == worst_group && h.market == market && h.quantity > 0)
        .max_by_key(|h| h.quantity)?;

    let trim_quantity = (largest.quantity / 4).max(1);

    Some(RebalancePlan {
        order: OrderRequest {
            symbol: largest.symbol.clone(),
            market,
            side: OrderSide::Sell,
            quantity: trim_quantity,
            limit_price: None,
        },
        reason: TradeReason::Rebalance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trims_largest_holding_in_most_overweight_sector() {
        let mut allocation = HashMap::new();
        allocation.insert(SectorGroup::Tech, 0.70);
        allocation.insert(SectorGroup::Value, 0.20);
        allocation.insert(SectorGroup::Financial, 0.10);
        let targets = SectorGroupTargets::default();

        let mut small = PortfolioHolding::new("MSFT", Market::Us, SectorGroup::Tech);
        small.quantity = 5;
        small.average_price = dec!(300);
        let mut big = PortfolioHolding::new("AAPL", Market::Us, SectorGroup::Tech);
        big.quantity = 40;
        big.average_price = dec!(150);

        let plan = propose_trim(Market::Us, &allocation, &targets, 10.0, &[small, big]).expect("should propose trim");
        assert_eq!(plan.order.symbol, "AAPL");
        assert_eq!(plan.reason, TradeReason::Rebalance);
    }

    #[test]
    fn no_trim_when_all_sectors_within_cap() {
        let mut allocation = HashMap::new();
        allocation.insert(SectorGroup::Tech, 0.52);
        allocation.insert(SectorGroup::Value, 0.28);
        allocation.insert(SectorGroup::Financial, 0.20);
        let targets = SectorGroupTargets::default();
        assert!(propose_trim(Market::Us, &allocation, &targets, 10.0, &[]).is_none());
    }
}
