//! Trading gates (C8, §8.4.2). A score past threshold is necessary but not
//! sufficient to trade: the gates below can veto a would-be buy or sell
//! regardless of score. Each gate is a pure predicate over already-fetched
//! state so the engine can log exactly which gate blocked a signal.

use crate::domain::market::{self, Market, SessionKind};
use crate::domain::market_regime::Regime;
use crate::domain::portfolio::PortfolioHolding;
use crate::domain::sector::{SectorGroup, SectorGroupTargets};
use crate::domain::settings::Settings;
use chrono::{DateTime, NaiveDate, Utc};

use super::cooldown::CooldownTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVeto {
    MarketClosed,
    CashShortage,
    SectorCapExceeded,
    SellCooldown,
    AddBuyCooldown,
    MaxTranchesReached,
    MaxSplitsReached,
    NoPosition,
}

pub struct GateContext<'a> {
    pub market: Market,
    pub now: DateTime<Utc>,
    pub settings: &'a Settings,
    pub regime: Regime,
    pub cash_ratio: f64,
    pub sector_allocation: &'a std::collections::HashMap<SectorGroup, f64>,
    pub sector_targets: SectorGroupTargets,
    pub cooldowns: &'a CooldownTracker,
    pub today: NaiveDate,
}

/// Can a buy order be placed for `symbol` in `sector_group` right now?
/// Returns the first veto encountered, or `None` if the buy is clear to
/// proceed to sizing.
pub fn check_buy_gates(ctx: &GateContext, symbol: &str, sector_group: SectorGroup) -> Option<GateVeto> {
    if !market::is_market_open(ctx.market, ctx.now, SessionKind::Regular) {
        return Some(GateVeto::MarketClosed);
    }

    let target_cash = ctx.settings.target_cash_ratio(ctx.regime);
    if ctx.cash_ratio <= target_cash {
        return Some(GateVeto::CashShortage);
    }

    if let Some(target) = ctx.sector_targets.target_for(sector_group) {
        let current = ctx.sector_allocation.get(&sector_group).copied().unwrap_or(0.0);
        let deviation_pct = (current - target) * 100.0;
        if deviation_pct >= ctx.settings.sector_deviation_cap_pct {
            return Some(GateVeto::SectorCapExceeded);
        }
    }

    if ctx
        .cooldowns
        .add_buy_is_on_cooldown(symbol, ctx.today, ctx.settings.add_buy_cooldown_days)
    {
        return Some(GateVeto::AddBuyCooldown);
    }

    None
}

/// Can a sell order be placed against `holding` right now?
pub fn check_sell_gates(ctx: &GateContext, symbol: &str, holding: Option<&PortfolioHolding>) -> Option<GateVeto> {
    if !market::is_market_open(ctx.market, ctx.now, SessionKind::Regular) {
        return Some(GateVeto::MarketClosed);
    }

    let Some(holding) = holding else {
        return Some(GateVeto::NoPosition);
    };
    if holding.quantity <= 0 {
        return Some(GateVeto::NoPosition);
    }

    if ctx
        .cooldowns
        .sell_is_on_cooldown(symbol, ctx.today, ctx.settings.sell_cooldown_days)
    {
        return Some(GateVeto::SellCooldown);
    }

    if holding.sell_split_count >= ctx.settings.max_sell_splits {
        return Some(GateVeto::MaxSplitsReached);
    }

    None
}

/// Whether an averaging-down buy (as opposed to a fresh score-driven buy)
/// is allowed: gated additionally by the per-symbol tranche cap.
pub fn check_average_down_gates(ctx: &GateContext, symbol: &str, sector_group: SectorGroup, holding: &PortfolioHolding) -> Option<GateVeto> {
    if let Some(veto) = check_buy_gates(ctx, symbol, sector_group) {
        return Some(veto);
    }
    if holding.buy_tranche_count >= ctx.settings.max_buy_tranches {
        return Some(GateVeto::MaxTranchesReached);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Market;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn weekday_market_open_instant() -> DateTime<Utc> {
        // 2026-07-28 is a Tuesday, 15:00 UTC = 11:00 ET, well within regular hours.
        Utc.with_ymd_and_hms(2026, 7, 28, 15, 0, 0).unwrap()
    }

    #[test]
    fn cash_shortage_blocks_buy() {
        let settings = Settings::default();
        let cooldowns = CooldownTracker::new();
        let allocation = HashMap::new();
        let ctx = GateContext {
            market: Market::Us,
            now: weekday_market_open_instant(),
            settings: &settings,
            regime: Regime::Neutral,
            cash_ratio: 0.05,
            sector_allocation: &allocation,
            sector_targets: SectorGroupTargets::default(),
            cooldowns: &cooldowns,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        };
        assert_eq!(check_buy_gates(&ctx, "AAPL", SectorGroup::Tech), Some(GateVeto::CashShortage));
    }

    #[test]
    fn market_closed_blocks_both_buy_and_sell() {
        let settings = Settings::default();
        let cooldowns = CooldownTracker::new();
        let allocation = HashMap::new();
        let saturday = Utc.with_ymd_and_hms(2026, 8, 1, 15, 0, 0).unwrap();
        let ctx = GateContext {
            market: Market::Us,
            now: saturday,
            settings: &settings,
            regime: Regime::Neutral,
            cash_ratio: 0.9,
            sector_allocation: &allocation,
            sector_targets: SectorGroupTargets::default(),
            cooldowns: &cooldowns,
            today: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        };
        assert_eq!(check_buy_gates(&ctx, "AAPL", SectorGroup::Tech), Some(GateVeto::MarketClosed));
        assert_eq!(check_sell_gates(&ctx, "AAPL", None), Some(GateVeto::MarketClosed));
    }
}
