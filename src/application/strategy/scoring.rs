//! Composite scoring engine (C8, §8.4.1). Produces an integer score in
//! `[0, 100]` by folding signal deltas onto a neutral baseline of 50; the
//! gating stage compares this against the buy/sell thresholds in
//! `Settings`. Every delta is a named, independently testable branch so a
//! reviewer can see exactly which signals pushed the score where.

use crate::domain::market_regime::MarketRegimeSnapshot;
use crate::domain::portfolio::PortfolioHolding;
use crate::domain::sector::SectorGroupTargets;
use crate::domain::ticker_state::TickerState;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const BASELINE_SCORE: i32 = 50;

#[derive(Debug, Clone, Default)]
pub struct ScoreBreakdown {
    pub rsi_delta: i32,
    pub intraday_change_delta: i32,
    pub ema200_support_delta: i32,
    pub dcf_valuation_delta: i32,
    pub position_delta: i32,
    pub regime_delta: i32,
    pub target_price_delta: i32,
    pub market_cap_rank_delta: i32,
    pub sector_deviation_delta: i32,
    pub cash_shortage_delta: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        (BASELINE_SCORE
            + self.rsi_delta
            + self.intraday_change_delta
            + self.ema200_support_delta
            + self.dcf_valuation_delta
            + self.position_delta
            + self.regime_delta
            + self.target_price_delta
            + self.market_cap_rank_delta
            + self.sector_deviation_delta
            + self.cash_shortage_delta)
            .clamp(0, 100)
    }
}

/// RSI delta: oversold (<30) pushes the score down toward buy, overbought
/// (>70) pushes it up toward sell, linearly scaled so a deeply
/// oversold/overbought reading carries more weight than a borderline one.
pub fn rsi_delta(rsi: f64) -> i32 {
    if rsi <= 0.0 {
        return 0;
    }
    if rsi < 30.0 {
        -((((30.0 - rsi) / 30.0) * 20.0).round() as i32)
    } else if rsi > 70.0 {
        (((rsi - 70.0) / 30.0) * 20.0).round() as i32
    } else {
        0
    }
}

/// Sharp intraday drops are a buy signal (panic-sell overreaction, score
/// down), sharp rallies a sell signal (momentum exhaustion, score up),
/// capped at +/-10.
pub fn intraday_change_delta(change_rate_pct: f64) -> i32 {
    if change_rate_pct <= -3.0 {
        -10
    } else if change_rate_pct >= 5.0 {
        10
    } else {
        0
    }
}

/// Price holding above its 200-day EMA (or longest available fallback) is
/// a structural support signal (score down, buy-leaning); price below it
/// is a warning (score up, sell-leaning).
pub fn ema200_support_delta(current_price: Decimal, ema_anchor: Option<f64>) -> i32 {
    let Some(anchor) = ema_anchor else { return 0 };
    let price = current_price.to_f64().unwrap_or(0.0);
    if price >= anchor {
        -5
    } else {
        5
    }
}

/// DCF fair value vs current price: a large discount is a buy signal
/// (score down), a large premium a sell signal (score up).
pub fn dcf_valuation_delta(current_price: Decimal, dcf_fair_value: Option<f64>) -> i32 {
    let Some(fair_value) = dcf_fair_value else { return 0 };
    if fair_value <= 0.0 {
        return 0;
    }
    let price = current_price.to_f64().unwrap_or(0.0);
    let discount = (fair_value - price) / fair_value;
    if discount >= 0.30 {
        -15
    } else if discount >= 0.15 {
        -8
    } else if discount <= -0.30 {
        15
    } else if discount <= -0.15 {
        8
    } else {
        0
    }
}

/// Position-aware delta: a holding down `average_down_drawdown_pct` or
/// worse gets a small push down to average down (gated further by RSI in
/// `gating`); a holding up `take_profit_pct` or more gets a strong push up
/// to sell; a holding down `stop_loss_pct` or worse gets a dominant push
/// up to sell that overrides most other deltas.
pub fn position_delta(
    holding: Option<&PortfolioHolding>,
    current_price: Decimal,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    average_down_drawdown_pct: f64,
) -> i32 {
    let Some(holding) = holding else { return 0 };
    if holding.quantity <= 0 {
        return 0;
    }
    let Some(pnl_pct) = holding.unrealized_pnl_pct(current_price) else {
        return 0;
    };

    if pnl_pct <= stop_loss_pct {
        40
    } else if pnl_pct >= take_profit_pct {
        -35
    } else if pnl_pct <= average_down_drawdown_pct {
        -10
    } else {
        0
    }
}

/// Macro regime delta: bull regime with low VIX ("complacent market")
/// gives a modest buy tilt (score down); a VIX fear spike gives a modest
/// sell tilt (score up).
pub fn regime_delta(regime: Option<&MarketRegimeSnapshot>) -> i32 {
    let Some(regime) = regime else { return 0 };
    if regime.is_fear_spike() {
        10
    } else if regime.is_complacent() {
        -15
    } else {
        0
    }
}

/// Whether the ticker's current price has crossed its precomputed target
/// buy/sell price (EMA-anchor-derived, see `FinancialSnapshot::to_ticker_state`).
pub fn target_price_delta(state: &TickerState) -> i32 {
    let mut delta = 0;
    if let Some(target_buy) = state.target_buy_price
        && state.current_price <= target_buy
    {
        delta -= 10;
    }
    if let Some(target_sell) = state.target_sell_price
        && state.current_price >= target_sell
    {
        delta += 10;
    }
    delta
}

/// Top-10-by-market-cap instruments get a small stability bonus (score
/// down, buy-leaning).
pub fn market_cap_rank_delta(is_top_10_by_market_cap: bool) -> i32 {
    if is_top_10_by_market_cap { -5 } else { 0 }
}

/// Buying further into an already-overweight sector is discouraged (score
/// up, sell-leaning); buying into an underweight sector is encouraged
/// (score down, buy-leaning). `deviation_pct` is `current_weight -
/// target_weight`, in percentage points.
pub fn sector_deviation_delta(deviation_pct: f64, cap_pct: f64) -> i32 {
    if deviation_pct >= cap_pct {
        10
    } else if deviation_pct <= -cap_pct {
        -5
    } else {
        0
    }
}

/// A market running low on cash (below half its target ratio) discourages
/// further buying (score up) regardless of how attractive the signal
/// otherwise is.
pub fn cash_shortage_delta(cash_ratio: f64, target_cash_ratio: f64) -> i32 {
    if cash_ratio < target_cash_ratio * 0.5 {
        15
    } else {
        0
    }
}

/// Default target weight lookup, exposed so callers building a
/// `ScoreBreakdown` don't need to import `sector.rs` separately.
pub fn default_sector_targets() -> SectorGroupTargets {
    SectorGroupTargets::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rsi_delta_pushes_buy_when_oversold() {
        assert!(rsi_delta(20.0) < 0);
        assert!(rsi_delta(80.0) > 0);
        assert_eq!(rsi_delta(50.0), 0);
    }

    #[test]
    fn stop_loss_dominates_take_profit_and_average_down() {
        let mut holding = PortfolioHolding::new("AAPL", crate::domain::market::Market::Us, crate::domain::sector::SectorGroup::Tech);
        holding.quantity = 10;
        holding.average_price = dec!(100);
        let delta = position_delta(Some(&holding), dec!(90), 15.0, -8.0, -5.0);
        assert_eq!(delta, 40);
    }

    #[test]
    fn score_is_clamped_to_0_100() {
        let mut breakdown = ScoreBreakdown::default();
        breakdown.rsi_delta = 1000;
        assert_eq!(breakdown.total(), 100);
        breakdown.rsi_delta = -1000;
        assert_eq!(breakdown.total(), 0);
    }
}
