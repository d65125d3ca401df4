//! Position sizing (C8, §8.4.3). Buy quantity is a fixed fraction of that
//! market's total portfolio value (never the other market's), scaled by a
//! score-driven multiplier and divided across `split_count` tranches;
//! sells are split across the same `split_count` rather than liquidated in
//! one order, so a take-profit exit doesn't dump the whole lot into a
//! single print.

use crate::domain::portfolio::PortfolioHolding;
use crate::domain::settings::Settings;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Quantity to buy, in shares, given that market's total portfolio value,
/// the cash actually available to spend, and the current price. Returns 0
/// if the computed notional can't buy even one share and the tiny-account
/// guard doesn't apply.
pub fn buy_quantity(market_total: Decimal, available_cash: Decimal, price: Decimal, score: i32, settings: &Settings) -> i64 {
    let price_f64 = price.to_f64().unwrap_or(0.0);
    if price_f64 <= 0.0 {
        return 0;
    }

    let base_assets = market_total.to_f64().unwrap_or(0.0);
    let cash_f64 = available_cash.to_f64().unwrap_or(0.0);
    let multiplier = if score >= 90 { 2.0 } else if score >= 80 { 1.5 } else { 1.0 };
    let target_invest = base_assets * settings.per_trade_ratio * multiplier;
    let one_tranche = target_invest / settings.split_count.max(1) as f64;
    let invest = one_tranche.min(cash_f64);

    let mut quantity = (invest / price_f64).floor() as i64;
    if quantity == 0 && score >= settings.aggressive_buy_threshold && cash_f64 >= price_f64 {
        quantity = 1;
    }
    quantity
}

/// Quantity to sell for a take-profit/score-driven exit: `held_qty /
/// split_count`, floored but never less than one share.
pub fn sell_quantity_partial(holding: &PortfolioHolding, settings: &Settings) -> i64 {
    if holding.quantity <= 0 {
        return 0;
    }
    (holding.quantity / settings.split_count.max(1) as i64).max(1).min(holding.quantity)
}

/// Quantity to sell for a stop-loss exit: the full remaining position,
/// ignoring the split-sell ladder since a stop-loss dominates every other
/// signal and should not be staged across sessions.
pub fn sell_quantity_full(holding: &PortfolioHolding) -> i64 {
    holding.quantity.max(0)
}

/// Quantity to add on an averaging-down buy: sized the same way as a fresh
/// score-driven buy at the same score and market total; the existing
/// position's tranche count has already been checked by the gating stage,
/// not folded into the size itself.
pub fn average_down_quantity(market_total: Decimal, available_cash: Decimal, price: Decimal, score: i32, settings: &Settings) -> i64 {
    buy_quantity(market_total, available_cash, price, score, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Market;
    use crate::domain::sector::SectorGroup;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_quantity_divides_market_total_across_splits() {
        let settings = Settings::default();
        // base_assets=1_000_000, ratio=0.05, multiplier=1.0 => target=50_000
        // one_tranche = 50_000/3 = 16_666.67, invest=min(16_666.67, cash)
        let qty = buy_quantity(dec!(1_000_000), dec!(100_000), dec!(100), 20, &settings);
        assert_eq!(qty, 166); // floor(16_666.67 / 100)
    }

    #[test]
    fn buy_quantity_is_capped_by_available_cash() {
        let settings = Settings::default();
        let qty = buy_quantity(dec!(1_000_000), dec!(500), dec!(100), 20, &settings);
        assert_eq!(qty, 5); // invest capped at cash=500, floor(500/100)
    }

    #[test]
    fn tiny_account_guard_rounds_up_to_one_share() {
        let settings = Settings::default();
        // target/tranche notional is too small to buy a single $100 share,
        // but cash covers it and score clears the aggressive-buy threshold.
        let qty = buy_quantity(dec!(1000), dec!(100), dec!(100), 90, &settings);
        assert_eq!(qty, 1);
    }

    #[test]
    fn sell_quantity_partial_never_exceeds_holding() {
        let settings = Settings::default();
        let mut holding = PortfolioHolding::new("AAPL", Market::Us, SectorGroup::Tech);
        holding.quantity = 10;
        let qty = sell_quantity_partial(&holding, &settings);
        assert!(qty > 0 && qty <= holding.quantity);
    }

    #[test]
    fn sell_quantity_partial_floors_but_never_zero() {
        let settings = Settings::default();
        let mut holding = PortfolioHolding::new("AAPL", Market::Us, SectorGroup::Tech);
        holding.quantity = 2; // 2/3 floors to 0, guarded up to 1
        assert_eq!(sell_quantity_partial(&holding, &settings), 1);
    }

    #[test]
    fn stop_loss_sells_entire_position() {
        let mut holding = PortfolioHolding::new("AAPL", Market::Us, SectorGroup::Tech);
        holding.quantity = 37;
        assert_eq!(sell_quantity_full(&holding), 37);
    }
}
