//! Strategy engine (C8): wires the composite score, the trading gates,
//! and position sizing into a single per-symbol decision. Called once per
//! symbol per tick cycle by `tick_strategy`; each decision is either a
//! no-op or a single `OrderRequest` plus the `TradeReason` that produced
//! it, left to the caller to submit and persist.

use crate::domain::instrument::Instrument;
use crate::domain::market_regime::MarketRegimeSnapshot;
use crate::domain::portfolio::PortfolioHolding;
use crate::domain::ports::{OrderRequest, OrderSide};
use crate::domain::settings::Settings;
use crate::domain::ticker_state::TickerState;
use crate::domain::trade::TradeReason;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::cooldown::CooldownTracker;
use super::gating::{self, GateContext, GateVeto};
use super::scoring::{self, ScoreBreakdown};
use super::sizing;

#[derive(Debug, Clone)]
pub struct Decision {
    pub order: OrderRequest,
    pub reason: TradeReason,
    pub score: i32,
}

pub struct TickInput<'a> {
    pub instrument: &'a Instrument,
    pub state: &'a TickerState,
    pub holding: Option<&'a PortfolioHolding>,
    pub regime: Option<&'a MarketRegimeSnapshot>,
    pub cash_available: Decimal,
    /// Total value (cash + holdings) of the instrument's own market's
    /// sub-portfolio; buy sizing is a fraction of this, never the other
    /// market's total.
    pub market_total: Decimal,
    pub cash_ratio: f64,
    pub sector_allocation: &'a HashMap<crate::domain::sector::SectorGroup, f64>,
    pub is_top_10_by_market_cap: bool,
    pub settings: &'a Settings,
    pub cooldowns: &'a CooldownTracker,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

/// Evaluate one symbol against its current state and the portfolio's
/// broader context, returning at most one order. Stop-loss and
/// take-profit are evaluated ahead of the score-threshold checks since
/// they must fire regardless of score once in effect.
pub fn evaluate(input: &TickInput) -> Option<Decision> {
    if !input.state.is_ready {
        return None;
    }

    let regime = input.regime.map(|r| r.regime).unwrap_or(crate::domain::market_regime::Regime::Neutral);
    let sector_targets = scoring::default_sector_targets();
    let gate_ctx = GateContext {
        market: input.instrument.market,
        now: input.now,
        settings: input.settings,
        regime,
        cash_ratio: input.cash_ratio,
        sector_allocation: input.sector_allocation,
        sector_targets,
        cooldowns: input.cooldowns,
        today: input.today,
    };

    let breakdown = build_breakdown(input);
    let score = breakdown.total();

    if let Some(holding) = input.holding
        && holding.quantity > 0
        && let Some(pnl_pct) = holding.unrealized_pnl_pct(input.state.current_price)
    {
        if pnl_pct <= input.settings.stop_loss_pct {
            if gating::check_sell_gates(&gate_ctx, &input.instrument.symbol, input.holding).is_none() {
                let quantity = sizing::sell_quantity_full(holding);
                return sell_decision(input, quantity, TradeReason::StopLoss, score);
            }
            return None;
        }

        if pnl_pct >= input.settings.take_profit_pct
            && gating::check_sell_gates(&gate_ctx, &input.instrument.symbol, input.holding).is_none()
        {
            let quantity = sizing::sell_quantity_partial(holding, input.settings);
            return sell_decision(input, quantity, TradeReason::TakeProfit, score);
        }

        if pnl_pct <= input.settings.average_down_drawdown_pct && input.state.rsi < 35.0 {
            let veto = gating::check_average_down_gates(&gate_ctx, &input.instrument.symbol, input.instrument.sector_group, holding);
            if veto.is_none() {
                let quantity = sizing::average_down_quantity(input.market_total, input.cash_available, input.state.current_price, score, input.settings);
                if quantity > 0 {
                    return buy_decision(input, quantity, TradeReason::AverageDown, score);
                }
            }
        }
    }

    if score <= input.settings.buy_threshold_max && input.holding.is_none_or(|h| h.quantity <= 0) {
        if gating::check_buy_gates(&gate_ctx, &input.instrument.symbol, input.instrument.sector_group).is_none() {
            let quantity = sizing::buy_quantity(input.market_total, input.cash_available, input.state.current_price, score, input.settings);
            if quantity > 0 {
                return buy_decision(input, quantity, TradeReason::ScoreBuy, score);
            }
        }
    } else if score >= input.settings.sell_threshold_min
        && let Some(holding) = input.holding
        && holding.quantity > 0
        && gating::check_sell_gates(&gate_ctx, &input.instrument.symbol, input.holding).is_none()
    {
        let quantity = sizing::sell_quantity_partial(holding, input.settings);
        if quantity > 0 {
            return sell_decision(input, quantity, TradeReason::Rebalance, score);
        }
    }

    None
}

fn build_breakdown(input: &TickInput) -> ScoreBreakdown {
    let ema_anchor = input
        .state
        .ema
        .get(&200)
        .or_else(|| input.state.ema.get(&120))
        .or_else(|| input.state.ema.get(&60))
        .copied();

    let deviation_pct = scoring::default_sector_targets()
        .target_for(input.instrument.sector_group)
        .map(|target| {
            let current = input.sector_allocation.get(&input.instrument.sector_group).copied().unwrap_or(0.0);
            (current - target) * 100.0
        })
        .unwrap_or(0.0);

    ScoreBreakdown {
        rsi_delta: scoring::rsi_delta(input.state.rsi),
        intraday_change_delta: scoring::intraday_change_delta(input.state.change_rate),
        ema200_support_delta: scoring::ema200_support_delta(input.state.current_price, ema_anchor),
        dcf_valuation_delta: scoring::dcf_valuation_delta(input.state.current_price, input.state.dcf_value),
        position_delta: scoring::position_delta(
            input.holding,
            input.state.current_price,
            input.settings.take_profit_pct,
            input.settings.stop_loss_pct,
            input.settings.average_down_drawdown_pct,
        ),
        regime_delta: scoring::regime_delta(input.regime),
        target_price_delta: scoring::target_price_delta(input.state),
        market_cap_rank_delta: scoring::market_cap_rank_delta(input.is_top_10_by_market_cap),
        sector_deviation_delta: scoring::sector_deviation_delta(deviation_pct, input.settings.sector_deviation_cap_pct),
        cash_shortage_delta: scoring::cash_shortage_delta(
            input.cash_ratio,
            input.settings.target_cash_ratio(input.regime.map(|r| r.regime).unwrap_or(crate::domain::market_regime::Regime::Neutral)),
        ),
    }
}

fn buy_decision(input: &TickInput, quantity: i64, reason: TradeReason, score: i32) -> Option<Decision> {
    Some(Decision {
        order: OrderRequest {
            symbol: input.instrument.symbol.clone(),
            market: input.instrument.market,
            side: OrderSide::Buy,
            quantity,
            limit_price: None,
        },
        reason,
        score,
    })
}

fn sell_decision(input: &TickInput, quantity: i64, reason: TradeReason, score: i32) -> Option<Decision> {
    if quantity <= 0 {
        return None;
    }
    Some(Decision {
        order: OrderRequest {
            symbol: input.instrument.symbol.clone(),
            market: input.instrument.market,
            side: OrderSide::Sell,
            quantity,
            limit_price: None,
        },
        reason,
        score,
    })
}

#[allow(dead_code)]
fn veto_reason(veto: GateVeto) -> &'static str {
    match veto {
        GateVeto::MarketClosed => "market closed",
        GateVeto::CashShortage => "cash shortage",
        GateVeto::SectorCapExceeded => "sector cap exceeded",
        GateVeto::SellCooldown => "sell cooldown active",
        GateVeto::AddBuyCooldown => "add-buy cooldown active",
        GateVeto::MaxTranchesReached => "max buy tranches reached",
        GateVeto::MaxSplitsReached => "max sell splits reached",
        GateVeto::NoPosition => "no open position",
    }
}
