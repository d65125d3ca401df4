//! Immutable trade record. Written once per fill by the strategy engine
//! (C8) after a broker order confirmation; never mutated afterward.

use crate::domain::market::Market;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => anyhow::bail!("invalid trade side: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeReason {
    ScoreBuy,
    AverageDown,
    TakeProfit,
    StopLoss,
    Rebalance,
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeReason::ScoreBuy => "score_buy",
            TradeReason::AverageDown => "average_down",
            TradeReason::TakeProfit => "take_profit",
            TradeReason::StopLoss => "stop_loss",
            TradeReason::Rebalance => "rebalance",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TradeReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score_buy" => Ok(TradeReason::ScoreBuy),
            "average_down" => Ok(TradeReason::AverageDown),
            "take_profit" => Ok(TradeReason::TakeProfit),
            "stop_loss" => Ok(TradeReason::StopLoss),
            "rebalance" => Ok(TradeReason::Rebalance),
            other => anyhow::bail!("invalid trade reason: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub id: Uuid,
    pub symbol: String,
    pub market: Market,
    pub side: TradeSide,
    pub reason: TradeReason,
    pub quantity: i64,
    pub price: Decimal,
    pub score_at_trade: i32,
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(
        symbol: impl Into<String>,
        market: Market,
        side: TradeSide,
        reason: TradeReason,
        quantity: i64,
        price: Decimal,
        score_at_trade: i32,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            market,
            side,
            reason,
            quantity,
            price,
            score_at_trade,
            executed_at,
        }
    }

    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
