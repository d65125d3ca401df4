//! Instrument — identifier, market, and broker routing metadata.
//! Created on first encounter, updated by universe refresh, never deleted.

use crate::domain::market::Market;
use crate::domain::sector::SectorGroup;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub market: Market,
    pub exchange_code: String,
    pub display_name: String,
    pub sector: String,
    pub sector_group: SectorGroup,
    /// Broker routing metadata: REST endpoint path for this instrument's
    /// venue, looked up via the `api_transactions` table.
    pub routing_endpoint: String,
    /// Broker transaction id (tr_id) for order placement on this venue.
    pub routing_tr_id: String,
    /// Broker market code (e.g. exchange id for overseas orders).
    pub routing_market_code: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, market: Market, display_name: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            symbol,
            market,
            exchange_code: String::new(),
            display_name: display_name.into(),
            sector: "Unknown".to_string(),
            sector_group: SectorGroup::Other,
            routing_endpoint: String::new(),
            routing_tr_id: String::new(),
            routing_market_code: String::new(),
        }
    }
}
