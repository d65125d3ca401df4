//! Manual override of the DCF kernel's computed fair value, for symbols
//! where the mechanical two-stage model is known to misfire (e.g. negative
//! or non-representative FCF). Settable only via the settings store (C11);
//! when present, the strategy engine uses this instead of the computed
//! `dcf_fair_value`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DcfOverride {
    pub symbol: String,
    pub fair_value: f64,
    pub reason: String,
    pub set_by: String,
}

impl DcfOverride {
    pub fn new(symbol: impl Into<String>, fair_value: f64, reason: impl Into<String>, set_by: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            fair_value,
            reason: reason.into(),
            set_by: set_by.into(),
        }
    }
}
