//! Sector groups used by the allocation/rebalancing gates. Every instrument
//! maps to exactly one of these; target weights live in Settings (C11).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorGroup {
    Tech,
    Value,
    Financial,
    Other,
}

impl fmt::Display for SectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectorGroup::Tech => "tech",
            SectorGroup::Value => "value",
            SectorGroup::Financial => "financial",
            SectorGroup::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SectorGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tech" => Ok(SectorGroup::Tech),
            "value" => Ok(SectorGroup::Value),
            "financial" => Ok(SectorGroup::Financial),
            "other" => Ok(SectorGroup::Other),
            other => anyhow::bail!("invalid sector group: {other}"),
        }
    }
}

impl SectorGroup {
    pub fn from_sector_name(sector: &str) -> Self {
        let lower = sector.to_lowercase();
        if lower.contains("tech") || lower.contains("semiconductor") || lower.contains("software") {
            SectorGroup::Tech
        } else if lower.contains("financ") || lower.contains("bank") || lower.contains("insurance") {
            SectorGroup::Financial
        } else if lower.contains("value")
            || lower.contains("energy")
            || lower.contains("material")
            || lower.contains("industrial")
            || lower.contains("consumer")
        {
            SectorGroup::Value
        } else {
            SectorGroup::Other
        }
    }
}

/// Default target weights of the equity portion: tech 50%, value 30%,
/// financial 20%. `other` has no explicit target (it is not a managed
/// sleeve); deviation is judged only for the three named groups.
#[derive(Debug, Clone, Copy)]
pub struct SectorGroupTargets {
    pub tech: f64,
    pub value: f64,
    pub financial: f64,
}

impl Default for SectorGroupTargets {
    fn default() -> Self {
        Self {
            tech: 0.50,
            value: 0.30,
            financial: 0.20,
        }
    }
}

impl SectorGroupTargets {
    pub fn target_for(&self, group: SectorGroup) -> Option<f64> {
        match group {
            SectorGroup::Tech => Some(self.tech),
            SectorGroup::Value => Some(self.value),
            SectorGroup::Financial => Some(self.financial),
            SectorGroup::Other => None,
        }
    }
}
