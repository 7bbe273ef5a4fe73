//! Tier speed table.
//!
//! Pure configuration data: each tier maps to a fixed progress increment per
//! tick and a transfer rate per tick. Nothing else couples segments of
//! different tiers.

use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Discrete speed class of a segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    Basic,
    Improved,
    Advanced,
    Ultimate,
}

impl Tier {
    /// All tiers, slowest first.
    pub const ALL: [Tier; 4] = [Tier::Basic, Tier::Improved, Tier::Advanced, Tier::Ultimate];

    /// Progress gained by a moving cargo unit each tick.
    pub fn step(self) -> Fixed64 {
        match self {
            Tier::Basic => Fixed64::from_bits(1 << 29),    // 0.125
            Tier::Improved => Fixed64::from_bits(1 << 30), // 0.25
            Tier::Advanced => Fixed64::from_bits(1 << 31), // 0.5
            Tier::Ultimate => Fixed64::ONE,
        }
    }

    /// Units offered per transfer attempt (teleport sends and extraction pulls).
    pub fn transfer_rate(self) -> u32 {
        match self {
            Tier::Basic => 8,
            Tier::Improved => 16,
            Tier::Advanced => 32,
            Tier::Ultimate => 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Data loader (optional)
// ---------------------------------------------------------------------------

/// Errors raised by the JSON tier-table loader.
#[cfg(feature = "data-loader")]
#[derive(Debug, thiserror::Error)]
pub enum TierConfigError {
    #[error("json parse failed: {0}")]
    Parse(String),
    #[error("unknown tier name: {0}")]
    UnknownTier(String),
    #[error("tier {0}: progress step must be positive, got {1}")]
    BadStep(String, f64),
    #[error("tier {0}: transfer rate must be positive")]
    BadRate(String),
}

/// One loaded tier row.
#[cfg(feature = "data-loader")]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TierRow {
    pub tier: String,
    pub step: f64,
    pub transfer_rate: u32,
}

/// A tier table loaded from configuration data, overriding the built-in rows.
#[cfg(feature = "data-loader")]
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    steps: [Fixed64; 4],
    rates: [u32; 4],
}

#[cfg(feature = "data-loader")]
impl TierTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        let mut steps = [Fixed64::ZERO; 4];
        let mut rates = [0u32; 4];
        for (i, tier) in Tier::ALL.into_iter().enumerate() {
            steps[i] = tier.step();
            rates[i] = tier.transfer_rate();
        }
        TierTable { steps, rates }
    }

    /// Parse a JSON array of rows. Rows override the built-in table; tiers
    /// not mentioned keep their built-in values.
    pub fn from_json(json: &str) -> Result<Self, TierConfigError> {
        let rows: Vec<TierRow> =
            serde_json::from_str(json).map_err(|e| TierConfigError::Parse(e.to_string()))?;
        let mut table = TierTable::builtin();
        for row in rows {
            let idx = match row.tier.as_str() {
                "basic" => 0,
                "improved" => 1,
                "advanced" => 2,
                "ultimate" => 3,
                other => return Err(TierConfigError::UnknownTier(other.to_string())),
            };
            if row.step <= 0.0 {
                return Err(TierConfigError::BadStep(row.tier, row.step));
            }
            if row.transfer_rate == 0 {
                return Err(TierConfigError::BadRate(row.tier));
            }
            table.steps[idx] = Fixed64::from_num(row.step);
            table.rates[idx] = row.transfer_rate;
        }
        Ok(table)
    }

    pub fn step(&self, tier: Tier) -> Fixed64 {
        self.steps[tier as usize]
    }

    pub fn transfer_rate(&self, tier: Tier) -> u32 {
        self.rates[tier as usize]
    }
}

// ===========================================================================
// Tests
// ===========================================================================
