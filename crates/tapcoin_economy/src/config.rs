//! # Balance Configuration
//!
//! All balance numbers (chances, multipliers, combo window, regeneration rate,
//! rank thresholds) come from a TOML file loaded once at startup. Nothing is
//! defaulted in code: a missing key is a configuration error.
//!
//! ```toml
//! [reward]
//! base_reward_per_tap = 10
//!
//! [tiers]
//! jackpot_chance_bp = 10
//! critical_chance_bp = 500
//! normal_chance_bp = 9490
//! normal_multiplier_bp = 10000
//! critical_multiplier_bp = 30000
//! jackpot_multiplier_bp = 500000
//! # ...
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::basis_points::BasisPoints;
use crate::combo::ComboRule;
use crate::error::{EconomyError, EconomyResult};
use crate::rank::RankTable;
use crate::tier::TierTable;

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Base reward.
    pub reward: RewardConfig,
    /// Tier bands and multipliers.
    pub tiers: TierConfig,
    /// Combo window and multiplier curve.
    pub combo: ComboConfig,
    /// Energy capacity and regeneration.
    pub energy: EnergyConfig,
    /// Streak period.
    pub streak: StreakConfig,
    /// Rank thresholds, ascending.
    pub ranks: Vec<RankEntry>,
}

/// `[reward]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardConfig {
    /// Currency granted by a normal tap at combo 0.
    pub base_reward_per_tap: u64,
}

/// `[tiers]` section. Chances must sum to exactly `10_000` bp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Jackpot band width (rarest).
    pub jackpot_chance_bp: BasisPoints,
    /// Critical band width.
    pub critical_chance_bp: BasisPoints,
    /// Normal band width (remaining mass).
    pub normal_chance_bp: BasisPoints,
    /// Normal multiplier, must be exactly 1×.
    pub normal_multiplier_bp: BasisPoints,
    /// Critical multiplier, above normal.
    pub critical_multiplier_bp: BasisPoints,
    /// Jackpot multiplier, above critical.
    pub jackpot_multiplier_bp: BasisPoints,
}

/// `[combo]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComboConfig {
    /// Max gap between taps that keeps a combo alive (inclusive).
    pub window_ms: u64,
    /// Multiplier added per live combo tap.
    pub step_bp: BasisPoints,
    /// Multiplier cap.
    pub max_multiplier_bp: BasisPoints,
}

/// `[energy]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergyConfig {
    /// Capacity given to freshly created players.
    pub starting_limit: u32,
    /// Regeneration in thousandths of an energy unit per second.
    pub regen_milli_per_second: u64,
}

/// `[streak]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreakConfig {
    /// Length of one streak period (e.g. one day).
    pub period_ms: u64,
}

/// One `[[ranks]]` row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankEntry {
    /// Lifetime earnings at which this rank starts (inclusive).
    pub threshold: u64,
    /// Rank number, 1 is the entry rank.
    pub rank: u32,
    /// Badge shown next to the rank.
    pub icon: String,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfiguration`] on syntax errors, type
    /// errors (a negative energy limit included), unknown keys, or any
    /// violated balance invariant.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EconomyError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfiguration`] if the file cannot be read
    /// or fails [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            EconomyError::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            ranks = config.ranks.len(),
            "economy config loaded"
        );
        Ok(config)
    }

    /// Checks every balance invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`EconomyError::InvalidConfiguration`] found.
    pub fn validate(&self) -> EconomyResult<()> {
        self.build_tables().map(|_| ())
    }

    /// Builds the lookup tables. Building them is the validation.
    pub(crate) fn build_tables(&self) -> EconomyResult<BalanceTables> {
        let tiers = TierTable::from_config(&self.tiers)?;
        let combo = ComboRule::from_config(&self.combo)?;
        let ranks = RankTable::new(self.ranks.clone())?;

        if self.energy.starting_limit == 0 {
            return Err(EconomyError::InvalidConfiguration(
                "energy.starting_limit must be > 0".into(),
            ));
        }
        if self.energy.regen_milli_per_second == 0 {
            return Err(EconomyError::InvalidConfiguration(
                "energy.regen_milli_per_second must be > 0".into(),
            ));
        }
        if self.streak.period_ms == 0 {
            return Err(EconomyError::InvalidConfiguration(
                "streak.period_ms must be > 0".into(),
            ));
        }
        Ok(BalanceTables { tiers, combo, ranks })
    }
}

/// Tables derived from a valid [`EngineConfig`].
pub(crate) struct BalanceTables {
    pub(crate) tiers: TierTable,
    pub(crate) combo: ComboRule,
    pub(crate) ranks: RankTable,
}
