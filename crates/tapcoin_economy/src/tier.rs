//! # Tier Roll
//!
//! **O(1) tier classification over an exact partition of the roll space**
//!
//! Every successful tap draws one roll in `[0, 10_000)` basis points and lands
//! in exactly one band, rarest first:
//!
//! ```text
//! 0                 jackpot         jackpot+critical                 10_000
//! ├────────────────────┼──────────────────┼──────────────────────────────┤
//! │      JACKPOT       │     CRITICAL     │            NORMAL            │
//! └────────────────────┴──────────────────┴──────────────────────────────┘
//! ```
//!
//! The bands must sum to exactly `10_000`; anything else is rejected when the
//! table is built, so no roll can fall into a gap or two bands at once.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::basis_points::{BasisPoints, BP_SCALE};
use crate::config::TierConfig;
use crate::error::{EconomyError, EconomyResult};

/// Reward tier of a single tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TapTier {
    /// Base reward.
    Normal = 0,
    /// Moderate rarity, moderate multiplier.
    Critical = 1,
    /// Rarest band, highest multiplier.
    Jackpot = 2,
}

impl TapTier {
    /// All tiers, most common first.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Critical, Self::Jackpot];

    /// Lowercase wire name (`normal`, `critical`, `jackpot`).
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Critical => "critical",
            Self::Jackpot => "jackpot",
        }
    }

    /// Decodes a journal byte.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Critical),
            2 => Some(Self::Jackpot),
            _ => None,
        }
    }
}

/// Draws one uniform roll in `[0, BP_SCALE)`.
///
/// The modulo bias over a 64-bit draw is below `10_000 / 2^64` and is ignored.
#[inline]
pub fn draw_roll<R: RngCore + ?Sized>(rng: &mut R) -> u32 {
    // Always < BP_SCALE, so the cast is lossless.
    (rng.next_u64() % u64::from(BP_SCALE)) as u32
}

/// Validated band boundaries and multipliers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierTable {
    /// Rolls below this are jackpots.
    jackpot_upper: u32,
    /// Rolls below this (and not jackpot) are criticals.
    critical_upper: u32,
    /// Multiplier per tier, indexed by `TapTier as usize`.
    multipliers: [BasisPoints; 3],
    /// Configured chance per tier, indexed by `TapTier as usize`.
    chances: [BasisPoints; 3],
}

impl TierTable {
    /// Builds the table, rejecting any band layout that is not an exact partition.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfiguration`] if the bands do not sum to
    /// `10_000` bp, if jackpot is not the rarest band, or if the multipliers are
    /// not `normal == 1× < critical < jackpot`.
    pub fn from_config(config: &TierConfig) -> EconomyResult<Self> {
        let total = config
            .jackpot_chance_bp
            .checked_add(config.critical_chance_bp)
            .and_then(|s| s.checked_add(config.normal_chance_bp))
            .ok_or_else(|| invalid("tier chances overflow"))?;
        if total != BasisPoints::ONE {
            return Err(invalid(format!(
                "tier chances must sum to {BP_SCALE} bp, got {}",
                total.raw()
            )));
        }
        if config.jackpot_chance_bp > config.critical_chance_bp {
            return Err(invalid(format!(
                "jackpot chance ({}) must not exceed critical chance ({})",
                config.jackpot_chance_bp.raw(),
                config.critical_chance_bp.raw()
            )));
        }
        if config.normal_multiplier_bp != BasisPoints::ONE {
            return Err(invalid(format!(
                "normal multiplier must be {BP_SCALE} bp, got {}",
                config.normal_multiplier_bp.raw()
            )));
        }
        if config.critical_multiplier_bp <= config.normal_multiplier_bp {
            return Err(invalid("critical multiplier must exceed normal multiplier"));
        }
        if config.jackpot_multiplier_bp <= config.critical_multiplier_bp {
            return Err(invalid("jackpot multiplier must exceed critical multiplier"));
        }

        let jackpot_upper = config.jackpot_chance_bp.raw();
        Ok(Self {
            jackpot_upper,
            critical_upper: jackpot_upper + config.critical_chance_bp.raw(),
            multipliers: [
                config.normal_multiplier_bp,
                config.critical_multiplier_bp,
                config.jackpot_multiplier_bp,
            ],
            chances: [
                config.normal_chance_bp,
                config.critical_chance_bp,
                config.jackpot_chance_bp,
            ],
        })
    }

    /// Classifies a roll in `[0, 10_000)`. Rolls at or above the scale are normal.
    #[inline]
    #[must_use]
    pub const fn classify(&self, roll: u32) -> TapTier {
        if roll < self.jackpot_upper {
            TapTier::Jackpot
        } else if roll < self.critical_upper {
            TapTier::Critical
        } else {
            TapTier::Normal
        }
    }

    /// Draws and classifies in one step.
    #[inline]
    pub fn roll<R: RngCore + ?Sized>(&self, rng: &mut R) -> TapTier {
        self.classify(draw_roll(rng))
    }

    /// Reward multiplier for `tier`.
    #[inline]
    #[must_use]
    pub const fn multiplier(&self, tier: TapTier) -> BasisPoints {
        self.multipliers[tier as usize]
    }

    /// Configured chance for `tier`.
    #[inline]
    #[must_use]
    pub const fn chance(&self, tier: TapTier) -> BasisPoints {
        self.chances[tier as usize]
    }

    /// Rolls `iterations` times and counts tiers.
    ///
    /// Used to verify the empirical distribution against the configured bands.
    pub fn run_statistics<R: RngCore + ?Sized>(&self, rng: &mut R, iterations: u64) -> TierStatistics {
        let mut stats = TierStatistics::default();
        for _ in 0..iterations {
            stats.record(self.roll(rng));
        }
        stats
    }
}

fn invalid(msg: impl Into<String>) -> EconomyError {
    EconomyError::InvalidConfiguration(msg.into())
}

/// Histogram of tier rolls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierStatistics {
    /// Total number of rolls.
    pub total_rolls: u64,
    /// Roll counts indexed by `TapTier as usize`.
    pub counts: [u64; 3],
}

impl TierStatistics {
    /// Counts one roll.
    #[inline]
    pub fn record(&mut self, tier: TapTier) {
        self.total_rolls += 1;
        self.counts[tier as usize] += 1;
    }

    /// Number of rolls that landed in `tier`.
    #[must_use]
    pub const fn count(&self, tier: TapTier) -> u64 {
        self.counts[tier as usize]
    }

    /// Observed frequency of `tier` in basis points (0 with no rolls).
    #[must_use]
    pub fn frequency_bp(&self, tier: TapTier) -> u64 {
        if self.total_rolls == 0 {
            0
        } else {
            self.count(tier) * u64::from(BP_SCALE) / self.total_rolls
        }
    }
}
