//! # Player State
//!
//! The one stateful record of the economy. Fields are private: outside the
//! crate the record is read-only, and every mutation flows through
//! [`TapEngine`](crate::engine::TapEngine) (taps, regeneration, combo expiry,
//! upgrades) or the streak policy.
//!
//! Invariants held at all times:
//! - `0 < energy_limit`
//! - `taps_left <= energy_limit`
//! - `total_earned` never decreases

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::{EconomyError, EconomyResult};

/// Progression state of one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub(crate) energy_limit: u32,
    pub(crate) taps_left: u32,
    pub(crate) total_earned: u64,
    pub(crate) combo: u32,
    pub(crate) streak: u32,
    /// Time of the last successful tap (combo window anchor).
    pub(crate) last_tap_at: Option<Timestamp>,
    /// Regeneration has been accounted up to this time.
    pub(crate) regen_anchor: Option<Timestamp>,
    /// Partial energy in micro-units (1 energy == 1_000_000).
    pub(crate) regen_carry: u64,
    /// Index of the last streak period with a qualifying tap.
    pub(crate) last_streak_period: Option<u64>,
}

impl Player {
    /// Creates a fresh player with a full energy bar.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidPlayerState`] if `energy_limit` is 0.
    pub fn new(energy_limit: u32) -> EconomyResult<Self> {
        if energy_limit == 0 {
            return Err(EconomyError::InvalidPlayerState(
                "energy_limit must be > 0".into(),
            ));
        }
        Ok(Self {
            energy_limit,
            taps_left: energy_limit,
            total_earned: 0,
            combo: 0,
            streak: 0,
            last_tap_at: None,
            regen_anchor: None,
            regen_carry: 0,
            last_streak_period: None,
        })
    }

    /// Restores a player handed over by external storage.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidPlayerState`] if the snapshot breaks an
    /// invariant. Nothing is clamped.
    pub fn from_snapshot(snapshot: &PlayerSnapshot) -> EconomyResult<Self> {
        if snapshot.energy_limit == 0 {
            return Err(EconomyError::InvalidPlayerState(
                "energy_limit must be > 0".into(),
            ));
        }
        if snapshot.taps_left > snapshot.energy_limit {
            return Err(EconomyError::InvalidPlayerState(format!(
                "taps_left {} exceeds energy_limit {}",
                snapshot.taps_left, snapshot.energy_limit
            )));
        }
        if snapshot.regen_carry >= MICRO_PER_ENERGY {
            return Err(EconomyError::InvalidPlayerState(format!(
                "regen_carry {} is a whole unit or more",
                snapshot.regen_carry
            )));
        }
        Ok(Self {
            energy_limit: snapshot.energy_limit,
            taps_left: snapshot.taps_left,
            total_earned: snapshot.total_earned,
            combo: snapshot.combo,
            streak: snapshot.streak,
            last_tap_at: snapshot.last_tap_at,
            regen_anchor: snapshot.regen_anchor,
            regen_carry: snapshot.regen_carry,
            last_streak_period: snapshot.last_streak_period,
        })
    }

    /// Copies the full state out for external storage.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            energy_limit: self.energy_limit,
            taps_left: self.taps_left,
            total_earned: self.total_earned,
            combo: self.combo,
            streak: self.streak,
            last_tap_at: self.last_tap_at,
            regen_anchor: self.regen_anchor,
            regen_carry: self.regen_carry,
            last_streak_period: self.last_streak_period,
        }
    }

    /// Maximum energy.
    #[inline]
    #[must_use]
    pub const fn energy_limit(&self) -> u32 {
        self.energy_limit
    }

    /// Remaining energy.
    #[inline]
    #[must_use]
    pub const fn taps_left(&self) -> u32 {
        self.taps_left
    }

    /// Lifetime currency earned.
    #[inline]
    #[must_use]
    pub const fn total_earned(&self) -> u64 {
        self.total_earned
    }

    /// Consecutive taps inside the combo window.
    #[inline]
    #[must_use]
    pub const fn combo(&self) -> u32 {
        self.combo
    }

    /// Consecutive periods with at least one tap.
    #[inline]
    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }

    /// Time of the last successful tap.
    #[inline]
    #[must_use]
    pub const fn last_tap_at(&self) -> Option<Timestamp> {
        self.last_tap_at
    }

    /// True when the bar is full.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.taps_left >= self.energy_limit
    }

    /// Energy bar fill, rounded to a whole percent.
    #[must_use]
    pub fn energy_percent(&self) -> u32 {
        let pct = (u64::from(self.taps_left) * 100 + u64::from(self.energy_limit) / 2)
            / u64::from(self.energy_limit);
        // taps_left <= energy_limit, so pct <= 100.
        pct as u32
    }
}

/// Micro-units in one energy unit.
pub(crate) const MICRO_PER_ENERGY: u64 = 1_000_000;

/// Serializable copy of [`Player`], the hand-off format for external storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Maximum energy.
    pub energy_limit: u32,
    /// Remaining energy.
    pub taps_left: u32,
    /// Lifetime earnings.
    pub total_earned: u64,
    /// Current combo.
    pub combo: u32,
    /// Current streak.
    pub streak: u32,
    /// Last successful tap.
    #[serde(default)]
    pub last_tap_at: Option<Timestamp>,
    /// Regeneration anchor.
    #[serde(default)]
    pub regen_anchor: Option<Timestamp>,
    /// Partial regeneration in micro-units.
    #[serde(default)]
    pub regen_carry: u64,
    /// Last qualifying streak period.
    #[serde(default)]
    pub last_streak_period: Option<u64>,
}

impl PlayerSnapshot {
    /// Snapshot of a player with the given counters and no timing history.
    #[must_use]
    pub const fn with_counters(
        energy_limit: u32,
        taps_left: u32,
        total_earned: u64,
        combo: u32,
        streak: u32,
    ) -> Self {
        Self {
            energy_limit,
            taps_left,
            total_earned,
            combo,
            streak,
            last_tap_at: None,
            regen_anchor: None,
            regen_carry: 0,
            last_streak_period: None,
        }
    }
}
