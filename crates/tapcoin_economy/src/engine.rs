//! # Tap Engine
//!
//! **The single decision point of the economy.**
//!
//! ```text
//! gesture ──> adapter ──> TapEngine::tap(player, now, rng) ──> TapOutcome ──> adapter renders
//!                                │
//!                                ├─ 1. energy gate (taps_left == 0 → failed outcome, no mutation)
//!                                ├─ 2. live combo at `now`
//!                                ├─ 3. tier roll from the injected RNG
//!                                ├─ 4. reward = base × tier × combo (basis points, rounded once)
//!                                └─ 5. apply: taps_left-1, total_earned+reward, combo, last tap
//! ```
//!
//! The engine holds only validated configuration. Player state is passed in
//! by `&mut`, so whoever owns the player decides how taps and regeneration
//! are serialized (see [`TapSession`](crate::session::TapSession)).
//!
//! ## Performance Target
//!
//! - `tap`: well under 1 microsecond, no allocation, no I/O

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::basis_points::scale_rounded;
use crate::clock::Timestamp;
use crate::combo::ComboRule;
use crate::config::{BalanceTables, EngineConfig};
use crate::energy::EnergyRegen;
use crate::error::{EconomyError, EconomyResult};
use crate::format;
use crate::player::Player;
use crate::rank::{RankInfo, RankTable};
use crate::streak::{StreakChange, StreakPolicy};
use crate::tier::{TapTier, TierTable};

/// Result of one tap.
///
/// Never both `success == false` and `earned > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapOutcome {
    /// False when the bar was empty; nothing changed.
    pub success: bool,
    /// Currency granted.
    pub earned: u64,
    /// Reward tier (`normal` on failure).
    #[serde(rename = "type")]
    pub tier: TapTier,
}

impl TapOutcome {
    /// The outcome of tapping with no energy.
    pub const NO_ENERGY: Self = Self {
        success: false,
        earned: 0,
        tier: TapTier::Normal,
    };
}

/// The tap economy engine.
#[derive(Clone, Debug)]
pub struct TapEngine {
    config: EngineConfig,
    tiers: TierTable,
    combo: ComboRule,
    regen: EnergyRegen,
    streak: StreakPolicy,
    ranks: RankTable,
}

impl TapEngine {
    /// Builds an engine. Fails fast on any invalid balance value.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfiguration`] if `config` is invalid.
    pub fn new(config: EngineConfig) -> EconomyResult<Self> {
        let BalanceTables { tiers, combo, ranks } = config.build_tables()?;
        Ok(Self {
            regen: EnergyRegen::new(config.energy.regen_milli_per_second),
            streak: StreakPolicy::new(config.streak.period_ms),
            config,
            tiers,
            combo,
            ranks,
        })
    }

    /// Creates a fresh player with the configured starting energy.
    ///
    /// # Errors
    ///
    /// Never fails for a validated config; the `Result` mirrors [`Player::new`].
    pub fn new_player(&self) -> EconomyResult<Player> {
        Player::new(self.config.energy.starting_limit)
    }

    /// Performs one tap at `now`, rolling the tier from `rng`.
    ///
    /// With `taps_left == 0` this returns [`TapOutcome::NO_ENERGY`] and touches
    /// nothing (the RNG is not drawn either).
    pub fn tap<R: RngCore + ?Sized>(&self, player: &mut Player, now: Timestamp, rng: &mut R) -> TapOutcome {
        if player.taps_left == 0 {
            return TapOutcome::NO_ENERGY;
        }

        let was_full = player.is_full();
        let live_combo = self.combo.live_combo(player.combo, player.last_tap_at, now);
        let tier = self.tiers.roll(rng);
        let earned = self.reward_for(tier, live_combo);

        player.taps_left -= 1;
        if was_full {
            // Accrual while full was discarded; the refill clock starts now.
            EnergyRegen::restart(player, now);
        }
        player.total_earned = player.total_earned.saturating_add(earned);
        player.combo = live_combo.saturating_add(1);
        player.last_tap_at = Some(now);

        if tier == TapTier::Jackpot {
            tracing::debug!(earned, combo = live_combo, "jackpot tap");
        }

        TapOutcome {
            success: true,
            earned,
            tier,
        }
    }

    /// Reward for a tap of `tier` made with `combo` live combo taps.
    #[inline]
    #[must_use]
    pub fn reward_for(&self, tier: TapTier, combo: u32) -> u64 {
        scale_rounded(
            self.config.reward.base_reward_per_tap,
            self.tiers.multiplier(tier),
            self.combo.multiplier(combo),
        )
    }

    /// Accounts energy regeneration up to `now`. Returns units restored.
    pub fn regenerate(&self, player: &mut Player, now: Timestamp) -> u32 {
        self.regen.regenerate(player, now)
    }

    /// Resets the combo to 0 once the window has elapsed without a tap.
    /// Returns true if the combo was reset.
    pub fn expire_combo(&self, player: &mut Player, now: Timestamp) -> bool {
        if player.combo > 0 && !self.combo.within_window(player.last_tap_at, now) {
            player.combo = 0;
            true
        } else {
            false
        }
    }

    /// Applies the streak policy for a qualifying tap at `now`.
    pub fn observe_streak(&self, player: &mut Player, now: Timestamp) -> StreakChange {
        self.streak.observe(player, now)
    }

    /// Changes the energy capacity (upgrades) at `now`. Shrinking clamps
    /// `taps_left`.
    ///
    /// Regeneration is settled up to `now` under the old limit first, so time
    /// the bar spent full is never credited against the new capacity.
    /// Returns the units restored by that settlement.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidPlayerState`] for a zero limit.
    pub fn upgrade_energy_limit(&self, player: &mut Player, new_limit: u32, now: Timestamp) -> EconomyResult<u32> {
        if new_limit == 0 {
            return Err(EconomyError::InvalidPlayerState(
                "energy_limit must be > 0".into(),
            ));
        }
        let restored = self.regen.regenerate(player, now);
        player.energy_limit = new_limit;
        if player.taps_left >= new_limit {
            player.taps_left = new_limit;
            player.regen_carry = 0;
        }
        Ok(restored)
    }

    /// Rank for lifetime earnings.
    #[must_use]
    pub fn calculate_rank(&self, total_earned: u64) -> RankInfo<'_> {
        self.ranks.calculate_rank(total_earned)
    }

    /// Compact display of a currency amount.
    #[must_use]
    pub fn format_number(&self, value: u64) -> String {
        format::format_number(value)
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tier table.
    #[must_use]
    pub const fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Combo rule.
    #[must_use]
    pub const fn combo_rule(&self) -> &ComboRule {
        &self.combo
    }

    /// Rank table.
    #[must_use]
    pub const fn ranks(&self) -> &RankTable {
        &self.ranks
    }
}
