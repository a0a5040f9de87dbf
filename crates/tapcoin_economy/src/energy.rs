//! # Energy Regeneration
//!
//! Energy refills at a fixed rate of `regen_milli_per_second` thousandths of
//! a unit per second. Accrual is tracked in micro-units:
//!
//! ```text
//! milli-energy/s × elapsed ms = micro-energy
//! ```
//!
//! so any slicing of the same wall-clock span yields the same whole units.
//! Energy above the cap is discarded together with the partial carry.

use crate::clock::Timestamp;
use crate::player::{Player, MICRO_PER_ENERGY};

/// Fixed-rate regeneration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnergyRegen {
    milli_per_second: u64,
}

impl EnergyRegen {
    /// Creates a regenerator. A rate of zero never refills.
    #[must_use]
    pub const fn new(milli_per_second: u64) -> Self {
        Self { milli_per_second }
    }

    /// Rate in thousandths of a unit per second.
    #[must_use]
    pub const fn milli_per_second(&self) -> u64 {
        self.milli_per_second
    }

    /// Accounts regeneration up to `now`. Returns the whole units restored.
    ///
    /// The first call only anchors the timeline. A `now` earlier than the
    /// anchor restores nothing and keeps the anchor.
    pub fn regenerate(&self, player: &mut Player, now: Timestamp) -> u32 {
        let Some(anchor) = player.regen_anchor else {
            Self::restart(player, now);
            return 0;
        };
        if now < anchor {
            tracing::warn!(
                anchor = anchor.as_millis(),
                now = now.as_millis(),
                "regeneration clock went backwards"
            );
            return 0;
        }

        let elapsed_ms = now.saturating_since(anchor);
        player.regen_anchor = Some(now);

        if player.is_full() {
            player.regen_carry = 0;
            return 0;
        }

        let accrued = player
            .regen_carry
            .saturating_add(self.milli_per_second.saturating_mul(elapsed_ms));
        let whole = accrued / MICRO_PER_ENERGY;
        let room = player.energy_limit - player.taps_left;

        if whole >= u64::from(room) {
            player.taps_left = player.energy_limit;
            player.regen_carry = 0;
            room
        } else {
            // whole < room <= u32::MAX
            let whole = whole as u32;
            player.taps_left += whole;
            player.regen_carry = accrued % MICRO_PER_ENERGY;
            whole
        }
    }

    /// Restarts accrual at `now` with no carry.
    pub(crate) fn restart(player: &mut Player, now: Timestamp) {
        player.regen_anchor = Some(now);
        player.regen_carry = 0;
    }
}
