//! Session-boundary streak policy.
//!
//! Time is cut into fixed periods (`period_ms`, typically one day). A period
//! with at least one successful tap qualifies. Consecutive qualifying periods
//! grow the streak; skipping a period starts over at 1.
//!
//! The policy is applied by the session layer after a tap, never inside
//! [`TapEngine::tap`](crate::engine::TapEngine::tap).

use crate::clock::Timestamp;
use crate::player::Player;

/// Outcome of observing a qualifying tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreakChange {
    /// Same period as the last qualifying tap.
    Unchanged,
    /// Next period: streak grew.
    Extended,
    /// First period ever, or a gap: streak restarted at 1.
    Restarted,
}

/// Period-based streak policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakPolicy {
    period_ms: u64,
}

impl StreakPolicy {
    /// Creates the policy. `period_ms` is validated by the config layer.
    #[must_use]
    pub const fn new(period_ms: u64) -> Self {
        Self { period_ms }
    }

    /// Period index of `at`.
    #[inline]
    #[must_use]
    pub const fn period_of(&self, at: Timestamp) -> u64 {
        at.as_millis() / self.period_ms
    }

    /// Records a qualifying tap at `now`.
    pub fn observe(&self, player: &mut Player, now: Timestamp) -> StreakChange {
        let period = self.period_of(now);
        match player.last_streak_period {
            Some(last) if period <= last => StreakChange::Unchanged,
            Some(last) if period == last + 1 => {
                player.streak = player.streak.saturating_add(1);
                player.last_streak_period = Some(period);
                StreakChange::Extended
            }
            _ => {
                player.streak = 1;
                player.last_streak_period = Some(period);
                StreakChange::Restarted
            }
        }
    }
}
