//! # TAPCOIN Economy Engine
//!
//! Pure Rust tap-to-earn logic: one tap in, one outcome out.
//!
//! ## Design Principles
//!
//! 1. **Zero floating point** - chances and multipliers are basis points, rewards are integers
//! 2. **Injected randomness and time** - the engine never reads a global RNG or clock
//! 3. **Fail fast on configuration** - every balance value comes from TOML and is validated once
//! 4. **Failed taps are outcomes, not errors** - an empty energy bar changes nothing
//!
//! ## Thread Safety
//!
//! [`TapEngine`] is immutable after construction and can be shared freely.
//! Player state is serialized by [`TapSession`], which owns the player behind
//! one lock shared by taps and regeneration ticks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tapcoin_economy::{seeded_rng, EngineConfig, TapEngine, Timestamp};
//!
//! let engine = TapEngine::new(EngineConfig::load("data/config/tap_economy.toml")?)?;
//! let mut player = engine.new_player()?;
//! let mut rng = seeded_rng(42);
//!
//! let outcome = engine.tap(&mut player, Timestamp::from_millis(0), &mut rng);
//! println!("+{} ({})", engine.format_number(outcome.earned), outcome.tier.as_str());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod basis_points;
pub mod clock;
pub mod combo;
pub mod config;
pub mod energy;
pub mod engine;
pub mod error;
pub mod format;
pub mod journal;
pub mod player;
pub mod rank;
pub mod rng;
pub mod session;
pub mod streak;
pub mod tier;

pub use basis_points::{BasisPoints, BP_SCALE};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use combo::ComboRule;
pub use config::{ComboConfig, EnergyConfig, EngineConfig, RankEntry, RewardConfig, StreakConfig, TierConfig};
pub use energy::EnergyRegen;
pub use engine::{TapEngine, TapOutcome};
pub use error::{EconomyError, EconomyResult};
pub use format::format_number;
pub use journal::{replay, replay_taps, JournalConfig, JournalHandle, JournalStats, RecordKind, TapJournal, TapRecord};
pub use player::{Player, PlayerSnapshot};
pub use rank::{RankInfo, RankTable};
pub use rng::{seeded_rng, ScriptedRolls, SessionRng};
pub use session::{RegenTicker, TapSession, TickReport};
pub use streak::{StreakChange, StreakPolicy};
pub use tier::{TapTier, TierStatistics, TierTable};
