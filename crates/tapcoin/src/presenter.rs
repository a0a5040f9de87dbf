//! # Presentation Adapter
//!
//! Turns engine outcomes into what a screen shows: a floating `+amount` label
//! at the tap point, a notification for special taps, the energy bar, and
//! the rank badge.
//!
//! ```text
//! gesture ──> TapPresenter::on_tap ──> TapSession::tap ──> TapOutcome
//!                     │
//!                     └──> TapView { effect, notification }
//!
//! frame timer ──> TapPresenter::expire_effects(now)
//! ```
//!
//! Effects are time-boxed here and expire on their own; the engine knows
//! nothing about them.

use std::sync::Arc;

use parking_lot::Mutex;
use tapcoin_economy::{format_number, TapOutcome, TapSession, TapTier, Timestamp};

/// How long a floating label stays on screen.
pub const EFFECT_LIFETIME_MS: u64 = 1_000;
/// Notification duration for a critical tap.
pub const CRITICAL_NOTICE_MS: u64 = 2_000;
/// Notification duration for a jackpot.
pub const JACKPOT_NOTICE_MS: u64 = 3_000;

/// Point inside the tap area, relative to its top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TapPoint {
    /// Horizontal offset.
    pub x: f32,
    /// Vertical offset.
    pub y: f32,
}

/// Size of the tap area. Used to place effects when no point is known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapArea {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl TapArea {
    /// Center of the area.
    #[must_use]
    pub fn center(&self) -> TapPoint {
        TapPoint {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }
}

/// A floating reward label.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatingEffect {
    /// Unique per presenter.
    pub id: u64,
    /// Text shown, e.g. `+1.5K 🔥`.
    pub label: String,
    /// Tier that produced it.
    pub tier: TapTier,
    /// Where it is drawn.
    pub position: TapPoint,
    /// Removed at or after this time.
    pub expires_at: Timestamp,
}

/// A toast-style message for critical and jackpot taps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Display time.
    pub duration_ms: u64,
}

/// Everything the screen needs after one tap.
#[derive(Clone, Debug, PartialEq)]
pub struct TapView {
    /// Raw engine outcome.
    pub outcome: TapOutcome,
    /// Floating label, only for successful taps.
    pub effect: Option<FloatingEffect>,
    /// Notification, only for critical and jackpot taps.
    pub notification: Option<Notification>,
}

/// Rank button contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankBadge {
    /// `#<rank>`.
    pub label: String,
    /// Rank icon.
    pub icon: String,
}

/// Counters shown next to the tap area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HudStats {
    /// Formatted lifetime earnings.
    pub balance: String,
    /// Current combo.
    pub combo: u32,
    /// Current streak.
    pub streak: u32,
    /// `taps_left/energy_limit`.
    pub energy: String,
    /// Energy bar fill, 0..=100.
    pub energy_percent: u32,
}

struct EffectState {
    live: Vec<FloatingEffect>,
    next_id: u64,
}

/// Headless presentation adapter for one session.
pub struct TapPresenter {
    session: Arc<TapSession>,
    area: TapArea,
    effects: Mutex<EffectState>,
}

impl TapPresenter {
    /// Presents `session` inside a tap area of the given size.
    #[must_use]
    pub fn new(session: Arc<TapSession>, area: TapArea) -> Self {
        Self {
            session,
            area,
            effects: Mutex::new(EffectState {
                live: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Handles one tap gesture. `point` falls back to the area center.
    pub fn on_tap(&self, now: Timestamp, point: Option<TapPoint>) -> TapView {
        let outcome = self.session.tap(now);
        if !outcome.success {
            return TapView {
                outcome,
                effect: None,
                notification: None,
            };
        }

        let effect = {
            let mut effects = self.effects.lock();
            let effect = FloatingEffect {
                id: effects.next_id,
                label: effect_label(&outcome),
                tier: outcome.tier,
                position: point.unwrap_or_else(|| self.area.center()),
                expires_at: now.plus_millis(EFFECT_LIFETIME_MS),
            };
            effects.next_id += 1;
            effects.live.push(effect.clone());
            effect
        };

        TapView {
            outcome,
            effect: Some(effect),
            notification: notification_for(&outcome),
        }
    }

    /// Removes effects whose time is up. Returns how many were removed.
    pub fn expire_effects(&self, now: Timestamp) -> usize {
        let mut effects = self.effects.lock();
        let before = effects.live.len();
        effects.live.retain(|e| e.expires_at > now);
        before - effects.live.len()
    }

    /// Effects currently on screen, oldest first.
    #[must_use]
    pub fn effects(&self) -> Vec<FloatingEffect> {
        self.effects.lock().live.clone()
    }

    /// Energy bar fill, rounded to a whole percent.
    #[must_use]
    pub fn energy_percent(&self) -> u32 {
        self.session.with_player(tapcoin_economy::Player::energy_percent)
    }

    /// Rank button for the current earnings.
    #[must_use]
    pub fn rank_badge(&self) -> RankBadge {
        let rank = self.session.rank();
        RankBadge {
            label: format!("#{}", rank.rank),
            icon: rank.icon.to_string(),
        }
    }

    /// Counters for the stats panel, read in one consistent view.
    #[must_use]
    pub fn hud(&self) -> HudStats {
        self.session.with_player(|p| HudStats {
            balance: format_number(p.total_earned()),
            combo: p.combo(),
            streak: p.streak(),
            energy: format!("{}/{}", p.taps_left(), p.energy_limit()),
            energy_percent: p.energy_percent(),
        })
    }

    /// The session being presented.
    #[must_use]
    pub fn session(&self) -> &Arc<TapSession> {
        &self.session
    }
}

fn effect_label(outcome: &TapOutcome) -> String {
    let suffix = match outcome.tier {
        TapTier::Normal => "",
        TapTier::Critical => " 🔥",
        TapTier::Jackpot => " 🎰",
    };
    format!("+{}{suffix}", format_number(outcome.earned))
}

fn notification_for(outcome: &TapOutcome) -> Option<Notification> {
    let amount = format_number(outcome.earned);
    match outcome.tier {
        TapTier::Normal => None,
        TapTier::Critical => Some(Notification {
            title: "🔥 Critical Hit!".to_string(),
            description: format!("+{amount} UC"),
            duration_ms: CRITICAL_NOTICE_MS,
        }),
        TapTier::Jackpot => Some(Notification {
            title: "🎰 JACKPOT!".to_string(),
            description: format!("Amazing! +{amount} UC"),
            duration_ms: JACKPOT_NOTICE_MS,
        }),
    }
}
