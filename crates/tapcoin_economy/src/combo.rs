//! Combo window and capped combo multiplier.

use crate::basis_points::BasisPoints;
use crate::clock::Timestamp;
use crate::config::ComboConfig;
use crate::error::{EconomyError, EconomyResult};

/// Validated combo parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComboRule {
    window_ms: u64,
    step: BasisPoints,
    max: BasisPoints,
}

impl ComboRule {
    /// Builds the rule.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfiguration`] if the window is zero or
    /// the cap is below 1×.
    pub fn from_config(config: &ComboConfig) -> EconomyResult<Self> {
        if config.window_ms == 0 {
            return Err(EconomyError::InvalidConfiguration(
                "combo.window_ms must be > 0".into(),
            ));
        }
        if config.max_multiplier_bp < BasisPoints::ONE {
            return Err(EconomyError::InvalidConfiguration(format!(
                "combo.max_multiplier_bp must be >= {}, got {}",
                BasisPoints::ONE.raw(),
                config.max_multiplier_bp.raw()
            )));
        }
        Ok(Self {
            window_ms: config.window_ms,
            step: config.step_bp,
            max: config.max_multiplier_bp,
        })
    }

    /// Window length in milliseconds.
    #[inline]
    #[must_use]
    pub const fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// True if a tap at `now` continues a combo whose last tap was `last`.
    #[inline]
    #[must_use]
    pub fn within_window(&self, last: Option<Timestamp>, now: Timestamp) -> bool {
        last.is_some_and(|at| now.saturating_since(at) <= self.window_ms)
    }

    /// Combo still alive at `now`: `combo` inside the window, otherwise 0.
    #[inline]
    #[must_use]
    pub fn live_combo(&self, combo: u32, last: Option<Timestamp>, now: Timestamp) -> u32 {
        if self.within_window(last, now) {
            combo
        } else {
            0
        }
    }

    /// `min(1× + combo * step, max)`. Non-decreasing in `combo`.
    #[inline]
    #[must_use]
    pub fn multiplier(&self, combo: u32) -> BasisPoints {
        BasisPoints::ONE
            .saturating_add(self.step.saturating_mul_int(combo))
            .min(self.max)
    }
}
