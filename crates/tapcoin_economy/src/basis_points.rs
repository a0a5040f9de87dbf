//! # Basis-Point Arithmetic
//!
//! **NO FLOATING POINT IN REWARD CALCULATIONS**
//!
//! Chances and multipliers are integers in basis points: `10_000` bp is 100%
//! (or a 1× multiplier). Rewards are computed with 128-bit intermediates and
//! rounded half-up once, at the very end.
//!
//! ## Why Basis Points?
//!
//! - Deterministic: the same tap produces the same reward on every platform
//! - Exact partitions: tier bands summing to `10_000` cover every roll exactly
//! - Auditable: a journal replay recomputes identical rewards

use std::fmt;

use serde::{Deserialize, Serialize};

/// Basis points in one whole unit (100% / 1×).
pub const BP_SCALE: u32 = 10_000;

/// A chance or multiplier expressed in basis points.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// 0%.
    pub const ZERO: Self = Self(0);

    /// 100% / 1×.
    pub const ONE: Self = Self(BP_SCALE);

    /// Creates from a raw basis-point count.
    #[inline]
    #[must_use]
    pub const fn from_raw(bp: u32) -> Self {
        Self(bp)
    }

    /// Returns the raw basis-point count.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Checked addition, used when summing probability bands.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// `self * count`, saturating.
    #[inline]
    #[must_use]
    pub const fn saturating_mul_int(self, count: u32) -> Self {
        Self(self.0.saturating_mul(count))
    }
}

/// Scales `amount` by two multipliers and rounds half-up to a whole unit.
///
/// `round(amount * a * b / BP_SCALE²)`, saturating at `u64::MAX`.
#[inline]
#[must_use]
pub fn scale_rounded(amount: u64, a: BasisPoints, b: BasisPoints) -> u64 {
    let denom = u128::from(BP_SCALE) * u128::from(BP_SCALE);
    let scaled = u128::from(amount)
        .saturating_mul(u128::from(a.0))
        .saturating_mul(u128::from(b.0));
    let rounded = scaled.saturating_add(denom / 2) / denom;
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

impl fmt::Debug for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasisPoints({})", self.0)
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 15_000 bp -> "1.5000x"
        write!(f, "{}.{:04}x", self.0 / BP_SCALE, self.0 % BP_SCALE)
    }
}
