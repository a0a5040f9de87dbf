//! # Rank Table
//!
//! Rank is a pure function of lifetime earnings. The table is an ascending
//! list of `(threshold, rank, icon)` rows; a player holds the row with the
//! highest threshold not above their earnings (inclusive lower bound), or the
//! first row when below every threshold.
//!
//! Lookup is a binary search over the thresholds: `O(log n)`, allocation free.

use crate::config::RankEntry;
use crate::error::{EconomyError, EconomyResult};

/// Derived standing. Never stored, always recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankInfo<'a> {
    /// Rank number, 1 is the entry rank.
    pub rank: u32,
    /// Badge icon.
    pub icon: &'a str,
}

/// Validated, ascending rank table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankTable {
    entries: Vec<RankEntry>,
}

impl RankTable {
    /// Builds the table.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfiguration`] if the table is empty,
    /// thresholds or ranks are not strictly ascending, a rank is 0, or an
    /// icon is empty.
    pub fn new(entries: Vec<RankEntry>) -> EconomyResult<Self> {
        if entries.is_empty() {
            return Err(invalid("rank table must have at least one entry"));
        }
        for entry in &entries {
            if entry.rank == 0 {
                return Err(invalid("ranks start at 1"));
            }
            if entry.icon.is_empty() {
                return Err(invalid(format!("rank {} has no icon", entry.rank)));
            }
        }
        for pair in entries.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(invalid(format!(
                    "rank thresholds must be strictly ascending ({} then {})",
                    pair[0].threshold, pair[1].threshold
                )));
            }
            if pair[1].rank <= pair[0].rank {
                return Err(invalid(format!(
                    "ranks must be strictly ascending ({} then {})",
                    pair[0].rank, pair[1].rank
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Rank for `total_earned`. Total over all inputs.
    #[must_use]
    pub fn calculate_rank(&self, total_earned: u64) -> RankInfo<'_> {
        // Number of rows whose threshold is <= total_earned.
        let reached = self.entries.partition_point(|e| e.threshold <= total_earned);
        let entry = &self.entries[reached.saturating_sub(1)];
        RankInfo {
            rank: entry.rank,
            icon: &entry.icon,
        }
    }

    /// Earnings needed for the next rank, if any.
    #[must_use]
    pub fn next_threshold(&self, total_earned: u64) -> Option<u64> {
        let reached = self.entries.partition_point(|e| e.threshold <= total_earned);
        self.entries.get(reached).map(|e| e.threshold)
    }

    /// All rows, ascending.
    #[must_use]
    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }
}

fn invalid(msg: impl Into<String>) -> EconomyError {
    EconomyError::InvalidConfiguration(msg.into())
}
