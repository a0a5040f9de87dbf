//! # Economy Error Types
//!
//! Errors that can stop the economy from starting or from persisting.
//!
//! Running out of energy is deliberately absent: an empty bar is a normal
//! [`TapOutcome`](crate::engine::TapOutcome) with `success == false`.

use thiserror::Error;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Balance configuration is unusable. Fatal at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A player snapshot handed in from storage breaks the player invariants.
    #[error("invalid player state: {0}")]
    InvalidPlayerState(String),

    /// The journal ring buffer is full.
    #[error("journal buffer full (backpressure)")]
    JournalBufferFull,

    /// The journal file could not be opened or read.
    #[error("journal i/o failed: {0}")]
    JournalIo(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
