//! # TAPCOIN
//!
//! The game crate: a headless presentation layer over the tap economy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           TAPCOIN                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────┐          ┌──────────────────────────┐  │
//! │  │   presenter      │          │   tapcoin_economy        │  │
//! │  │                  │─────────>│                          │  │
//! │  │  • labels        │  tap()   │  • TapEngine             │  │
//! │  │  • notifications │<─────────│  • TapSession            │  │
//! │  │  • energy / rank │ outcome  │  • RegenTicker / Journal │  │
//! │  └──────────────────┘          └──────────────────────────┘  │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `presenter`: tap views, effect expiry, energy bar and rank badge

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod presenter;

pub use presenter::{
    FloatingEffect, HudStats, Notification, RankBadge, TapArea, TapPoint, TapPresenter, TapView,
};

/// Re-export of the economy crate.
pub mod economy {
    pub use tapcoin_economy::*;
}
