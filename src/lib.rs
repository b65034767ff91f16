// src/lib.rs
// Public library surface for the dry-run binary and integration tests.

/// `tracing::debug!` on the "sniper" target, only when the debug flag is on.
macro_rules! trace_if {
    ($on:expr, $($arg:tt)+) => {
        if $on {
            tracing::debug!(target: "sniper", $($arg)+);
        }
    };
}

pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod handled;
pub mod ingest;
pub mod metrics;
pub mod ranking;
pub mod sniper;
pub mod species;
pub mod throttle;
pub mod world;

// ---- Re-exports for stable public API ----
pub use crate::config::{SniperConfig, SniperMode, SniperSettings};
pub use crate::engine::{AbortReason, SnipeEngine, SnipeOutcome};
pub use crate::error::{SniperError, SniperResult};
pub use crate::ingest::types::{LiveFeed, LocationHash, SharedFeed, Target};
pub use crate::sniper::{Collaborators, Sniper, WorkReport};
