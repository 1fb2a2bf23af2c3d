// src/models/mod.rs

//! Domain models for the watcher.
//!
//! Configuration, the per-pass records extracted from list pages, and the
//! persisted position/alert state.

mod config;
mod record;
mod state;

// Re-export all public types
pub use config::{
    Config, DiscordConfig, HttpConfig, ListConfig, LoginConfig, MIN_INTERVAL_SECS, WatchConfig,
};
pub use record::{ContentKind, Record, Tier, UNRANKED, normalize_content_type};
pub use state::{AlertRecord, PositionKey, PositionState, State};
