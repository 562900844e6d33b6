//! Paporg - rule-based document classification
//!
//! Decides, from a document's extracted text and original filename, which
//! category it belongs to and where it should be placed.

pub mod config;
pub mod error;
pub mod rules;
pub mod snapshot;
pub mod watcher;

pub use config::Config;
pub use error::{ConfigError, PatternError};
pub use rules::{MatchCondition, PlacementDecision, Rule, RuleEngine, RuleSpec, select};
pub use snapshot::SharedEngine;
pub use watcher::ConfigWatcher;

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
