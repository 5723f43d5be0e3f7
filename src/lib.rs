//! FC Tracker - Free Company collection sync pipeline
//!
//! Resolves each member's character, fetches owned mounts, minions and
//! achievements from FFXIVCollect (or scraped Lodestone pages), matches them
//! against the content catalog and records the result per member.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the entry points used by the binary and integration tests
pub use application::{GuildSyncReport, SyncDisposition, SyncOrchestrator, SyncServices, build_services};
pub use infrastructure::config::AppConfig;
