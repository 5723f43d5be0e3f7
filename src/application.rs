//! Application layer: sync orchestration and the services around it
//!
//! The orchestrator drives one member (or the whole guild) through
//! resolve, fetch, normalize, match and commit. Everything upstream is reached
//! through the domain service traits.

pub mod bootstrap;
pub mod catalog_handle;
pub mod collection_fetcher;
pub mod completion;
pub mod events;
pub mod matcher;
pub mod member_store;
pub mod normalizer;
pub mod pacing;
pub mod sync_orchestrator;

// Re-export commonly used items
pub use bootstrap::{SyncServices, build_services, build_services_with_fetcher};
pub use catalog_handle::{CatalogHandle, CatalogRefreshReport};
pub use collection_fetcher::CollectionFetcher;
pub use completion::{
    ContentFilter, ContentProgress, MemberProgress, OwnershipFilter, content_progress, guild_progress,
    member_progress,
};
pub use events::{SyncEvent, SyncEventBus};
pub use matcher::{MatchReport, MatchRule, Matcher, normalize_name};
pub use member_store::{BeginSync, MemberStore};
pub use normalizer::Normalizer;
pub use pacing::Pacer;
pub use sync_orchestrator::{GuildSyncReport, OrchestratorSettings, SkipReason, SyncDisposition, SyncOrchestrator};
