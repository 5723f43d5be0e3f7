//! Infrastructure layer: HTTP, HTML parsing, upstream adapters, config and logging
//!
//! Every upstream adapter implements one of the domain service traits and
//! talks to the network through [`http_client::PageFetcher`].

pub mod character_resolvers;
pub mod collection_sources;
pub mod config;
pub mod content_catalog;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod roster_client;

// Re-export commonly used items
pub use character_resolvers::{LodestoneSearchResolver, SearchApiResolver, select_candidate};
pub use collection_sources::{ScrapedHtmlSource, StructuredApiSource, classify_profile_response};
pub use config::{
    AppConfig, ConfigError, ConfigManager, LoggingConfig, PacingConfig, PacingStrategy, ResolverKind, SyncConfig,
    UnmatchedPolicy, UpstreamConfig,
};
pub use content_catalog::HttpContentCatalog;
pub use http_client::{FetchedPage, HttpClient, HttpClientConfig, HttpError, PageFetcher};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{CollectionListParser, ParsingError, ParsingResult, ProfileParser, ScrapingConfig};
pub use roster_client::HttpRosterProvider;
