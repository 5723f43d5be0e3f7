//! Domain module - Core entities and service seams
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod collection;
pub mod content;
pub mod errors;
pub mod member;
pub mod services;

pub use collection::{
    CharacterProfile, ExternalId, NormalizedCharacter, OwnedCollections, RawOwnedItem, ScrapedPages,
    SourceKind, StructuredPayload, UpstreamPayload,
};
pub use content::{ContentCatalog, ContentId, ContentItem, ContentType};
pub use errors::{FetchError, FetchErrorKind, ResolutionError, SyncFailure, SyncFailureKind};
pub use member::{
    CompletedContent, FcMember, MemberCommand, MemberEntry, MemberEntryError, MemberId, SyncResult,
    SyncState,
};
pub use services::{
    CatalogError, CharacterResolver, CollectionSource, ContentCatalogProvider, ResolvedCharacter,
    RosterEntry, RosterError, RosterProvider, SearchCandidate,
};
