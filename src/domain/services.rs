//! Service seams of the sync pipeline
//!
//! The orchestrator only talks to upstreams through these traits, so the
//! concrete HTTP/HTML implementations can be swapped by configuration (and by
//! in-memory fakes in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collection::{ExternalId, SourceKind, UpstreamPayload};
use super::content::{ContentItem, ContentType};
use super::errors::{FetchError, ResolutionError};

/// One character returned by an upstream search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub name: String,
    pub server: String,
    pub external_id: ExternalId,
    pub avatar_url: Option<String>,
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCharacter {
    pub external_id: ExternalId,
    pub name: String,
    pub server: String,
    pub avatar_url: Option<String>,
    /// False when the first search result was taken without an exact match
    pub exact_match: bool,
}

impl From<(SearchCandidate, bool)> for ResolvedCharacter {
    fn from((candidate, exact_match): (SearchCandidate, bool)) -> Self {
        Self {
            external_id: candidate.external_id,
            name: candidate.name,
            server: candidate.server,
            avatar_url: candidate.avatar_url,
            exact_match,
        }
    }
}

/// Maps a display name and server to the upstream character id
#[async_trait]
pub trait CharacterResolver: Send + Sync {
    async fn resolve(&self, name: &str, server: &str) -> Result<ResolvedCharacter, ResolutionError>;
}

/// Retrieves a character's raw collection payload from one upstream strategy
#[async_trait]
pub trait CollectionSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch_collections(&self, external_id: &ExternalId) -> Result<UpstreamPayload, FetchError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog request for {content_type} failed{}: {message}", status_suffix(.status))]
    Upstream {
        content_type: ContentType,
        status: Option<u16>,
        message: String,
    },

    #[error("Catalog payload for {content_type} could not be decoded: {message}")]
    Decode {
        content_type: ContentType,
        message: String,
    },
}

/// Authoritative list of collectible items per content type
#[async_trait]
pub trait ContentCatalogProvider: Send + Sync {
    async fn fetch_items(&self, content_type: ContentType) -> Result<Vec<ContentItem>, CatalogError>;
}

/// One entry of a guild roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub external_id: ExternalId,
    pub server: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Roster for free company {fc_id} unavailable{}: {message}", status_suffix(.status))]
pub struct RosterError {
    pub fc_id: String,
    pub status: Option<u16>,
    pub message: String,
}

/// Lists the members of a Free Company
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn fetch_roster(&self, fc_id: &str) -> Result<Vec<RosterEntry>, RosterError>;
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}
