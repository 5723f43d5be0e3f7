//! Free Company member records
//!
//! Records are immutable values. Every change is expressed as a
//! [`MemberCommand`] and applied with [`FcMember::apply`], which returns the
//! replacement record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::collection::ExternalId;
use super::content::{ContentCatalog, ContentId, ContentType};
use super::errors::SyncFailureKind;

/// Local member identifier; assigned once, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-member sync lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Succeeded,
    Failed,
}

/// Completed content ids, one set per content type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedContent(HashMap<ContentType, HashSet<ContentId>>);

impl CompletedContent {
    pub fn get(&self, content_type: ContentType) -> Option<&HashSet<ContentId>> {
        self.0.get(&content_type)
    }

    pub fn contains(&self, content_type: ContentType, id: &ContentId) -> bool {
        self.get(content_type).is_some_and(|ids| ids.contains(id))
    }

    pub fn count(&self, content_type: ContentType) -> usize {
        self.get(content_type).map_or(0, HashSet::len)
    }

    /// Number of completed ids that exist in the given catalog slice
    pub fn count_in_catalog(&self, content_type: ContentType, catalog: &ContentCatalog) -> usize {
        self.get(content_type).map_or(0, |ids| {
            catalog
                .items(content_type)
                .iter()
                .filter(|item| ids.contains(&item.id))
                .count()
        })
    }

    /// Full replace of one type's set
    pub fn replace(&mut self, content_type: ContentType, ids: HashSet<ContentId>) {
        self.0.insert(content_type, ids);
    }

    /// Flip a single completion flag; returns whether it is now set
    pub fn toggle(&mut self, content_type: ContentType, id: ContentId) -> bool {
        let ids = self.0.entry(content_type).or_default();
        if ids.remove(&id) {
            false
        } else {
            ids.insert(id);
            true
        }
    }
}

/// Results of a successful sync, committed in one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub completed: HashMap<ContentType, HashSet<ContentId>>,
    pub avatar_url: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// State transitions applied to a member record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberCommand {
    /// Enter `Syncing` and clear the previous error
    BeginSync,
    /// Cache the resolved external id; ignored when one is already set
    ResolveCharacter { external_id: ExternalId },
    /// Replace completion sets, record avatar and time, enter `Succeeded`
    ApplySyncResult(SyncResult),
    /// Enter `Failed` with a message; completion data is left alone
    RecordFailure {
        kind: SyncFailureKind,
        message: String,
    },
    /// Manual user toggle of one completion flag
    ToggleCompletion {
        content_type: ContentType,
        content_id: ContentId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcMember {
    pub id: MemberId,
    pub name: String,
    pub server: String,
    pub external_id: Option<ExternalId>,
    pub completed_content: CompletedContent,
    pub avatar_url: Option<String>,
    pub sync_state: SyncState,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_failure_kind: Option<SyncFailureKind>,
}

impl FcMember {
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(),
            name: name.into(),
            server: server.into(),
            external_id: None,
            completed_content: CompletedContent::default(),
            avatar_url: None,
            sync_state: SyncState::Idle,
            last_sync_time: None,
            last_error: None,
            last_failure_kind: None,
        }
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: ExternalId) -> Self {
        self.external_id = Some(external_id);
        self
    }

    pub fn is_syncing(&self) -> bool {
        self.sync_state == SyncState::Syncing
    }

    /// Apply a command and return the replacement record
    #[must_use]
    pub fn apply(&self, command: MemberCommand) -> Self {
        let mut next = self.clone();
        match command {
            MemberCommand::BeginSync => {
                next.sync_state = SyncState::Syncing;
                next.last_error = None;
                next.last_failure_kind = None;
            }
            MemberCommand::ResolveCharacter { external_id } => {
                if next.external_id.is_none() {
                    next.external_id = Some(external_id);
                }
            }
            MemberCommand::ApplySyncResult(result) => {
                for (content_type, ids) in result.completed {
                    next.completed_content.replace(content_type, ids);
                }
                if result.avatar_url.is_some() {
                    next.avatar_url = result.avatar_url;
                }
                next.last_sync_time = Some(result.synced_at);
                next.sync_state = SyncState::Succeeded;
            }
            MemberCommand::RecordFailure { kind, message } => {
                next.sync_state = SyncState::Failed;
                next.last_error = Some(message);
                next.last_failure_kind = Some(kind);
            }
            MemberCommand::ToggleCompletion {
                content_type,
                content_id,
            } => {
                next.completed_content.toggle(content_type, content_id);
            }
        }
        next
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemberEntryError {
    #[error("Expected 'Name@Server', got '{0}'")]
    MissingSeparator(String),

    #[error("Character name is empty in '{0}'")]
    EmptyName(String),

    #[error("Server is empty in '{0}'")]
    EmptyServer(String),
}

/// A parsed `Name@Server` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub name: String,
    pub server: String,
}

impl MemberEntry {
    pub fn parse(input: &str) -> Result<Self, MemberEntryError> {
        let (name, server) = input
            .split_once('@')
            .ok_or_else(|| MemberEntryError::MissingSeparator(input.to_string()))?;
        let name = name.trim();
        let server = server.trim();
        if name.is_empty() {
            return Err(MemberEntryError::EmptyName(input.to_string()));
        }
        if server.is_empty() {
            return Err(MemberEntryError::EmptyServer(input.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            server: server.to_string(),
        })
    }
}

impl std::str::FromStr for MemberEntry {
    type Err = MemberEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
