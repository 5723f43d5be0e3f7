//! Sync progress events
//!
//! Events are best effort: with no subscriber they are simply dropped, and a
//! lagging subscriber loses the oldest ones.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;

use super::sync_orchestrator::GuildSyncReport;
use crate::domain::{ContentType, ExternalId, MemberId, SyncFailureKind};

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    MemberSyncStarted {
        member_id: MemberId,
        name: String,
    },
    CharacterResolved {
        member_id: MemberId,
        external_id: ExternalId,
        exact_match: bool,
    },
    MemberSyncSucceeded {
        member_id: MemberId,
        completed: HashMap<ContentType, usize>,
    },
    MemberSyncFailed {
        member_id: MemberId,
        kind: SyncFailureKind,
        message: String,
    },
    GuildSyncFinished(GuildSyncReport),
}

impl SyncEvent {
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::MemberSyncStarted { .. } => "member-sync-started",
            Self::CharacterResolved { .. } => "character-resolved",
            Self::MemberSyncSucceeded { .. } => "member-sync-succeeded",
            Self::MemberSyncFailed { .. } => "member-sync-failed",
            Self::GuildSyncFinished(_) => "guild-sync-finished",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncEventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for SyncEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
