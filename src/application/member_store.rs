//! In-memory member record store
//!
//! Records are never mutated in place: every change is a [`MemberCommand`]
//! applied to a copy that replaces the stored record under the write lock.
//! Commands addressed to a removed member are dropped (write-if-exists).

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{ContentId, ContentType, FcMember, MemberCommand, MemberEntry, MemberId, RosterEntry};

/// Outcome of trying to enter `Syncing`
#[derive(Debug, Clone, PartialEq)]
pub enum BeginSync {
    /// The member is now `Syncing`; this is the updated record
    Started(FcMember),
    AlreadySyncing,
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct MemberStore {
    members: Arc<RwLock<Vec<FcMember>>>,
}

impl MemberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, name: impl Into<String>, server: impl Into<String>) -> FcMember {
        self.insert(FcMember::new(name, server)).await
    }

    pub async fn add_entry(&self, entry: &MemberEntry) -> FcMember {
        self.add_member(entry.name.clone(), entry.server.clone()).await
    }

    /// Add roster entries as members, skipping characters already tracked
    pub async fn add_from_roster(&self, entries: &[RosterEntry]) -> Vec<FcMember> {
        let mut members = self.members.write().await;
        let mut known: HashSet<_> = members.iter().filter_map(|m| m.external_id.clone()).collect();

        let mut added = Vec::new();
        for entry in entries {
            if !known.insert(entry.external_id.clone()) {
                debug!("Skipping roster entry {} ({}): already a member", entry.name, entry.external_id);
                continue;
            }
            let member = FcMember::new(entry.name.clone(), entry.server.clone().unwrap_or_default())
                .with_external_id(entry.external_id.clone());
            members.push(member.clone());
            added.push(member);
        }

        info!("Added {} of {} roster entries as members", added.len(), entries.len());
        added
    }

    async fn insert(&self, member: FcMember) -> FcMember {
        info!("Adding member {}@{} ({})", member.name, member.server, member.id);
        self.members.write().await.push(member.clone());
        member
    }

    pub async fn remove(&self, id: MemberId) -> Option<FcMember> {
        let mut members = self.members.write().await;
        let index = members.iter().position(|m| m.id == id)?;
        let removed = members.remove(index);
        info!("Removed member {}@{} ({})", removed.name, removed.server, removed.id);
        Some(removed)
    }

    pub async fn get(&self, id: MemberId) -> Option<FcMember> {
        self.members.read().await.iter().find(|m| m.id == id).cloned()
    }

    /// Snapshot of all records in insertion order
    pub async fn list(&self) -> Vec<FcMember> {
        self.members.read().await.clone()
    }

    pub async fn ids(&self) -> Vec<MemberId> {
        self.members.read().await.iter().map(|m| m.id).collect()
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }

    /// Check-and-set into `Syncing` under one write lock
    pub async fn begin_sync(&self, id: MemberId) -> BeginSync {
        let mut members = self.members.write().await;
        let Some(slot) = members.iter_mut().find(|m| m.id == id) else {
            return BeginSync::Missing;
        };
        if slot.is_syncing() {
            return BeginSync::AlreadySyncing;
        }
        *slot = slot.apply(MemberCommand::BeginSync);
        BeginSync::Started(slot.clone())
    }

    /// Apply a command if the member still exists; returns the new record
    pub async fn apply(&self, id: MemberId, command: MemberCommand) -> Option<FcMember> {
        let mut members = self.members.write().await;
        let Some(slot) = members.iter_mut().find(|m| m.id == id) else {
            debug!("Dropping command for removed member {}", id);
            return None;
        };
        *slot = slot.apply(command);
        Some(slot.clone())
    }

    /// Flip one completion flag; returns whether the item is now owned
    pub async fn toggle_completion(
        &self,
        id: MemberId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Option<bool> {
        let command = MemberCommand::ToggleCompletion {
            content_type,
            content_id: content_id.clone(),
        };
        self.apply(id, command)
            .await
            .map(|member| member.completed_content.contains(content_type, &content_id))
    }
}
