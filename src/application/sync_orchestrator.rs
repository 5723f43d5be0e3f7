//! Member and guild sync orchestration
//!
//! One member sync runs resolve, fetch, normalize, match and commit in that
//! order. Every store write goes through [`MemberStore::apply`], so a member
//! removed mid-sync silently discards the rest of its pipeline. A guild sync
//! processes members one at a time with pacing between them.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::catalog_handle::CatalogHandle;
use super::collection_fetcher::CollectionFetcher;
use super::events::{SyncEvent, SyncEventBus};
use super::matcher::Matcher;
use super::member_store::{BeginSync, MemberStore};
use super::pacing::Pacer;
use crate::domain::{
    CharacterResolver, ContentType, ExternalId, FcMember, FetchError, MemberCommand, MemberId, ResolutionError,
    SyncFailure, SyncFailureKind, SyncResult,
};
use crate::infrastructure::config::{PacingConfig, SyncConfig, UnmatchedPolicy};

/// Why a member was not synced at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySyncing,
    MemberMissing,
}

/// Outcome of one member sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDisposition {
    Succeeded,
    Failed(SyncFailureKind),
    Skipped(SkipReason),
    /// The member was removed while its sync was in flight
    Discarded,
}

impl SyncDisposition {
    /// Whether the attempt reached an upstream
    const fn touched_upstream(self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuildSyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub discarded: usize,
    pub cancelled: bool,
}

impl GuildSyncReport {
    fn record(&mut self, disposition: SyncDisposition) {
        self.attempted += 1;
        match disposition {
            SyncDisposition::Succeeded => self.succeeded += 1,
            SyncDisposition::Failed(_) => self.failed += 1,
            SyncDisposition::Skipped(_) => self.skipped += 1,
            SyncDisposition::Discarded => self.discarded += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub resolve_timeout: Duration,
    pub unmatched_policy: UnmatchedPolicy,
    pub pacing: PacingConfig,
}

impl From<&SyncConfig> for OrchestratorSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            resolve_timeout: config.resolve_timeout(),
            unmatched_policy: config.unmatched_policy,
            pacing: config.pacing.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

enum PipelineError {
    Failed(SyncFailure),
    Discarded,
}

impl From<ResolutionError> for PipelineError {
    fn from(err: ResolutionError) -> Self {
        Self::Failed(err.into())
    }
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        Self::Failed(err.into())
    }
}

pub struct SyncOrchestrator {
    store: MemberStore,
    catalog: CatalogHandle,
    resolver: Arc<dyn CharacterResolver>,
    fetcher: CollectionFetcher,
    matcher: Matcher,
    pacer: Pacer,
    events: SyncEventBus,
    resolve_timeout: Duration,
}

impl SyncOrchestrator {
    pub fn new(
        store: MemberStore,
        catalog: CatalogHandle,
        resolver: Arc<dyn CharacterResolver>,
        fetcher: CollectionFetcher,
        settings: OrchestratorSettings,
        events: SyncEventBus,
    ) -> Self {
        Self {
            store,
            catalog,
            resolver,
            fetcher,
            matcher: Matcher::new(settings.unmatched_policy),
            pacer: Pacer::from_config(&settings.pacing),
            events,
            resolve_timeout: settings.resolve_timeout,
        }
    }

    pub fn store(&self) -> &MemberStore {
        &self.store
    }

    pub fn events(&self) -> &SyncEventBus {
        &self.events
    }

    /// Sync one member.
    ///
    /// A member already syncing is skipped, not queued. Failures are recorded
    /// on the member record and leave its completion data untouched.
    pub async fn sync_one(&self, member_id: MemberId) -> SyncDisposition {
        let member = match self.store.begin_sync(member_id).await {
            BeginSync::Started(member) => member,
            BeginSync::AlreadySyncing => {
                debug!("Member {} is already syncing; skipping", member_id);
                return SyncDisposition::Skipped(SkipReason::AlreadySyncing);
            }
            BeginSync::Missing => {
                debug!("Member {} no longer exists; skipping", member_id);
                return SyncDisposition::Skipped(SkipReason::MemberMissing);
            }
        };

        info!("Syncing {} ({})", member.name, member.server);
        self.events.emit(SyncEvent::MemberSyncStarted {
            member_id,
            name: member.name.clone(),
        });

        match self.run_pipeline(&member).await {
            Ok(result) => self.commit_success(member_id, result).await,
            Err(PipelineError::Failed(failure)) => self.commit_failure(&member, failure).await,
            Err(PipelineError::Discarded) => {
                debug!("Member {} was removed mid-sync; result discarded", member_id);
                SyncDisposition::Discarded
            }
        }
    }

    /// Sync every member present when the run starts, in insertion order.
    ///
    /// Cancellation is checked before each member and during pacing waits; an
    /// in-flight member sync always runs to completion.
    pub async fn sync_all(&self, cancel: &CancellationToken) -> GuildSyncReport {
        let member_ids = self.store.ids().await;
        info!("Starting guild sync of {} members", member_ids.len());

        let mut report = GuildSyncReport::default();
        let mut pause_before_next = false;

        for member_id in member_ids {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if pause_before_next && !self.pacer.wait(cancel).await {
                report.cancelled = true;
                break;
            }

            let disposition = self.sync_one(member_id).await;
            pause_before_next = disposition.touched_upstream();
            report.record(disposition);
        }

        if report.cancelled {
            warn!("Guild sync cancelled after {} members", report.attempted);
        }
        info!(
            "Guild sync finished: {} succeeded, {} failed, {} skipped, {} discarded",
            report.succeeded, report.failed, report.skipped, report.discarded
        );
        self.events.emit(SyncEvent::GuildSyncFinished(report.clone()));
        report
    }

    async fn run_pipeline(&self, member: &FcMember) -> Result<SyncResult, PipelineError> {
        // Matching uses the catalog as of the start of this sync
        let catalog = self.catalog.snapshot().await;

        let (external_id, resolved_avatar) = match &member.external_id {
            Some(external_id) => (external_id.clone(), None),
            None => self.resolve(member).await?,
        };

        let normalized = self.fetcher.fetch(&external_id).await?;

        let mut completed = HashMap::new();
        for content_type in ContentType::ALL {
            if normalized.is_withheld(content_type) {
                info!("{} of {} are private; keeping the previous set", content_type, member.name);
                continue;
            }
            let slice = catalog.items(content_type);
            if slice.is_empty() {
                warn!("No {} catalog loaded; nothing can be matched", content_type);
            }
            let report = self
                .matcher
                .match_items(content_type, normalized.collections.get(content_type), slice);
            completed.insert(content_type, report.matched);
        }

        Ok(SyncResult {
            completed,
            avatar_url: normalized.profile.avatar_url.or(resolved_avatar),
            synced_at: Utc::now(),
        })
    }

    async fn resolve(&self, member: &FcMember) -> Result<(ExternalId, Option<String>), PipelineError> {
        let resolved = tokio::time::timeout(self.resolve_timeout, self.resolver.resolve(&member.name, &member.server))
            .await
            .map_err(|_| {
                ResolutionError::transport(
                    None,
                    format!("timed out after {}s", self.resolve_timeout.as_secs()),
                )
            })??;

        if !resolved.exact_match {
            warn!(
                "No exact match for {} ({}); using {} ({})",
                member.name, member.server, resolved.name, resolved.server
            );
        }

        let command = MemberCommand::ResolveCharacter {
            external_id: resolved.external_id.clone(),
        };
        if self.store.apply(member.id, command).await.is_none() {
            return Err(PipelineError::Discarded);
        }

        debug!("Resolved {} to {}", member.name, resolved.external_id);
        self.events.emit(SyncEvent::CharacterResolved {
            member_id: member.id,
            external_id: resolved.external_id.clone(),
            exact_match: resolved.exact_match,
        });
        Ok((resolved.external_id, resolved.avatar_url))
    }

    async fn commit_success(&self, member_id: MemberId, result: SyncResult) -> SyncDisposition {
        let counts: HashMap<ContentType, usize> = result
            .completed
            .iter()
            .map(|(content_type, ids)| (*content_type, ids.len()))
            .collect();

        match self.store.apply(member_id, MemberCommand::ApplySyncResult(result)).await {
            Some(member) => {
                info!(
                    "Synced {}: {} mounts, {} minions, {} achievements",
                    member.name,
                    counts.get(&ContentType::Mount).copied().unwrap_or(0),
                    counts.get(&ContentType::Minion).copied().unwrap_or(0),
                    counts.get(&ContentType::Achievement).copied().unwrap_or(0),
                );
                self.events.emit(SyncEvent::MemberSyncSucceeded {
                    member_id,
                    completed: counts,
                });
                SyncDisposition::Succeeded
            }
            None => SyncDisposition::Discarded,
        }
    }

    async fn commit_failure(&self, member: &FcMember, failure: SyncFailure) -> SyncDisposition {
        let kind = failure.kind();
        let message = failure.to_string();
        warn!("Sync failed for {} ({}): {}", member.name, member.server, message);

        let command = MemberCommand::RecordFailure {
            kind,
            message: message.clone(),
        };
        match self.store.apply(member.id, command).await {
            Some(_) => {
                self.events.emit(SyncEvent::MemberSyncFailed {
                    member_id: member.id,
                    kind,
                    message,
                });
                SyncDisposition::Failed(kind)
            }
            None => SyncDisposition::Discarded,
        }
    }
}
