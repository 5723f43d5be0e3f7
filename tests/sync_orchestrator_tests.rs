//! Orchestrator behaviour against in-memory upstream fakes
mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{fixed_pacing, harness, payload};
use fc_tracker_lib::application::{SkipReason, SyncDisposition};
use fc_tracker_lib::domain::{
    ContentId, ContentType, ExternalId, FcMember, FetchErrorKind, RosterEntry, ScrapedPages, SyncFailureKind,
    SyncState, UpstreamPayload,
};
use fc_tracker_lib::infrastructure::config::PacingConfig;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn ids(member: &FcMember, content_type: ContentType) -> HashSet<ContentId> {
    member.completed_content.get(content_type).cloned().unwrap_or_default()
}

fn numeric(values: &[u64]) -> HashSet<ContentId> {
    values.iter().map(|v| ContentId::Numeric(*v)).collect()
}

#[tokio::test]
async fn kirin_lowercase_is_matched() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["kirin"], &[], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;

    assert_eq!(h.orchestrator.sync_one(member.id).await, SyncDisposition::Succeeded);

    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(ids(&synced, ContentType::Mount), numeric(&[1]));
    assert_eq!(synced.sync_state, SyncState::Succeeded);
    assert_eq!(synced.external_id, Some(ExternalId::new("101")));
    assert!(synced.last_sync_time.is_some());
}

#[tokio::test]
async fn punctuation_is_ignored_when_matching() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Tifa Lockhart", "Excalibur", "102", None);
    h.source.serve("102", payload(None, &["Fat Cat (Gold)"], &["wind-up cursor"], &["Unknown Feat"]));
    let member = h.store.add_member("Tifa Lockhart", "Excalibur").await;

    h.orchestrator.sync_one(member.id).await;

    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(ids(&synced, ContentType::Mount), numeric(&[2]));
    assert_eq!(ids(&synced, ContentType::Minion), numeric(&[10]));
    assert!(ids(&synced, ContentType::Achievement).is_empty());
}

#[tokio::test]
async fn resync_of_unchanged_upstream_is_idempotent() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin", "Sabotender Emperador"], &["Wind-up Cursor"], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;

    h.orchestrator.sync_one(member.id).await;
    let first = h.store.get(member.id).await.unwrap();
    h.orchestrator.sync_one(member.id).await;
    let second = h.store.get(member.id).await.unwrap();

    assert_eq!(first.completed_content, second.completed_content);
    // The external id is cached after the first resolution
    assert_eq!(h.resolver.calls(), 1);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn sync_replaces_rather_than_merges() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin", "Fat Cat Gold"], &[], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;
    h.orchestrator.sync_one(member.id).await;

    h.source.serve("101", payload(None, &["Sabotender Emperador"], &[], &[]));
    h.orchestrator.sync_one(member.id).await;

    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(ids(&synced, ContentType::Mount), numeric(&[3]));
}

#[tokio::test]
async fn private_profile_keeps_previous_completion() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &[], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;
    h.orchestrator.sync_one(member.id).await;

    h.source.fail("101", FetchErrorKind::PrivateProfile);
    let disposition = h.orchestrator.sync_one(member.id).await;
    assert_eq!(disposition, SyncDisposition::Failed(SyncFailureKind::FetchPrivateProfile));

    let failed = h.store.get(member.id).await.unwrap();
    assert_eq!(failed.sync_state, SyncState::Failed);
    assert_eq!(ids(&failed, ContentType::Mount), numeric(&[1]));
    let message = failed.last_error.unwrap();
    assert!(message.contains("private"), "unexpected message: {message}");
    assert!(!message.contains("not found"));
}

#[tokio::test]
async fn fetch_not_found_leaves_id_and_content_alone() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.store
        .add_from_roster(&[RosterEntry {
            name: "Aerith Gainsborough".to_string(),
            external_id: ExternalId::new("404"),
            server: Some("Excalibur".to_string()),
        }])
        .await;
    let stored = h.store.list().await.remove(0);

    let disposition = h.orchestrator.sync_one(stored.id).await;
    assert_eq!(disposition, SyncDisposition::Failed(SyncFailureKind::FetchNotFound));

    let failed = h.store.get(stored.id).await.unwrap();
    assert_eq!(failed.sync_state, SyncState::Failed);
    assert_eq!(failed.external_id, Some(ExternalId::new("404")));
    assert!(failed.completed_content.get(ContentType::Mount).is_none());
    assert!(failed.last_error.is_some());
    // Roster members carry their id, so resolution is skipped
    assert_eq!(h.resolver.calls(), 0);
}

#[tokio::test]
async fn unresolvable_character_fails_without_external_id() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    let member = h.store.add_member("Nobody", "Excalibur").await;

    let disposition = h.orchestrator.sync_one(member.id).await;
    assert_eq!(disposition, SyncDisposition::Failed(SyncFailureKind::ResolutionNotFound));

    let failed = h.store.get(member.id).await.unwrap();
    assert!(failed.external_id.is_none());
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_resolution_times_out_as_transport_failure() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.resolver.set_delay(Duration::from_secs(60));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;

    let started = Instant::now();
    let disposition = h.orchestrator.sync_one(member.id).await;
    assert_eq!(disposition, SyncDisposition::Failed(SyncFailureKind::ResolutionTransportError));
    assert!(started.elapsed() < Duration::from_secs(21));

    let failed = h.store.get(member.id).await.unwrap();
    assert_eq!(failed.sync_state, SyncState::Failed);
    assert!(failed.last_error.unwrap().contains("timed out"));
    assert!(failed.external_id.is_none());
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test]
async fn private_section_keeps_previous_set_for_that_type() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &["Wind-up Cursor"], &["Saddle Sore"]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;
    h.orchestrator.sync_one(member.id).await;

    let pages = ScrapedPages {
        profile_html: r#"<p class="frame__chara__name">Cloud Strife</p>"#.to_string(),
        mounts_html: Some(
            r#"<ul class="character__mounts"><li><span class="character__item_name">Fat Cat Gold</span></li></ul>"#
                .to_string(),
        ),
        minions_html: None,
        achievements_html: Some("<html><body></body></html>".to_string()),
    };
    h.source.serve("101", UpstreamPayload::Scraped(pages));

    assert_eq!(h.orchestrator.sync_one(member.id).await, SyncDisposition::Succeeded);

    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(ids(&synced, ContentType::Mount), numeric(&[2]));
    assert_eq!(ids(&synced, ContentType::Minion), numeric(&[10]));
    assert!(ids(&synced, ContentType::Achievement).is_empty());
}

#[tokio::test]
async fn avatar_prefers_fetched_then_resolved_then_previous() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", Some("https://img/resolved.jpg"));
    h.source.serve("101", payload(None, &[], &[], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;

    h.orchestrator.sync_one(member.id).await;
    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(synced.avatar_url.as_deref(), Some("https://img/resolved.jpg"));

    h.source.serve("101", payload(Some("https://img/fetched.jpg"), &[], &[], &[]));
    h.orchestrator.sync_one(member.id).await;
    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(synced.avatar_url.as_deref(), Some("https://img/fetched.jpg"));

    h.source.serve("101", payload(None, &[], &[], &[]));
    h.orchestrator.sync_one(member.id).await;
    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(synced.avatar_url.as_deref(), Some("https://img/fetched.jpg"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_sync_of_same_member_is_skipped() {
    let h = harness(Duration::from_secs(1), PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &[], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;

    let (first, second) = tokio::join!(h.orchestrator.sync_one(member.id), h.orchestrator.sync_one(member.id));

    assert_eq!(first, SyncDisposition::Succeeded);
    assert_eq!(second, SyncDisposition::Skipped(SkipReason::AlreadySyncing));
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn removal_mid_sync_discards_result() {
    let h = harness(Duration::from_secs(1), PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &[], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;

    let remove = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        h.store.remove(member.id).await
    };
    let (disposition, removed) = tokio::join!(h.orchestrator.sync_one(member.id), remove);

    assert!(removed.is_some());
    assert_eq!(disposition, SyncDisposition::Discarded);
    assert!(h.store.is_empty().await);
    assert_eq!(
        h.orchestrator.sync_one(member.id).await,
        SyncDisposition::Skipped(SkipReason::MemberMissing)
    );
}

#[tokio::test(start_paused = true)]
async fn guild_sync_is_serialized_and_paced() {
    let h = harness(Duration::from_secs(1), fixed_pacing(2000));
    for (index, name) in ["Cloud Strife", "Tifa Lockhart", "Barret Wallace"].iter().enumerate() {
        let external_id = format!("{}", 101 + index);
        h.resolver.register(name, "Excalibur", &external_id, None);
        h.source.serve(&external_id, payload(None, &["Kirin"], &[], &[]));
        h.store.add_member(*name, "Excalibur").await;
    }

    let started = Instant::now();
    let report = h.orchestrator.sync_all(&CancellationToken::new()).await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 3);
    assert!(!report.cancelled);
    assert_eq!(h.source.concurrency.peak(), 1);
    assert_eq!(h.source.calls(), 3);
    // Three fetches plus two pauses; no pause after the last member
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3 + 2 * 2), "finished too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(7_100), "finished too late: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn one_failure_does_not_abort_guild_sync() {
    let h = harness(Duration::ZERO, fixed_pacing(0));
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &[], &[]));
    h.store.add_member("Nobody", "Excalibur").await;
    h.store.add_member("Cloud Strife", "Excalibur").await;

    let report = h.orchestrator.sync_all(&CancellationToken::new()).await;
    assert_eq!((report.attempted, report.succeeded, report.failed), (2, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_members() {
    let h = harness(Duration::from_secs(1), fixed_pacing(2000));
    for (index, name) in ["Cloud Strife", "Tifa Lockhart", "Barret Wallace"].iter().enumerate() {
        let external_id = format!("{}", 101 + index);
        h.resolver.register(name, "Excalibur", &external_id, None);
        h.source.serve(&external_id, payload(None, &["Kirin"], &[], &[]));
        h.store.add_member(*name, "Excalibur").await;
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let cancel_later = async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    };
    let (report, ()) = tokio::join!(h.orchestrator.sync_all(&cancel), cancel_later);

    // The in-flight member finishes; the pacing wait observes the cancel
    assert!(report.cancelled);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    let states: Vec<SyncState> = h.store.list().await.into_iter().map(|m| m.sync_state).collect();
    assert_eq!(states, vec![SyncState::Succeeded, SyncState::Idle, SyncState::Idle]);
}

#[tokio::test]
async fn events_follow_the_pipeline() {
    let h = harness(Duration::ZERO, fixed_pacing(0));
    let mut rx = h.events.subscribe();
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &[], &[]));
    h.store.add_member("Cloud Strife", "Excalibur").await;

    h.orchestrator.sync_all(&CancellationToken::new()).await;

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.event_name());
    }
    assert_eq!(
        names,
        vec![
            "member-sync-started",
            "character-resolved",
            "member-sync-succeeded",
            "guild-sync-finished"
        ]
    );
}

#[tokio::test]
async fn empty_catalog_slice_clears_that_type() {
    let h = harness(Duration::ZERO, PacingConfig::default());
    h.resolver.register("Cloud Strife", "Excalibur", "101", None);
    h.source.serve("101", payload(None, &["Kirin"], &["Wind-up Cursor"], &[]));
    let member = h.store.add_member("Cloud Strife", "Excalibur").await;
    h.orchestrator.sync_one(member.id).await;

    let without_minions = h.catalog.snapshot().await.with_items(ContentType::Minion, Vec::new());
    h.catalog.replace(without_minions).await;
    h.orchestrator.sync_one(member.id).await;

    let synced = h.store.get(member.id).await.unwrap();
    assert_eq!(ids(&synced, ContentType::Mount), numeric(&[1]));
    assert!(ids(&synced, ContentType::Minion).is_empty());
}
