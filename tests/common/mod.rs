//! In-memory fakes of the upstream service traits
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fc_tracker_lib::application::{
    CatalogHandle, CollectionFetcher, MemberStore, Normalizer, OrchestratorSettings, SyncEventBus, SyncOrchestrator,
};
use fc_tracker_lib::domain::collection::ApiOwnedItem;
use fc_tracker_lib::domain::{
    CharacterResolver, CollectionSource, ContentCatalog, ContentItem, ContentType, ExternalId, FetchError,
    FetchErrorKind, ResolutionError, ResolvedCharacter, SourceKind, StructuredPayload, UpstreamPayload,
};
use fc_tracker_lib::infrastructure::config::{PacingConfig, PacingStrategy, UnmatchedPolicy};
use fc_tracker_lib::infrastructure::parsing::ScrapingConfig;

/// Tracks how many calls overlap
#[derive(Default)]
pub struct Concurrency {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeResolver {
    characters: Mutex<HashMap<(String, String), ResolvedCharacter>>,
    delay: Mutex<Duration>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn register(&self, name: &str, server: &str, external_id: &str, avatar_url: Option<&str>) {
        let resolved = ResolvedCharacter {
            external_id: ExternalId::new(external_id),
            name: name.to_string(),
            server: server.to_string(),
            avatar_url: avatar_url.map(str::to_string),
            exact_match: true,
        };
        self.characters
            .lock()
            .unwrap()
            .insert((name.to_string(), server.to_string()), resolved);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl CharacterResolver for FakeResolver {
    async fn resolve(&self, name: &str, server: &str) -> Result<ResolvedCharacter, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.characters
            .lock()
            .unwrap()
            .get(&(name.to_string(), server.to_string()))
            .cloned()
            .ok_or_else(|| ResolutionError::not_found(name, server))
    }
}

/// Collection source serving canned payloads keyed by external id
pub struct FakeSource {
    payloads: Mutex<HashMap<String, Result<UpstreamPayload, FetchErrorKind>>>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub concurrency: Concurrency,
}

impl FakeSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            payloads: Mutex::new(HashMap::new()),
            delay,
            calls: AtomicUsize::new(0),
            concurrency: Concurrency::default(),
        }
    }

    pub fn serve(&self, external_id: &str, payload: UpstreamPayload) {
        self.payloads
            .lock()
            .unwrap()
            .insert(external_id.to_string(), Ok(payload));
    }

    pub fn fail(&self, external_id: &str, kind: FetchErrorKind) {
        self.payloads
            .lock()
            .unwrap()
            .insert(external_id.to_string(), Err(kind));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionSource for FakeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::StructuredApi
    }

    async fn fetch_collections(&self, external_id: &ExternalId) -> Result<UpstreamPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.concurrency.enter();
        tokio::time::sleep(self.delay).await;
        self.concurrency.exit();

        let outcome = self.payloads.lock().unwrap().get(external_id.as_str()).cloned();
        match outcome {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(kind)) => Err(FetchError::new(kind, SourceKind::StructuredApi, "canned failure")),
            None => Err(FetchError::not_found(SourceKind::StructuredApi, "HTTP 404")),
        }
    }
}

fn owned(names: &[&str]) -> Vec<ApiOwnedItem> {
    names
        .iter()
        .map(|name| ApiOwnedItem {
            name: Some((*name).to_string()),
            ..ApiOwnedItem::default()
        })
        .collect()
}

/// Structured payload with per-type owned lists
pub fn payload(avatar: Option<&str>, mounts: &[&str], minions: &[&str], achievements: &[&str]) -> UpstreamPayload {
    let mut payload = StructuredPayload::default();
    payload.document.avatar = avatar.map(str::to_string);
    payload.set_owned(ContentType::Mount, owned(mounts));
    payload.set_owned(ContentType::Minion, owned(minions));
    payload.set_owned(ContentType::Achievement, owned(achievements));
    UpstreamPayload::Structured(payload)
}

pub fn catalog() -> ContentCatalog {
    ContentCatalog {
        mounts: vec![
            ContentItem::new(1_u64, "Kirin", ContentType::Mount),
            ContentItem::new(2_u64, "Fat Cat Gold", ContentType::Mount),
            ContentItem::new(3_u64, "Sabotender Emperador", ContentType::Mount),
        ],
        minions: vec![ContentItem::new(10_u64, "Wind-up Cursor", ContentType::Minion)],
        achievements: vec![ContentItem::new(100_u64, "Saddle Sore", ContentType::Achievement)],
    }
}

pub fn fixed_pacing(interval_ms: u64) -> PacingConfig {
    PacingConfig {
        strategy: PacingStrategy::Fixed,
        interval_ms,
        ..PacingConfig::default()
    }
}

pub struct Harness {
    pub store: MemberStore,
    pub catalog: CatalogHandle,
    pub resolver: Arc<FakeResolver>,
    pub source: Arc<FakeSource>,
    pub events: SyncEventBus,
    pub orchestrator: SyncOrchestrator,
}

pub fn harness(source_delay: Duration, pacing: PacingConfig) -> Harness {
    let store = MemberStore::new();
    let catalog = CatalogHandle::new(catalog());
    let resolver = Arc::new(FakeResolver::default());
    let source = Arc::new(FakeSource::new(source_delay));
    let events = SyncEventBus::default();

    let normalizer = Arc::new(Normalizer::new(&ScrapingConfig::default()).unwrap());
    let fetcher = CollectionFetcher::new(source.clone(), None, normalizer, Duration::from_secs(45));
    let settings = OrchestratorSettings {
        resolve_timeout: Duration::from_secs(20),
        unmatched_policy: UnmatchedPolicy::Count,
        pacing,
    };
    let orchestrator = SyncOrchestrator::new(
        store.clone(),
        catalog.clone(),
        resolver.clone(),
        fetcher,
        settings,
        events.clone(),
    );

    Harness {
        store,
        catalog,
        resolver,
        source,
        events,
        orchestrator,
    }
}
