//! Wiring of the sync pipeline from [`AppConfig`]

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use super::catalog_handle::CatalogHandle;
use super::collection_fetcher::CollectionFetcher;
use super::events::SyncEventBus;
use super::member_store::MemberStore;
use super::normalizer::Normalizer;
use super::sync_orchestrator::{OrchestratorSettings, SyncOrchestrator};
use crate::domain::{CharacterResolver, CollectionSource, ContentCatalogProvider, RosterProvider, SourceKind};
use crate::infrastructure::config::{AppConfig, ResolverKind};
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig, PageFetcher};
use crate::infrastructure::{
    HttpContentCatalog, HttpRosterProvider, LodestoneSearchResolver, ScrapedHtmlSource, SearchApiResolver,
    StructuredApiSource,
};

/// Everything a front end needs to drive syncs
pub struct SyncServices {
    pub store: MemberStore,
    pub catalog: CatalogHandle,
    pub catalog_provider: Arc<dyn ContentCatalogProvider>,
    pub roster: Arc<dyn RosterProvider>,
    pub events: SyncEventBus,
    pub orchestrator: Arc<SyncOrchestrator>,
}

pub fn build_services(config: &AppConfig) -> Result<SyncServices> {
    config.validate().context("Invalid configuration")?;

    let client = HttpClient::new(HttpClientConfig::from(&config.upstream)).context("Failed to build HTTP client")?;
    build_services_with_fetcher(config, Arc::new(client))
}

/// Build the pipeline on top of an arbitrary page fetcher
pub fn build_services_with_fetcher(config: &AppConfig, fetcher: Arc<dyn PageFetcher>) -> Result<SyncServices> {
    let resolver = build_resolver(config, Arc::clone(&fetcher))?;
    let primary = build_source(config, config.sync.primary_source, Arc::clone(&fetcher))?;
    let fallback = config
        .sync
        .fallback_source
        .map(|kind| build_source(config, kind, Arc::clone(&fetcher)))
        .transpose()?;

    let normalizer = Normalizer::new(&config.scraping).context("Invalid scraping selectors")?;
    let collection_fetcher = CollectionFetcher::new(
        primary,
        fallback,
        Arc::new(normalizer),
        config.sync.fetch_timeout(),
    );

    let catalog_provider: Arc<dyn ContentCatalogProvider> = Arc::new(HttpContentCatalog::new(
        Arc::clone(&fetcher),
        config.upstream.content_api_base_url.clone(),
    ));
    let roster: Arc<dyn RosterProvider> = Arc::new(
        HttpRosterProvider::new(
            Arc::clone(&fetcher),
            config.upstream.collect_site_base_url.clone(),
            &config.scraping.roster,
        )
        .context("Invalid roster selectors")?,
    );

    let store = MemberStore::new();
    let catalog = CatalogHandle::default();
    let events = SyncEventBus::default();
    let orchestrator = SyncOrchestrator::new(
        store.clone(),
        catalog.clone(),
        resolver,
        collection_fetcher,
        OrchestratorSettings::from(&config.sync),
        events.clone(),
    );

    info!(
        "Sync pipeline ready: resolver {:?}, primary {}, fallback {}",
        config.sync.resolver,
        config.sync.primary_source,
        config
            .sync
            .fallback_source
            .map_or_else(|| "none".to_string(), |kind| kind.to_string()),
    );

    Ok(SyncServices {
        store,
        catalog,
        catalog_provider,
        roster,
        events,
        orchestrator: Arc::new(orchestrator),
    })
}

fn build_resolver(config: &AppConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Arc<dyn CharacterResolver>> {
    let require_exact = config.sync.require_exact_match;
    let resolver: Arc<dyn CharacterResolver> = match config.sync.resolver {
        ResolverKind::LodestoneSearch => Arc::new(
            LodestoneSearchResolver::new(
                fetcher,
                config.upstream.lodestone_base_url.clone(),
                &config.scraping.search,
                require_exact,
            )
            .context("Invalid search result selectors")?,
        ),
        ResolverKind::SearchApi => Arc::new(SearchApiResolver::new(
            fetcher,
            config.upstream.search_api_base_url.clone(),
            require_exact,
        )),
    };
    Ok(resolver)
}

fn build_source(
    config: &AppConfig,
    kind: SourceKind,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<Arc<dyn CollectionSource>> {
    let source: Arc<dyn CollectionSource> = match kind {
        SourceKind::StructuredApi => Arc::new(StructuredApiSource::new(
            fetcher,
            config.upstream.collect_api_base_url.clone(),
            config.sync.per_type_requests,
        )),
        SourceKind::ScrapedHtml => Arc::new(
            ScrapedHtmlSource::new(
                fetcher,
                config.upstream.lodestone_base_url.clone(),
                &config.scraping.profile,
            )
            .context("Invalid profile selectors")?,
        ),
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::{FetchedPage, HttpError};
    use async_trait::async_trait;
    use url::Url;

    struct OfflineFetcher;

    #[async_trait]
    impl PageFetcher for OfflineFetcher {
        async fn get(&self, url: &Url) -> Result<FetchedPage, HttpError> {
            Err(HttpError::request(url, "offline"))
        }
    }

    #[tokio::test]
    async fn offline_sync_records_resolution_failure() {
        let services = build_services_with_fetcher(&AppConfig::default(), Arc::new(OfflineFetcher)).unwrap();
        let member = services.store.add_member("Cloud Strife", "Excalibur").await;

        let disposition = services.orchestrator.sync_one(member.id).await;
        assert_eq!(
            disposition,
            crate::application::SyncDisposition::Failed(crate::domain::SyncFailureKind::ResolutionTransportError)
        );
        let stored = services.store.get(member.id).await.unwrap();
        assert!(stored.last_error.unwrap().contains("offline"));
    }

    #[test]
    fn fallback_equal_to_primary_is_rejected() {
        let mut config = AppConfig::default();
        config.sync.fallback_source = Some(config.sync.primary_source);
        assert!(build_services(&config).is_err());
    }
}
