//! Primary/fallback collection fetching with a per-attempt timeout

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::normalizer::Normalizer;
use crate::domain::{CollectionSource, ExternalId, FetchError, NormalizedCharacter, UpstreamPayload};

pub struct CollectionFetcher {
    primary: Arc<dyn CollectionSource>,
    fallback: Option<Arc<dyn CollectionSource>>,
    normalizer: Arc<Normalizer>,
    timeout: Duration,
}

impl CollectionFetcher {
    pub fn new(
        primary: Arc<dyn CollectionSource>,
        fallback: Option<Arc<dyn CollectionSource>>,
        normalizer: Arc<Normalizer>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            normalizer,
            timeout,
        }
    }

    /// Fetch and normalize.
    ///
    /// The fallback is only consulted for transport and parse failures; when it
    /// fails too, its error is returned.
    pub async fn fetch(&self, external_id: &ExternalId) -> Result<NormalizedCharacter, FetchError> {
        let payload = match self.fetch_from(self.primary.as_ref(), external_id).await {
            Ok(payload) => payload,
            Err(primary_error) => match &self.fallback {
                Some(fallback) if primary_error.allows_fallback() => {
                    warn!("{}; trying {} instead", primary_error, fallback.kind());
                    let payload = self.fetch_from(fallback.as_ref(), external_id).await?;
                    info!("Fetched {} from fallback {}", external_id, fallback.kind());
                    payload
                }
                _ => return Err(primary_error),
            },
        };

        Ok(self.normalizer.normalize(&payload))
    }

    async fn fetch_from(
        &self,
        source: &dyn CollectionSource,
        external_id: &ExternalId,
    ) -> Result<UpstreamPayload, FetchError> {
        tokio::time::timeout(self.timeout, source.fetch_collections(external_id))
            .await
            .map_err(|_| {
                FetchError::transport(
                    source.kind(),
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentType, FetchErrorKind, SourceKind, StructuredPayload};
    use crate::infrastructure::parsing::ScrapingConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        kind: SourceKind,
        outcome: Result<(), FetchErrorKind>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(kind: SourceKind, outcome: Result<(), FetchErrorKind>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CollectionSource for Scripted {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch_collections(&self, _: &ExternalId) -> Result<UpstreamPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.outcome {
                Ok(()) => {
                    let mut payload = StructuredPayload::default();
                    payload.set_owned(ContentType::Mount, serde_json::from_str(r#"[{"name": "Kirin"}]"#).unwrap());
                    Ok(UpstreamPayload::Structured(payload))
                }
                Err(kind) => Err(FetchError::new(kind, self.kind, "scripted")),
            }
        }
    }

    fn fetcher(primary: Arc<Scripted>, fallback: Option<Arc<Scripted>>) -> CollectionFetcher {
        let normalizer = Arc::new(Normalizer::new(&ScrapingConfig::default()).unwrap());
        CollectionFetcher::new(
            primary,
            fallback.map(|f| f as Arc<dyn CollectionSource>),
            normalizer,
            Duration::from_secs(45),
        )
    }

    #[tokio::test]
    async fn transport_failure_uses_fallback() {
        let primary = Scripted::new(SourceKind::StructuredApi, Err(FetchErrorKind::TransportError));
        let fallback = Scripted::new(SourceKind::ScrapedHtml, Ok(()));
        let normalized = fetcher(primary, Some(fallback.clone())).fetch(&ExternalId::new("1")).await.unwrap();
        assert_eq!(normalized.collections.mounts.len(), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn private_profile_is_not_retried_elsewhere() {
        let primary = Scripted::new(SourceKind::StructuredApi, Err(FetchErrorKind::PrivateProfile));
        let fallback = Scripted::new(SourceKind::ScrapedHtml, Ok(()));
        let err = fetcher(primary, Some(fallback.clone())).fetch(&ExternalId::new("1")).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::PrivateProfile);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_error_is_reported_when_both_fail() {
        let primary = Scripted::new(SourceKind::StructuredApi, Err(FetchErrorKind::ParseError));
        let fallback = Scripted::new(SourceKind::ScrapedHtml, Err(FetchErrorKind::NotFound));
        let err = fetcher(primary, Some(fallback)).fetch(&ExternalId::new("1")).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NotFound);
        assert_eq!(err.source_kind, SourceKind::ScrapedHtml);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_as_transport_error() {
        let primary = Arc::new(Scripted {
            kind: SourceKind::StructuredApi,
            outcome: Ok(()),
            delay: Duration::from_secs(60),
            calls: AtomicUsize::new(0),
        });
        let err = fetcher(primary, None).fetch(&ExternalId::new("1")).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::TransportError);
        assert!(err.message.contains("timed out"));
    }
}
