//! Shared, swappable content catalog snapshot
//!
//! Readers take an `Arc` snapshot and keep it for as long as they need; a
//! refresh builds a new snapshot and swaps it in. A content type that fails
//! to refresh keeps its previous slice.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{CatalogError, ContentCatalog, ContentCatalogProvider, ContentType};

/// Per-type outcome of a catalog refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogRefreshReport {
    pub loaded: Vec<(ContentType, usize)>,
    pub failed: Vec<(ContentType, String)>,
}

impl CatalogRefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<ContentCatalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: ContentCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub async fn snapshot(&self) -> Arc<ContentCatalog> {
        Arc::clone(&*self.current.read().await)
    }

    pub async fn replace(&self, catalog: ContentCatalog) {
        *self.current.write().await = Arc::new(catalog);
    }

    /// Refresh every content type concurrently
    pub async fn refresh(&self, provider: &dyn ContentCatalogProvider) -> CatalogRefreshReport {
        self.refresh_types(provider, &ContentType::ALL).await
    }

    /// Refresh one content type
    pub async fn refresh_type(
        &self,
        provider: &dyn ContentCatalogProvider,
        content_type: ContentType,
    ) -> Result<usize, CatalogError> {
        let items = provider.fetch_items(content_type).await?;
        let count = items.len();
        let mut current = self.current.write().await;
        *current = Arc::new(current.with_items(content_type, items));
        Ok(count)
    }

    async fn refresh_types(
        &self,
        provider: &dyn ContentCatalogProvider,
        content_types: &[ContentType],
    ) -> CatalogRefreshReport {
        let results = join_all(content_types.iter().map(|ty| provider.fetch_items(*ty))).await;

        let mut report = CatalogRefreshReport::default();
        let mut current = self.current.write().await;
        let mut next = ContentCatalog::clone(&current);

        for (content_type, result) in content_types.iter().copied().zip(results) {
            match result {
                Ok(items) => {
                    report.loaded.push((content_type, items.len()));
                    next = next.with_items(content_type, items);
                }
                Err(e) => {
                    warn!("Keeping previous {} catalog: {}", content_type, e);
                    report.failed.push((content_type, e.to_string()));
                }
            }
        }

        *current = Arc::new(next);
        info!(
            "Catalog refreshed: {} types loaded, {} failed",
            report.loaded.len(),
            report.failed.len()
        );
        report
    }
}
