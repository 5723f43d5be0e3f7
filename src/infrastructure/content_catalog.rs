//! Content catalog accessor
//!
//! Thin pass-through to the catalog endpoint `GET {base}/{type}`. Three
//! response shapes are accepted: `{data: [...]}`, `{results: [...]}` and a
//! bare array.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::http_client::{PageFetcher, join_segments};
use crate::domain::content::CatalogRecord;
use crate::domain::{CatalogError, ContentCatalogProvider, ContentItem, ContentType};

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogResponse {
    Data { data: Vec<serde_json::Value> },
    Results { results: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl CatalogResponse {
    fn into_records(self) -> Vec<serde_json::Value> {
        match self {
            Self::Data { data } => data,
            Self::Results { results } => results,
            Self::Bare(records) => records,
        }
    }
}

/// Decode a catalog body; records without an id or name are skipped
pub fn decode_catalog(content_type: ContentType, body: &str) -> Result<Vec<ContentItem>, CatalogError> {
    let response: CatalogResponse = serde_json::from_str(body).map_err(|e| CatalogError::Decode {
        content_type,
        message: e.to_string(),
    })?;

    let records = response.into_records();
    let total = records.len();
    let items: Vec<ContentItem> = records
        .into_iter()
        .filter_map(|value| serde_json::from_value::<CatalogRecord>(value).ok())
        .map(|record| ContentItem::from_record(record, content_type))
        .collect();

    if items.len() < total {
        warn!("Skipped {} malformed {} catalog records", total - items.len(), content_type);
    }
    Ok(items)
}

pub struct HttpContentCatalog {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
}

impl HttpContentCatalog {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ContentCatalogProvider for HttpContentCatalog {
    async fn fetch_items(&self, content_type: ContentType) -> Result<Vec<ContentItem>, CatalogError> {
        let url = join_segments(&self.base_url, [content_type.plural()]).map_err(|e| CatalogError::Upstream {
            content_type,
            status: None,
            message: format!("Invalid URL: {e}"),
        })?;

        debug!("Fetching {} catalog from {}", content_type, url);
        let page = self.fetcher.get(&url).await.map_err(|e| CatalogError::Upstream {
            content_type,
            status: None,
            message: e.to_string(),
        })?;

        if !page.is_success() {
            return Err(CatalogError::Upstream {
                content_type,
                status: Some(page.status),
                message: page.error_message().unwrap_or_else(|| "unexpected response status".to_string()),
            });
        }

        let items = decode_catalog(content_type, &page.body)?;
        info!("Loaded {} {} from catalog", items.len(), content_type);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContentId;
    use rstest::rstest;

    #[rstest]
    #[case::data_wrapper(r#"{"type": "mounts", "count": 2, "data": [{"id": 1, "name": "Kirin"}, {"id": 2, "name": "Fat Cat"}]}"#)]
    #[case::results_wrapper(r#"{"count": 2, "results": [{"id": 1, "name": "Kirin"}, {"id": 2, "name": "Fat Cat"}]}"#)]
    #[case::bare_array(r#"[{"id": 1, "name": "Kirin"}, {"id": 2, "name": "Fat Cat"}]"#)]
    fn accepts_every_catalog_shape(#[case] body: &str) {
        let items = decode_catalog(ContentType::Mount, body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, ContentId::Numeric(1));
        assert_eq!(items[1].name, "Fat Cat");
        assert!(items.iter().all(|item| item.content_type == ContentType::Mount));
    }

    #[test]
    fn metadata_is_kept_and_malformed_records_skipped() {
        let body = r#"{"results": [
            {"id": "a-1", "name": "Wind-up Cursor", "patch": "2.0", "sources": [{"type": "Purchase", "text": "Gold Saucer"}]},
            {"name": "no id"}
        ]}"#;
        let items = decode_catalog(ContentType::Minion, body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, ContentId::Text("a-1".to_string()));
        assert_eq!(items[0].patch().as_deref(), Some("2.0"));
        assert_eq!(items[0].sources(), vec!["Purchase"]);
    }

    #[test]
    fn unknown_shape_is_a_decode_error() {
        let err = decode_catalog(ContentType::Achievement, r#"{"error": "Invalid content type"}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }
}
