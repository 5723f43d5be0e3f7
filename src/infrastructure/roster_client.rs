//! Free Company roster accessor: `GET {site}/fc/{fc_id}` HTML

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::http_client::{PageFetcher, join_segments};
use super::parsing::{ParsingResult, RosterParser, RosterSelectors};
use crate::domain::{RosterEntry, RosterError, RosterProvider};

pub struct HttpRosterProvider {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    parser: RosterParser,
}

impl HttpRosterProvider {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        base_url: impl Into<String>,
        selectors: &RosterSelectors,
    ) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            base_url: base_url.into(),
            parser: RosterParser::new(selectors)?,
        })
    }
}

#[async_trait]
impl RosterProvider for HttpRosterProvider {
    async fn fetch_roster(&self, fc_id: &str) -> Result<Vec<RosterEntry>, RosterError> {
        let error = |status: Option<u16>, message: String| RosterError {
            fc_id: fc_id.to_string(),
            status,
            message,
        };

        let fc_id = fc_id.trim();
        if fc_id.is_empty() {
            return Err(error(None, "Free Company ID is required".to_string()));
        }

        let url = join_segments(&self.base_url, ["fc", fc_id]).map_err(|e| error(None, e.to_string()))?;
        let page = self.fetcher.get(&url).await.map_err(|e| error(None, e.to_string()))?;
        if !page.is_success() {
            return Err(error(Some(page.status), "Failed to load FC page".to_string()));
        }

        let entries = self.parser.parse(&page.body);
        info!("Roster for free company {} lists {} members", fc_id, entries.len());
        Ok(entries)
    }
}
