//! Character resolvers: `name@server` to external character id

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::http_client::{FetchedPage, PageFetcher, join_segments};
use super::parsing::{ParsingResult, SearchResultParser, SearchSelectors};
use crate::domain::{CharacterResolver, ExternalId, ResolutionError, ResolvedCharacter, SearchCandidate};

/// Pick the candidate for `name@server`.
///
/// An exact case-insensitive match on both name and server wins; otherwise the
/// first candidate is taken, unless `require_exact` is set.
pub fn select_candidate(
    candidates: Vec<SearchCandidate>,
    name: &str,
    server: &str,
    require_exact: bool,
) -> Result<ResolvedCharacter, ResolutionError> {
    let wanted_name = name.trim().to_lowercase();
    let wanted_server = server.trim().to_lowercase();

    let exact = candidates.iter().position(|candidate| {
        candidate.name.trim().to_lowercase() == wanted_name && candidate.server.trim().to_lowercase() == wanted_server
    });

    match exact {
        Some(index) => {
            let candidate = candidates.into_iter().nth(index);
            candidate
                .map(|candidate| ResolvedCharacter::from((candidate, true)))
                .ok_or_else(|| ResolutionError::not_found(name, server))
        }
        None if require_exact => {
            debug!("{} search results for {}@{} but none match exactly", candidates.len(), name, server);
            Err(ResolutionError::not_found(name, server))
        }
        None => candidates
            .into_iter()
            .next()
            .map(|candidate| ResolvedCharacter::from((candidate, false)))
            .ok_or_else(|| ResolutionError::not_found(name, server)),
    }
}

fn unexpected_status(page: &FetchedPage) -> ResolutionError {
    let message = page
        .error_message()
        .unwrap_or_else(|| "unexpected response status".to_string());
    ResolutionError::transport(Some(page.status), message)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchApiResult {
    name: String,
    server: String,
    #[serde(alias = "id")]
    external_id: serde_json::Value,
    #[serde(default, alias = "avatar")]
    avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    results: Option<Vec<SearchApiResult>>,
}

impl SearchApiResult {
    fn into_candidate(self) -> Option<SearchCandidate> {
        let external_id = match self.external_id {
            serde_json::Value::String(id) if !id.trim().is_empty() => id,
            serde_json::Value::Number(id) => id.to_string(),
            _ => return None,
        };
        Some(SearchCandidate {
            name: self.name,
            server: self.server,
            external_id: ExternalId::new(external_id),
            avatar_url: self.avatar_url,
        })
    }
}

/// Resolver backed by a JSON search endpoint: `GET {base}/search?name=&server=`
pub struct SearchApiResolver {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    require_exact_match: bool,
}

impl SearchApiResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>, require_exact_match: bool) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            require_exact_match,
        }
    }

    fn search_url(&self, name: &str, server: &str) -> Result<Url, ResolutionError> {
        let mut url =
            join_segments(&self.base_url, ["search"]).map_err(|e| ResolutionError::transport(None, e.to_string()))?;
        url.query_pairs_mut().append_pair("name", name).append_pair("server", server);
        Ok(url)
    }
}

#[async_trait]
impl CharacterResolver for SearchApiResolver {
    async fn resolve(&self, name: &str, server: &str) -> Result<ResolvedCharacter, ResolutionError> {
        let url = self.search_url(name, server)?;
        let page = self
            .fetcher
            .get(&url)
            .await
            .map_err(|e| ResolutionError::transport(None, e.to_string()))?;

        if page.is_not_found() {
            return Err(ResolutionError::not_found(name, server));
        }
        if !page.is_success() {
            return Err(unexpected_status(&page));
        }

        let response: SearchApiResponse = page
            .json()
            .map_err(|e| ResolutionError::transport(Some(page.status), format!("Invalid search response: {e}")))?;
        let candidates: Vec<SearchCandidate> = response
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(SearchApiResult::into_candidate)
            .collect();

        let resolved = select_candidate(candidates, name, server, self.require_exact_match)?;
        info!(
            "Resolved {}@{} to {} (exact: {})",
            name, server, resolved.external_id, resolved.exact_match
        );
        Ok(resolved)
    }
}

/// Resolver that scrapes the Lodestone character search page
pub struct LodestoneSearchResolver {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    parser: SearchResultParser,
    require_exact_match: bool,
}

impl LodestoneSearchResolver {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        base_url: impl Into<String>,
        selectors: &SearchSelectors,
        require_exact_match: bool,
    ) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            base_url: base_url.into(),
            parser: SearchResultParser::new(selectors)?,
            require_exact_match,
        })
    }

    fn search_url(&self, name: &str, server: &str) -> Result<Url, ResolutionError> {
        let mut url = join_segments(&self.base_url, ["character", ""])
            .map_err(|e| ResolutionError::transport(None, e.to_string()))?;
        url.query_pairs_mut().append_pair("q", name).append_pair("worldname", server);
        Ok(url)
    }
}

#[async_trait]
impl CharacterResolver for LodestoneSearchResolver {
    async fn resolve(&self, name: &str, server: &str) -> Result<ResolvedCharacter, ResolutionError> {
        let url = self.search_url(name, server)?;
        let page = self
            .fetcher
            .get(&url)
            .await
            .map_err(|e| ResolutionError::transport(None, e.to_string()))?;

        if !page.is_success() {
            return Err(unexpected_status(&page));
        }

        let candidates = self.parser.parse(&page.body, &url);
        debug!("Lodestone search for {}@{} returned {} entries", name, server, candidates.len());

        let resolved = select_candidate(candidates, name, server, self.require_exact_match)?;
        info!(
            "Resolved {}@{} to {} (exact: {})",
            name, server, resolved.external_id, resolved.exact_match
        );
        Ok(resolved)
    }
}
