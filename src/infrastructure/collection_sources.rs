//! Collection fetch strategies
//!
//! - [`StructuredApiSource`]: FFXIVCollect-style JSON API
//! - [`ScrapedHtmlSource`]: Lodestone profile page plus one subpage per type
//!
//! Both only classify the upstream response; turning the payload into owned
//! item lists is the normalizer's job.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::http_client::{FetchedPage, HttpError, PageFetcher, join_segments};
use super::parsing::{ParsingResult, ProfileInspection, ProfileParser, ProfileSelectors};
use crate::domain::collection::{ApiOwnedItem, CharacterDocument};
use crate::domain::{
    CollectionSource, ContentType, ExternalId, FetchError, FetchErrorKind, ScrapedPages, SourceKind,
    StructuredPayload, UpstreamPayload,
};

fn build_url<const N: usize>(source: SourceKind, base: &str, segments: [&str; N]) -> Result<Url, FetchError> {
    join_segments(base, segments).map_err(|e| FetchError::transport(source, format!("Invalid URL: {e}")))
}

fn transport_error(source: SourceKind, error: &HttpError) -> FetchError {
    FetchError::transport(source, error.to_string())
}

fn status_message(page: &FetchedPage) -> String {
    page.error_message()
        .unwrap_or_else(|| format!("HTTP {}", page.status))
}

/// Structured JSON strategy
pub struct StructuredApiSource {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    per_type_requests: bool,
}

impl StructuredApiSource {
    const KIND: SourceKind = SourceKind::StructuredApi;

    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>, per_type_requests: bool) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            per_type_requests,
        }
    }

    async fn fetch_summary(&self, external_id: &ExternalId) -> Result<CharacterDocument, FetchError> {
        let url = build_url(Self::KIND, &self.base_url, ["characters", external_id.as_str()])?;
        let page = self
            .fetcher
            .get(&url)
            .await
            .map_err(|e| transport_error(Self::KIND, &e))?;

        match page.status {
            404 => Err(FetchError::not_found(Self::KIND, format!("no character with id {external_id}"))),
            403 => Err(FetchError::private_profile(Self::KIND, status_message(&page))),
            _ if !page.is_success() => Err(FetchError::transport(Self::KIND, status_message(&page))),
            _ => page
                .json::<CharacterDocument>()
                .map_err(|e| FetchError::parse(Self::KIND, format!("invalid character document: {e}"))),
        }
    }

    async fn fetch_owned(
        &self,
        external_id: &ExternalId,
        content_type: ContentType,
    ) -> Result<Vec<ApiOwnedItem>, FetchError> {
        let url = build_url(
            Self::KIND,
            &self.base_url,
            ["characters", external_id.as_str(), content_type.plural(), "owned"],
        )?;
        let page = self
            .fetcher
            .get(&url)
            .await
            .map_err(|e| transport_error(Self::KIND, &e))?;

        if page.is_not_found() {
            return Err(FetchError::not_found(
                Self::KIND,
                format!("no {content_type} list for character {external_id}"),
            ));
        }
        if !page.is_success() {
            return Err(FetchError::transport(Self::KIND, status_message(&page)));
        }
        page.json::<Vec<ApiOwnedItem>>()
            .map_err(|e| FetchError::parse(Self::KIND, format!("invalid {content_type} list: {e}")))
    }
}

#[async_trait]
impl CollectionSource for StructuredApiSource {
    fn kind(&self) -> SourceKind {
        Self::KIND
    }

    async fn fetch_collections(&self, external_id: &ExternalId) -> Result<UpstreamPayload, FetchError> {
        let document = self.fetch_summary(external_id).await?;
        let mut payload = StructuredPayload {
            document,
            ..StructuredPayload::default()
        };

        if self.per_type_requests {
            let results = join_all(
                ContentType::ALL
                    .into_iter()
                    .map(|content_type| self.fetch_owned(external_id, content_type)),
            )
            .await;

            for (content_type, result) in ContentType::ALL.into_iter().zip(results) {
                match result {
                    Ok(items) => payload.set_owned(content_type, items),
                    Err(e) if e.kind == FetchErrorKind::NotFound => return Err(e),
                    Err(e) => {
                        warn!(
                            "Owned {} for {} unavailable, using summary entries: {}",
                            content_type, external_id, e
                        );
                    }
                }
            }
        }

        info!("Fetched structured collections for {}", external_id);
        Ok(UpstreamPayload::Structured(payload))
    }
}

/// Decide whether a base profile response can be parsed.
///
/// Checks run in order: missing character, private marker, missing name element.
pub fn classify_profile_response(
    page: &FetchedPage,
    parser: &ProfileParser,
    external_id: &ExternalId,
) -> Result<(), FetchError> {
    const KIND: SourceKind = SourceKind::ScrapedHtml;

    if page.is_not_found() {
        return Err(FetchError::not_found(KIND, format!("no profile for character {external_id}")));
    }
    if !page.is_success() {
        return Err(FetchError::transport(KIND, format!("HTTP {} for {}", page.status, page.url)));
    }
    match parser.inspect(&page.body) {
        ProfileInspection::Private => Err(FetchError::private_profile(
            KIND,
            format!("profile of character {external_id} is private"),
        )),
        ProfileInspection::MissingName => Err(FetchError::parse(
            KIND,
            "character name element not found on profile page",
        )),
        ProfileInspection::Profile(_) => Ok(()),
    }
}

/// Scraped HTML strategy
pub struct ScrapedHtmlSource {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    profile_parser: ProfileParser,
}

impl ScrapedHtmlSource {
    const KIND: SourceKind = SourceKind::ScrapedHtml;

    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        base_url: impl Into<String>,
        selectors: &ProfileSelectors,
    ) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            base_url: base_url.into(),
            profile_parser: ProfileParser::new(selectors)?,
        })
    }

    async fn get(&self, url: Url) -> Result<FetchedPage, FetchError> {
        self.fetcher
            .get(&url)
            .await
            .map_err(|e| transport_error(Self::KIND, &e))
    }

    /// Subpage body, or `None` when that section is private on its own
    fn accept_subpage(
        &self,
        content_type: ContentType,
        result: Result<FetchedPage, FetchError>,
    ) -> Result<Option<String>, FetchError> {
        let page = result?;
        if !page.is_success() {
            return Err(FetchError::transport(
                Self::KIND,
                format!("HTTP {} for {} subpage", page.status, content_type),
            ));
        }
        if self.profile_parser.is_private(&page.body) {
            warn!("{} section is private, keeping previous completion", content_type);
            return Ok(None);
        }
        Ok(Some(page.body))
    }
}

#[async_trait]
impl CollectionSource for ScrapedHtmlSource {
    fn kind(&self) -> SourceKind {
        Self::KIND
    }

    async fn fetch_collections(&self, external_id: &ExternalId) -> Result<UpstreamPayload, FetchError> {
        let id = external_id.as_str();
        let profile_url = build_url(Self::KIND, &self.base_url, ["character", id, ""])?;
        let mut subpage_urls = Vec::with_capacity(ContentType::ALL.len());
        for content_type in ContentType::ALL {
            subpage_urls.push(build_url(
                Self::KIND,
                &self.base_url,
                ["character", id, content_type.singular(), ""],
            )?);
        }

        let (profile, subpages) = tokio::join!(
            self.get(profile_url),
            join_all(subpage_urls.into_iter().map(|url| self.get(url)))
        );

        let profile = profile?;
        classify_profile_response(&profile, &self.profile_parser, external_id)?;

        let mut pages = ScrapedPages {
            profile_html: profile.body,
            ..ScrapedPages::default()
        };
        for (content_type, result) in ContentType::ALL.into_iter().zip(subpages) {
            let body = self.accept_subpage(content_type, result)?;
            match content_type {
                ContentType::Mount => pages.mounts_html = body,
                ContentType::Minion => pages.minions_html = body,
                ContentType::Achievement => pages.achievements_html = body,
            }
        }

        debug!("Fetched profile and subpages for {}", external_id);
        Ok(UpstreamPayload::Scraped(pages))
    }
}
