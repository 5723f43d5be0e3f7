//! HTTP client for upstream requests with rate limiting
//!
//! Responses are returned with their status instead of being turned into
//! errors, so each caller can map statuses to its own domain errors (a 404 is
//! "character not found", not a transport failure).

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::config::UpstreamConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Failed to create HTTP client: {0}")]
    Build(String),

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

impl HttpError {
    pub fn request(url: &Url, message: impl ToString) -> Self {
        Self::Request {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

impl From<&UpstreamConfig> for HttpClientConfig {
    fn from(upstream: &UpstreamConfig) -> Self {
        Self {
            user_agent: upstream.user_agent.clone(),
            timeout_seconds: upstream.request_timeout_seconds,
            max_requests_per_second: upstream.max_requests_per_second,
            follow_redirects: true,
        }
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// The `error` field of a JSON error body, if there is one
    pub fn error_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        value.get("error")?.as_str().map(str::to_string)
    }
}

/// GET capability shared by every upstream adapter
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchedPage, HttpError>;
}

/// reqwest client behind a process-wide rate limiter
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| HttpError::Build(format!("Invalid user agent: {e}")))?,
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .ok_or_else(|| HttpError::Build("Rate limit must be greater than 0".to_string()))?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self { client, rate_limiter })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn get(&self, url: &Url) -> Result<FetchedPage, HttpError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| HttpError::request(url, e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| HttpError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("Fetched {} ({}, {} bytes)", url, status, body.len());
        Ok(FetchedPage::new(url.as_str(), status, body))
    }
}

/// Append path segments to a base URL, keeping the base path
pub fn join_segments<I, S>(base: &str, segments: I) -> Result<Url, url::ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = Url::parse(base)?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment.as_ref());
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        assert!(HttpClient::new(HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(matches!(HttpClient::new(config), Err(HttpError::Build(_))));
    }

    #[test]
    fn segments_are_appended_and_escaped() {
        let url = join_segments("https://ffxivcollect.com/api/", ["characters", "123", "mounts", "owned"]).unwrap();
        assert_eq!(url.as_str(), "https://ffxivcollect.com/api/characters/123/mounts/owned");

        let url = join_segments("https://example.com/lodestone", ["character", "a b"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/lodestone/character/a%20b");
    }

    #[test]
    fn error_message_reads_json_error_field() {
        let page = FetchedPage::new("u", 500, r#"{"error": "Lodestone is under maintenance"}"#);
        assert_eq!(page.error_message().as_deref(), Some("Lodestone is under maintenance"));
        assert_eq!(FetchedPage::new("u", 500, "<html>").error_message(), None);
    }
}
