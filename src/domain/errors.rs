//! Sync pipeline error taxonomy
//!
//! Resolution and fetch failures are terminal for one sync attempt. They are
//! captured on the member record and never propagated across members.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collection::SourceKind;

/// Character resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Character '{name}' not found on {server}")]
    NotFound { name: String, server: String },

    #[error("Character search failed{}: {message}", status_suffix(.status))]
    Transport { status: Option<u16>, message: String },
}

impl ResolutionError {
    pub fn not_found(name: &str, server: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
            server: server.to_string(),
        }
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }
}

/// Classification of collection fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    NotFound,
    PrivateProfile,
    ParseError,
    TransportError,
}

/// Collection fetch failure with a human-readable message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub source_kind: SourceKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source_kind,
            message: message.into(),
        }
    }

    pub fn not_found(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NotFound, source_kind, message)
    }

    pub fn private_profile(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::PrivateProfile, source_kind, message)
    }

    pub fn parse(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ParseError, source_kind, message)
    }

    pub fn transport(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::TransportError, source_kind, message)
    }

    /// Whether another strategy may succeed where this one failed
    pub const fn allows_fallback(&self) -> bool {
        matches!(
            self.kind,
            FetchErrorKind::TransportError | FetchErrorKind::ParseError
        )
    }

    fn describe(&self) -> String {
        match self.kind {
            FetchErrorKind::NotFound => {
                format!("Character not found on {} ({})", self.source_kind, self.message)
            }
            FetchErrorKind::PrivateProfile => {
                format!("Character profile is private on {}", self.source_kind)
            }
            FetchErrorKind::ParseError => format!(
                "Unexpected page structure from {}: {}",
                self.source_kind, self.message
            ),
            FetchErrorKind::TransportError => {
                format!("Could not reach {}: {}", self.source_kind, self.message)
            }
        }
    }
}

/// Failure classes recorded on the member record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFailureKind {
    ResolutionNotFound,
    ResolutionTransportError,
    FetchNotFound,
    FetchPrivateProfile,
    FetchParseError,
    FetchTransportError,
}

/// Why one member sync attempt failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl SyncFailure {
    pub const fn kind(&self) -> SyncFailureKind {
        match self {
            Self::Resolution(ResolutionError::NotFound { .. }) => SyncFailureKind::ResolutionNotFound,
            Self::Resolution(ResolutionError::Transport { .. }) => {
                SyncFailureKind::ResolutionTransportError
            }
            Self::Fetch(err) => match err.kind {
                FetchErrorKind::NotFound => SyncFailureKind::FetchNotFound,
                FetchErrorKind::PrivateProfile => SyncFailureKind::FetchPrivateProfile,
                FetchErrorKind::ParseError => SyncFailureKind::FetchParseError,
                FetchErrorKind::TransportError => SyncFailureKind::FetchTransportError,
            },
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_messages_distinguish_kinds() {
        let private = FetchError::private_profile(SourceKind::ScrapedHtml, "marker present");
        let missing = FetchError::not_found(SourceKind::ScrapedHtml, "HTTP 404");
        assert!(private.to_string().contains("private"));
        assert!(missing.to_string().contains("not found"));
        assert_ne!(private.to_string(), missing.to_string());
    }

    #[test]
    fn resolution_transport_includes_status() {
        let err = ResolutionError::transport(Some(503), "Service Unavailable");
        assert_eq!(
            err.to_string(),
            "Character search failed (HTTP 503): Service Unavailable"
        );
        let err = ResolutionError::transport(None, "connection reset");
        assert_eq!(err.to_string(), "Character search failed: connection reset");
    }

    #[test]
    fn failure_kind_maps_taxonomy() {
        let failure: SyncFailure = ResolutionError::not_found("A", "B").into();
        assert_eq!(failure.kind(), SyncFailureKind::ResolutionNotFound);
        let failure: SyncFailure = FetchError::parse(SourceKind::ScrapedHtml, "no name").into();
        assert_eq!(failure.kind(), SyncFailureKind::FetchParseError);
    }

    #[test]
    fn only_transient_kinds_allow_fallback() {
        assert!(FetchError::transport(SourceKind::StructuredApi, "x").allows_fallback());
        assert!(FetchError::parse(SourceKind::ScrapedHtml, "x").allows_fallback());
        assert!(!FetchError::not_found(SourceKind::StructuredApi, "x").allows_fallback());
        assert!(!FetchError::private_profile(SourceKind::StructuredApi, "x").allows_fallback());
    }
}
