//! Character collection data as it moves through the pipeline
//!
//! Upstream payloads (JSON documents or scraped pages) are carried as-is until
//! the normalizer turns them into canonical owned-item lists.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::content::ContentType;

/// Identifier both upstreams use to address one character (the Lodestone id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream strategy a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    StructuredApi,
    ScrapedHtml,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructuredApi => f.write_str("structured API"),
            Self::ScrapedHtml => f.write_str("Lodestone profile"),
        }
    }
}

/// One owned item in canonical form; transient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOwnedItem {
    pub name: String,
}

impl RawOwnedItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Canonical owned-item lists for all three content types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCollections {
    pub mounts: Vec<RawOwnedItem>,
    pub minions: Vec<RawOwnedItem>,
    pub achievements: Vec<RawOwnedItem>,
}

impl OwnedCollections {
    pub fn get(&self, content_type: ContentType) -> &[RawOwnedItem] {
        match content_type {
            ContentType::Mount => &self.mounts,
            ContentType::Minion => &self.minions,
            ContentType::Achievement => &self.achievements,
        }
    }

    pub fn set(&mut self, content_type: ContentType, items: Vec<RawOwnedItem>) {
        match content_type {
            ContentType::Mount => self.mounts = items,
            ContentType::Minion => self.minions = items,
            ContentType::Achievement => self.achievements = items,
        }
    }
}

/// Display data for the character, when the upstream provides it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: Option<String>,
    pub server: Option<String>,
    pub avatar_url: Option<String>,
}

/// Normalizer output: profile plus canonical collections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCharacter {
    pub profile: CharacterProfile,
    pub collections: OwnedCollections,
    /// Types the upstream kept private on their own; prior completion stands
    #[serde(default)]
    pub withheld: Vec<ContentType>,
}

impl NormalizedCharacter {
    pub fn is_withheld(&self, content_type: ContentType) -> bool {
        self.withheld.contains(&content_type)
    }
}

/// Owned item object as published by the structured API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiOwnedItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `{ "entries": [...] }` block used by FFXIVCollect summaries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEntriesBlock {
    #[serde(default)]
    pub entries: Option<Vec<ApiOwnedItem>>,
}

/// `{ "collections": { "mounts": [...], ... } }` block used by the proxy shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCollectionsBlock {
    #[serde(default)]
    pub mounts: Option<Vec<ApiOwnedItem>>,
    #[serde(default)]
    pub minions: Option<Vec<ApiOwnedItem>>,
    #[serde(default)]
    pub achievements: Option<Vec<ApiOwnedItem>>,
}

/// Character summary document from the structured API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub collections: Option<ApiCollectionsBlock>,
    #[serde(default)]
    pub mounts: Option<ApiEntriesBlock>,
    #[serde(default)]
    pub minions: Option<ApiEntriesBlock>,
    #[serde(default)]
    pub achievements: Option<ApiEntriesBlock>,
}

impl CharacterDocument {
    /// Owned entries embedded in the document, from either known shape
    pub fn embedded_entries(&self, content_type: ContentType) -> Option<&[ApiOwnedItem]> {
        let from_collections = self.collections.as_ref().and_then(|block| match content_type {
            ContentType::Mount => block.mounts.as_deref(),
            ContentType::Minion => block.minions.as_deref(),
            ContentType::Achievement => block.achievements.as_deref(),
        });
        from_collections.or_else(|| {
            let block = match content_type {
                ContentType::Mount => self.mounts.as_ref(),
                ContentType::Minion => self.minions.as_ref(),
                ContentType::Achievement => self.achievements.as_ref(),
            };
            block.and_then(|b| b.entries.as_deref())
        })
    }
}

/// Structured API payload: the summary plus optional per-type owned lists
#[derive(Debug, Clone, Default)]
pub struct StructuredPayload {
    pub document: CharacterDocument,
    pub mounts: Option<Vec<ApiOwnedItem>>,
    pub minions: Option<Vec<ApiOwnedItem>>,
    pub achievements: Option<Vec<ApiOwnedItem>>,
}

impl StructuredPayload {
    pub fn owned(&self, content_type: ContentType) -> Option<&[ApiOwnedItem]> {
        match content_type {
            ContentType::Mount => self.mounts.as_deref(),
            ContentType::Minion => self.minions.as_deref(),
            ContentType::Achievement => self.achievements.as_deref(),
        }
    }

    pub fn set_owned(&mut self, content_type: ContentType, items: Vec<ApiOwnedItem>) {
        match content_type {
            ContentType::Mount => self.mounts = Some(items),
            ContentType::Minion => self.minions = Some(items),
            ContentType::Achievement => self.achievements = Some(items),
        }
    }
}

/// Scraped profile: base page plus one HTML body per content subpage.
///
/// A subpage is `None` when that section is private on its own.
#[derive(Debug, Clone, Default)]
pub struct ScrapedPages {
    pub profile_html: String,
    pub mounts_html: Option<String>,
    pub minions_html: Option<String>,
    pub achievements_html: Option<String>,
}

impl ScrapedPages {
    pub fn subpage(&self, content_type: ContentType) -> Option<&str> {
        match content_type {
            ContentType::Mount => self.mounts_html.as_deref(),
            ContentType::Minion => self.minions_html.as_deref(),
            ContentType::Achievement => self.achievements_html.as_deref(),
        }
    }
}

/// Raw upstream payload handed from the fetcher to the normalizer
#[derive(Debug, Clone)]
pub enum UpstreamPayload {
    Structured(StructuredPayload),
    Scraped(ScrapedPages),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_reads_proxy_collections_shape() {
        let doc: CharacterDocument = serde_json::from_str(
            r#"{"name": "Cloud Strife", "server": "Excalibur",
                "collections": {"mounts": [{"name": "Kirin"}], "minions": []}}"#,
        )
        .unwrap();
        assert_eq!(doc.embedded_entries(ContentType::Mount).map(<[_]>::len), Some(1));
        assert_eq!(doc.embedded_entries(ContentType::Minion).map(<[_]>::len), Some(0));
        assert!(doc.embedded_entries(ContentType::Achievement).is_none());
    }

    #[test]
    fn document_reads_entries_shape() {
        let doc: CharacterDocument = serde_json::from_str(
            r#"{"name": "Cloud Strife", "mounts": {"count": 1, "entries": [{"name": "Kirin", "id": 3}]}}"#,
        )
        .unwrap();
        let mounts = doc.embedded_entries(ContentType::Mount).unwrap();
        assert_eq!(mounts[0].name.as_deref(), Some("Kirin"));
        assert_eq!(mounts[0].extra["id"], 3);
    }
}
