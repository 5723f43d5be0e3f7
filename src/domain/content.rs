//! Content catalog entities
//!
//! Collectible content (mounts, minions, achievements) as published by the
//! catalog source. Items are immutable once loaded and only ever looked up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of collectible content tracked per member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[serde(alias = "mounts")]
    Mount,
    #[serde(alias = "minions")]
    Minion,
    #[serde(alias = "achievements")]
    Achievement,
}

impl ContentType {
    /// All content types, in display order
    pub const ALL: [Self; 3] = [Self::Mount, Self::Minion, Self::Achievement];

    /// Plural path segment used by the catalog and collection APIs
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Mount => "mounts",
            Self::Minion => "minions",
            Self::Achievement => "achievements",
        }
    }

    /// Singular path segment used by Lodestone profile subpages
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Minion => "minion",
            Self::Achievement => "achievement",
        }
    }

    /// Parse either the singular or plural form, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|ty| ty.plural() == lowered || ty.singular() == lowered)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Opaque catalog identifier; upstreams publish numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ContentId {
    fn from(id: u64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Catalog record as decoded from the catalog endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    pub id: ContentId,
    pub name: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A single collectible item of one content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub name: String,
    pub content_type: ContentType,
    /// Everything else the catalog publishes (patch, source, icon, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ContentItem {
    pub fn new(id: impl Into<ContentId>, name: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content_type,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn from_record(record: CatalogRecord, content_type: ContentType) -> Self {
        Self {
            id: record.id,
            name: record.name,
            content_type,
            metadata: record.metadata,
        }
    }

    /// Acquisition source labels.
    ///
    /// FFXIVCollect publishes `sources: [{type, text}]`; older payloads carry a
    /// flat `source` string. Both are read.
    pub fn sources(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        if let Some(source) = self.metadata.get("source").and_then(|v| v.as_str()) {
            labels.push(source);
        }
        if let Some(entries) = self.metadata.get("sources").and_then(|v| v.as_array()) {
            labels.extend(
                entries
                    .iter()
                    .filter_map(|entry| entry.get("type").and_then(|t| t.as_str())),
            );
        }
        labels
    }

    pub fn patch(&self) -> Option<String> {
        match self.metadata.get("patch")? {
            serde_json::Value::String(patch) => Some(patch.clone()),
            serde_json::Value::Number(patch) => Some(patch.to_string()),
            _ => None,
        }
    }
}

/// Read-only snapshot of the whole catalog, one slice per content type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub mounts: Vec<ContentItem>,
    pub minions: Vec<ContentItem>,
    pub achievements: Vec<ContentItem>,
}

impl ContentCatalog {
    pub fn items(&self, content_type: ContentType) -> &[ContentItem] {
        match content_type {
            ContentType::Mount => &self.mounts,
            ContentType::Minion => &self.minions,
            ContentType::Achievement => &self.achievements,
        }
    }

    /// Copy of this snapshot with one slice replaced
    #[must_use]
    pub fn with_items(&self, content_type: ContentType, items: Vec<ContentItem>) -> Self {
        let mut next = self.clone();
        match content_type {
            ContentType::Mount => next.mounts = items,
            ContentType::Minion => next.minions = items,
            ContentType::Achievement => next.achievements = items,
        }
        next
    }

    pub fn contains(&self, content_type: ContentType, id: &ContentId) -> bool {
        self.items(content_type).iter().any(|item| &item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        ContentType::ALL.iter().all(|ty| self.items(*ty).is_empty())
    }
}
