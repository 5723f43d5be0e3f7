//! Upstream payload to canonical owned-item lists
//!
//! Normalization never fails: absent sections, blank names and unparsable
//! entries all shrink the output instead of producing an error.

use crate::domain::collection::ApiOwnedItem;
use crate::domain::{
    CharacterProfile, ContentType, NormalizedCharacter, OwnedCollections, RawOwnedItem, ScrapedPages,
    StructuredPayload, UpstreamPayload,
};
use crate::infrastructure::parsing::{
    CollectionListParser, ParsingResult, ProfileInspection, ProfileParser, ScrapingConfig,
};

/// Trim and collapse inner whitespace; `None` when nothing is left
pub fn clean_name(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.and_then(|v| clean_name(v))
}

pub struct Normalizer {
    profile_parser: ProfileParser,
    list_parser: CollectionListParser,
}

impl Normalizer {
    pub fn new(config: &ScrapingConfig) -> ParsingResult<Self> {
        Ok(Self {
            profile_parser: ProfileParser::new(&config.profile)?,
            list_parser: CollectionListParser::new(config)?,
        })
    }

    pub fn normalize(&self, payload: &UpstreamPayload) -> NormalizedCharacter {
        match payload {
            UpstreamPayload::Structured(structured) => Self::normalize_structured(structured),
            UpstreamPayload::Scraped(pages) => self.normalize_scraped(pages),
        }
    }

    fn normalize_structured(payload: &StructuredPayload) -> NormalizedCharacter {
        let document = &payload.document;
        let profile = CharacterProfile {
            name: non_blank(document.name.as_ref()),
            server: non_blank(document.server.as_ref()),
            avatar_url: non_blank(document.avatar.as_ref()),
        };

        let mut collections = OwnedCollections::default();
        for content_type in ContentType::ALL {
            let entries = payload
                .owned(content_type)
                .or_else(|| document.embedded_entries(content_type))
                .unwrap_or_default();
            collections.set(content_type, structured_items(entries));
        }

        NormalizedCharacter {
            profile,
            collections,
            withheld: Vec::new(),
        }
    }

    fn normalize_scraped(&self, pages: &ScrapedPages) -> NormalizedCharacter {
        let profile = match self.profile_parser.inspect(&pages.profile_html) {
            ProfileInspection::Profile(profile) => profile,
            ProfileInspection::Private | ProfileInspection::MissingName => CharacterProfile::default(),
        };

        let mut collections = OwnedCollections::default();
        let mut withheld = Vec::new();
        for content_type in ContentType::ALL {
            match pages.subpage(content_type) {
                Some(html) => collections.set(content_type, self.list_parser.parse(content_type, html)),
                None => withheld.push(content_type),
            }
        }

        NormalizedCharacter {
            profile,
            collections,
            withheld,
        }
    }
}

fn structured_items(entries: &[ApiOwnedItem]) -> Vec<RawOwnedItem> {
    entries
        .iter()
        .filter_map(|entry| non_blank(entry.name.as_ref()))
        .map(RawOwnedItem::new)
        .collect()
}
