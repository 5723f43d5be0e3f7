//! Lodestone character search result parser

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::SearchSelectors;
use super::error::ParsingResult;
use super::profile_parser::world_name;
use super::{compile_pattern, compile_selectors, extract_attr_with_fallbacks, extract_text_with_fallbacks};
use crate::domain::{ExternalId, SearchCandidate};

pub struct SearchResultParser {
    entry: Vec<Selector>,
    name: Vec<Selector>,
    world: Vec<Selector>,
    link: Vec<Selector>,
    avatar: Vec<Selector>,
    id_pattern: Regex,
}

impl SearchResultParser {
    pub fn new(config: &SearchSelectors) -> ParsingResult<Self> {
        Ok(Self {
            entry: compile_selectors("search.entry", &config.entry)?,
            name: compile_selectors("search.name", &config.name)?,
            world: compile_selectors("search.world", &config.world)?,
            link: compile_selectors("search.link", &config.link)?,
            avatar: compile_selectors("search.avatar", &config.avatar)?,
            id_pattern: compile_pattern("search.id_pattern", &config.id_pattern)?,
        })
    }

    /// Candidates in page order; entries missing a name, world or id are skipped.
    ///
    /// Relative avatar URLs are resolved against `base_url`.
    pub fn parse(&self, html: &str, base_url: &Url) -> Vec<SearchCandidate> {
        let document = Html::parse_document(html);
        let mut candidates = Vec::new();

        let entries = self
            .entry
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        for entry in entries {
            let name = extract_text_with_fallbacks(&entry, &self.name);
            let world = extract_text_with_fallbacks(&entry, &self.world).map(|text| world_name(&text));
            let href = extract_attr_with_fallbacks(&entry, &self.link, "href")
                .or_else(|| entry.value().attr("href").map(str::to_string));

            let external_id = href.as_deref().and_then(|href| {
                self.id_pattern
                    .captures(href)
                    .and_then(|caps| caps.get(1))
                    .map(|id| ExternalId::new(id.as_str()))
            });

            let (Some(name), Some(server), Some(external_id)) = (name, world, external_id) else {
                debug!("Skipping incomplete search entry (href: {:?})", href);
                continue;
            };

            let avatar_url = extract_attr_with_fallbacks(&entry, &self.avatar, "src").and_then(|src| {
                match base_url.join(&src) {
                    Ok(url) => Some(url.to_string()),
                    Err(e) => {
                        warn!("Ignoring unparsable avatar URL '{}': {}", src, e);
                        None
                    }
                }
            });

            candidates.push(SearchCandidate {
                name,
                server,
                external_id,
                avatar_url,
            });
        }

        debug!("Parsed {} search candidates", candidates.len());
        candidates
    }
}
