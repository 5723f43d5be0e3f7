//! Collection subpage parser (mounts, minions, achievements)
//!
//! Entries are only read inside the configured list containers so unrelated
//! `li` elements elsewhere on the page never leak into a collection.

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::config::{ListSelectors, ScrapingConfig};
use super::error::ParsingResult;
use super::{compile_pattern, compile_selectors, extract_text_with_fallbacks};
use crate::domain::{ContentType, RawOwnedItem};

struct CompiledList {
    container: Vec<Selector>,
    entry: Vec<Selector>,
    name: Vec<Selector>,
    name_pattern: Option<Regex>,
}

impl CompiledList {
    fn compile(content_type: ContentType, config: &ListSelectors) -> ParsingResult<Self> {
        let field = content_type.plural();
        Ok(Self {
            container: compile_selectors(&format!("{field}.container"), &config.container)?,
            entry: compile_selectors(&format!("{field}.entry"), &config.entry)?,
            name: compile_selectors(&format!("{field}.name"), &config.name)?,
            name_pattern: config
                .name_pattern
                .as_deref()
                .map(|pattern| compile_pattern(&format!("{field}.name_pattern"), pattern))
                .transpose()?,
        })
    }

    fn extract_name(&self, text: String) -> Option<String> {
        let name = match &self.name_pattern {
            Some(pattern) => pattern.captures(&text)?.get(1)?.as_str().trim().to_string(),
            None => text,
        };
        (!name.is_empty()).then_some(name)
    }
}

pub struct CollectionListParser {
    mounts: CompiledList,
    minions: CompiledList,
    achievements: CompiledList,
}

impl CollectionListParser {
    pub fn new(config: &ScrapingConfig) -> ParsingResult<Self> {
        Ok(Self {
            mounts: CompiledList::compile(ContentType::Mount, &config.mounts)?,
            minions: CompiledList::compile(ContentType::Minion, &config.minions)?,
            achievements: CompiledList::compile(ContentType::Achievement, &config.achievements)?,
        })
    }

    fn compiled(&self, content_type: ContentType) -> &CompiledList {
        match content_type {
            ContentType::Mount => &self.mounts,
            ContentType::Minion => &self.minions,
            ContentType::Achievement => &self.achievements,
        }
    }

    /// Owned items listed on one subpage, in page order
    pub fn parse(&self, content_type: ContentType, html: &str) -> Vec<RawOwnedItem> {
        let list = self.compiled(content_type);
        let document = Html::parse_document(html);

        let Some(containers) = list
            .container
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
        else {
            debug!("No {} list container found on page", content_type);
            return Vec::new();
        };

        let mut items = Vec::new();
        for container in containers {
            let Some(entries) = list
                .entry
                .iter()
                .map(|selector| container.select(selector).collect::<Vec<_>>())
                .find(|found| !found.is_empty())
            else {
                continue;
            };

            for entry in entries {
                let Some(text) = extract_text_with_fallbacks(&entry, &list.name) else {
                    continue;
                };
                if let Some(name) = list.extract_name(text) {
                    items.push(RawOwnedItem::new(name));
                }
            }
        }

        debug!("Parsed {} {} from subpage", items.len(), content_type);
        items
    }
}
