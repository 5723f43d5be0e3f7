//! Free Company roster page parser

use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};

use super::config::RosterSelectors;
use super::error::ParsingResult;
use super::{clean_text, compile_pattern, compile_selectors};
use crate::domain::{ExternalId, RosterEntry};

pub struct RosterParser {
    member_link: Vec<Selector>,
    id_pattern: Regex,
}

impl RosterParser {
    pub fn new(config: &RosterSelectors) -> ParsingResult<Self> {
        Ok(Self {
            member_link: compile_selectors("roster.member_link", &config.member_link)?,
            id_pattern: compile_pattern("roster.id_pattern", &config.id_pattern)?,
        })
    }

    /// Members in page order, one entry per character id
    pub fn parse(&self, html: &str) -> Vec<RosterEntry> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for selector in &self.member_link {
            for link in document.select(selector) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let Some(id) = self.id_pattern.captures(href).and_then(|caps| caps.get(1)) else {
                    continue;
                };
                let name = clean_text(&link);
                if name.is_empty() || !seen.insert(id.as_str().to_string()) {
                    continue;
                }
                entries.push(RosterEntry {
                    name,
                    external_id: ExternalId::new(id.as_str()),
                    server: None,
                });
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_unique_members() {
        let html = r#"
            <table>
              <tr><td><a href="/characters/111">Cloud Strife</a></td></tr>
              <tr><td><a href="/characters/222"> Tifa  Lockhart </a></td></tr>
              <tr><td><a href="/characters/111">Cloud Strife</a></td></tr>
              <tr><td><a href="/characters/333"><img src="x.png"></a></td></tr>
              <tr><td><a href="/mounts/12">Kirin</a></td></tr>
            </table>
        "#;
        let entries = RosterParser::new(&RosterSelectors::default()).unwrap().parse(html);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].external_id.as_str(), "111");
        assert_eq!(entries[1].name, "Tifa Lockhart");
        assert!(entries.iter().all(|entry| entry.server.is_none()));
    }
}
