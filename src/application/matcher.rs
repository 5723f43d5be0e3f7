//! Tiered name matcher: owned item names to catalog ids
//!
//! For each owned name the first rule that hits wins:
//! 1. exact string equality
//! 2. case-insensitive equality
//! 3. equality after dropping everything but letters, digits and whitespace,
//!    then lower-casing
//!
//! Each rule has its own index over the catalog slice. Only the first catalog
//! item per key is indexed, so ties go to catalog order.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::domain::{ContentId, ContentItem, ContentType, RawOwnedItem};
use crate::infrastructure::config::UnmatchedPolicy;

/// Rule that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchRule {
    Exact,
    CaseInsensitive,
    Normalized,
}

/// Lower-cased name with every non letter/digit/whitespace character removed
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Per-rule lookup tables over one catalog slice
pub struct CatalogIndex<'a> {
    exact: HashMap<&'a str, &'a ContentId>,
    folded: HashMap<String, &'a ContentId>,
    normalized: HashMap<String, &'a ContentId>,
}

impl<'a> CatalogIndex<'a> {
    pub fn build(items: &'a [ContentItem]) -> Self {
        let mut exact = HashMap::with_capacity(items.len());
        let mut folded = HashMap::with_capacity(items.len());
        let mut normalized = HashMap::with_capacity(items.len());

        for item in items {
            exact.entry(item.name.as_str()).or_insert(&item.id);
            folded.entry(item.name.to_lowercase()).or_insert(&item.id);
            let key = normalize_name(&item.name);
            if !key.is_empty() {
                normalized.entry(key).or_insert(&item.id);
            }
        }

        Self {
            exact,
            folded,
            normalized,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<(&'a ContentId, MatchRule)> {
        if let Some(id) = self.exact.get(name) {
            return Some((*id, MatchRule::Exact));
        }
        if let Some(id) = self.folded.get(&name.to_lowercase()) {
            return Some((*id, MatchRule::CaseInsensitive));
        }
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.normalized.get(&key).map(|id| (*id, MatchRule::Normalized))
    }
}

/// Outcome of matching one content type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub matched: HashSet<ContentId>,
    pub unmatched: Vec<String>,
    pub rule_hits: HashMap<MatchRule, usize>,
}

impl MatchReport {
    pub fn hits(&self, rule: MatchRule) -> usize {
        self.rule_hits.get(&rule).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    policy: UnmatchedPolicy,
}

impl Matcher {
    pub const fn new(policy: UnmatchedPolicy) -> Self {
        Self { policy }
    }

    /// Match owned items against one catalog slice.
    ///
    /// The result only ever contains ids present in `catalog`.
    pub fn match_items(&self, content_type: ContentType, owned: &[RawOwnedItem], catalog: &[ContentItem]) -> MatchReport {
        let index = CatalogIndex::build(catalog);
        let mut report = MatchReport::default();

        for item in owned {
            match index.lookup(&item.name) {
                Some((id, rule)) => {
                    report.matched.insert(id.clone());
                    *report.rule_hits.entry(rule).or_insert(0) += 1;
                }
                None => report.unmatched.push(item.name.clone()),
            }
        }

        debug!(
            "Matched {} of {} {} (exact {}, case-insensitive {}, normalized {})",
            report.matched.len(),
            owned.len(),
            content_type,
            report.hits(MatchRule::Exact),
            report.hits(MatchRule::CaseInsensitive),
            report.hits(MatchRule::Normalized),
        );
        self.report_unmatched(content_type, &report.unmatched);
        report
    }

    fn report_unmatched(&self, content_type: ContentType, unmatched: &[String]) {
        if unmatched.is_empty() {
            return;
        }
        match self.policy {
            UnmatchedPolicy::Silent => {}
            UnmatchedPolicy::Count => {
                info!("{} owned {} had no catalog match", unmatched.len(), content_type);
            }
            UnmatchedPolicy::Log => {
                info!("{} owned {} had no catalog match", unmatched.len(), content_type);
                for name in unmatched {
                    info!(content_type = %content_type, name = %name, "Unmatched owned item");
                }
            }
        }
    }
}
