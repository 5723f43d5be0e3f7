//! HTML parsing infrastructure for Lodestone-style pages
//!
//! Parsers compile their selectors once and are then pure functions of the
//! page body. `scraper::Html` is not `Send`, so every parse happens inside a
//! synchronous call and no document outlives it.

pub mod collection_list_parser;
pub mod config;
pub mod error;
pub mod profile_parser;
pub mod roster_parser;
pub mod search_result_parser;

pub use collection_list_parser::CollectionListParser;
pub use config::{ListSelectors, ProfileSelectors, RosterSelectors, ScrapingConfig, SearchSelectors};
pub use error::{ParsingError, ParsingResult};
pub use profile_parser::{ProfileInspection, ProfileParser};
pub use roster_parser::RosterParser;
pub use search_result_parser::SearchResultParser;

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

/// Compile a list of fallback selectors, skipping invalid ones
pub(crate) fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}' for {}: {}", selector_str, field, e);
                errors.push(ParsingError::InvalidSelector {
                    selector: selector_str.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if selectors.is_empty() {
        return Err(errors.pop().unwrap_or_else(|| ParsingError::NoSelectors {
            field: field.to_string(),
        }));
    }

    if !errors.is_empty() {
        debug!("{} of {} selectors for {} failed to compile", errors.len(), selector_strings.len(), field);
    }

    Ok(selectors)
}

pub(crate) fn compile_pattern(field: &str, pattern: &str) -> ParsingResult<Regex> {
    Regex::new(pattern).map_err(|e| ParsingError::invalid_pattern(field, pattern, e))
}

/// Trimmed text with inner whitespace runs collapsed
pub(crate) fn clean_text(element: &ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// First non-empty text found by any of the selectors, in order
pub(crate) fn extract_text_with_fallbacks(element: &ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element
            .select(selector)
            .map(|found| clean_text(&found))
            .find(|text| !text.is_empty())
    })
}

/// First value of `attr` found by any of the selectors, in order
pub(crate) fn extract_attr_with_fallbacks(
    element: &ElementRef<'_>,
    selectors: &[Selector],
    attr: &str,
) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element
            .select(selector)
            .filter_map(|found| found.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}
