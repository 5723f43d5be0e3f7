//! Parsing error types
//!
//! Raised while compiling scraping configuration. Page content problems are
//! not errors here: missing sections yield empty lists and the profile parser
//! reports a missing name as an inspection outcome.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No valid selectors configured for '{field}'")]
    NoSelectors { field: String },

    #[error("Invalid pattern for '{field}': {pattern} - {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },
}

impl ParsingError {
    pub fn invalid_pattern(field: &str, pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            field: field.to_string(),
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
