//! Character base profile page parser

use scraper::{Html, Selector};

use super::config::ProfileSelectors;
use super::error::ParsingResult;
use super::{compile_selectors, extract_attr_with_fallbacks, extract_text_with_fallbacks};
use crate::domain::CharacterProfile;

/// What the base profile page tells us before any list is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileInspection {
    /// The private-profile marker phrase is present
    Private,
    /// No display-name element; the layout is not what we expect
    MissingName,
    Profile(CharacterProfile),
}

pub struct ProfileParser {
    name_selectors: Vec<Selector>,
    server_selectors: Vec<Selector>,
    avatar_selectors: Vec<Selector>,
    private_marker: String,
}

impl ProfileParser {
    pub fn new(config: &ProfileSelectors) -> ParsingResult<Self> {
        Ok(Self {
            name_selectors: compile_selectors("profile.character_name", &config.character_name)?,
            server_selectors: compile_selectors("profile.server", &config.server)?,
            avatar_selectors: compile_selectors("profile.avatar", &config.avatar)?,
            private_marker: config.private_marker.clone(),
        })
    }

    /// True when the body carries the private marker phrase
    pub fn is_private(&self, html: &str) -> bool {
        !self.private_marker.is_empty() && html.contains(&self.private_marker)
    }

    pub fn inspect(&self, html: &str) -> ProfileInspection {
        if self.is_private(html) {
            return ProfileInspection::Private;
        }

        let document = Html::parse_document(html);
        let root = document.root_element();

        let Some(name) = extract_text_with_fallbacks(&root, &self.name_selectors) else {
            return ProfileInspection::MissingName;
        };

        let server = extract_text_with_fallbacks(&root, &self.server_selectors).map(|world| world_name(&world));
        let avatar_url = extract_attr_with_fallbacks(&root, &self.avatar_selectors, "src");

        ProfileInspection::Profile(CharacterProfile {
            name: Some(name),
            server,
            avatar_url,
        })
    }
}

/// "Excalibur [Primal]" or "Excalibur (Primal)" -> "Excalibur"
pub(crate) fn world_name(text: &str) -> String {
    text.split(['[', '(']).next().unwrap_or(text).trim().to_string()
}
