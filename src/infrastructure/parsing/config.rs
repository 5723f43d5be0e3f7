//! Scraping configuration for Lodestone-style pages
//!
//! Centralized configuration for CSS selectors and marker phrases. Every
//! selector field is a list of fallbacks, tried in order.

use serde::{Deserialize, Serialize};

use crate::domain::ContentType;

/// Main scraping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Base profile page selectors
    pub profile: ProfileSelectors,

    /// Per content type subpage selectors
    pub mounts: ListSelectors,
    pub minions: ListSelectors,
    pub achievements: ListSelectors,

    /// Character search result selectors
    pub search: SearchSelectors,

    /// Free Company roster selectors
    pub roster: RosterSelectors,
}

impl ScrapingConfig {
    pub fn list(&self, content_type: ContentType) -> &ListSelectors {
        match content_type {
            ContentType::Mount => &self.mounts,
            ContentType::Minion => &self.minions,
            ContentType::Achievement => &self.achievements,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            profile: ProfileSelectors::default(),
            mounts: ListSelectors {
                container: vec![".character__mounts".to_string(), ".mount__list".to_string()],
                entry: vec!["li".to_string()],
                name: vec![
                    ".character__item_name".to_string(),
                    ".mount__name".to_string(),
                ],
                name_pattern: None,
            },
            minions: ListSelectors {
                container: vec![".character__minion".to_string(), ".minion__list".to_string()],
                entry: vec!["li".to_string()],
                name: vec![
                    ".character__item_name".to_string(),
                    ".minion__name".to_string(),
                ],
                name_pattern: None,
            },
            achievements: ListSelectors {
                container: vec![".ldst__achievement".to_string()],
                entry: vec!["li.entry".to_string()],
                name: vec![".entry__activity__txt".to_string()],
                name_pattern: Some("[“\"](.+?)[”\"]".to_string()),
            },
            search: SearchSelectors::default(),
            roster: RosterSelectors::default(),
        }
    }
}

/// Selectors for the character base profile page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSelectors {
    /// Character display name; its absence means the layout changed
    pub character_name: Vec<String>,

    /// Home world, e.g. "Excalibur [Primal]"
    pub server: Vec<String>,

    /// Avatar image element (its `src` is read)
    pub avatar: Vec<String>,

    /// Literal phrase shown when the owner made the profile private
    pub private_marker: String,
}

impl Default for ProfileSelectors {
    fn default() -> Self {
        Self {
            character_name: vec![
                ".frame__chara__name".to_string(),
                ".character__name".to_string(),
            ],
            server: vec![".frame__chara__world".to_string()],
            avatar: vec![
                ".frame__chara__face img".to_string(),
                ".character__detail__image img".to_string(),
            ],
            private_marker: "This character's profile is private.".to_string(),
        }
    }
}

/// Selectors for one collection subpage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSelectors {
    /// List container(s); entries are only read inside these
    pub container: Vec<String>,

    /// One element per owned item
    pub entry: Vec<String>,

    /// Name text node within an entry
    pub name: Vec<String>,

    /// Optional regex; the first capture group is the item name
    #[serde(default)]
    pub name_pattern: Option<String>,
}

/// Selectors for the character search result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSelectors {
    pub entry: Vec<String>,
    pub name: Vec<String>,
    pub world: Vec<String>,
    pub link: Vec<String>,
    pub avatar: Vec<String>,

    /// Regex extracting the character id from the entry link
    pub id_pattern: String,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            entry: vec![".ldst__window .entry".to_string()],
            name: vec![".entry__name".to_string()],
            world: vec![".entry__world".to_string()],
            link: vec![".entry__link".to_string()],
            avatar: vec![".entry__chara__face img".to_string()],
            id_pattern: r"/lodestone/character/(\d+)/?".to_string(),
        }
    }
}

/// Selectors for the Free Company roster page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterSelectors {
    pub member_link: Vec<String>,

    /// Regex extracting the character id from the member link
    pub id_pattern: String,
}

impl Default for RosterSelectors {
    fn default() -> Self {
        Self {
            member_link: vec!["a[href^=\"/characters/\"]".to_string()],
            id_pattern: r"/characters/(\d+)".to_string(),
        }
    }
}
