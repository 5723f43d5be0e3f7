//! Completion reporting over member records and the catalog
//!
//! Only ids present in the catalog count towards progress; completion ids
//! left over from an older catalog are ignored here.

use serde::{Deserialize, Serialize};

use crate::domain::{ContentCatalog, ContentId, ContentItem, ContentType, FcMember, MemberId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProgress {
    pub member_id: MemberId,
    pub name: String,
    pub content_type: ContentType,
    pub completed: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent; zero for an empty catalog
    pub percentage: u8,
}

pub fn member_progress(member: &FcMember, catalog: &ContentCatalog, content_type: ContentType) -> MemberProgress {
    let total = catalog.items(content_type).len();
    let completed = member.completed_content.count_in_catalog(content_type, catalog);
    MemberProgress {
        member_id: member.id,
        name: member.name.clone(),
        content_type,
        completed,
        total,
        percentage: percentage(completed, total),
    }
}

/// Progress of every member for every content type
pub fn guild_progress(members: &[FcMember], catalog: &ContentCatalog) -> Vec<MemberProgress> {
    members
        .iter()
        .flat_map(|member| {
            ContentType::ALL
                .into_iter()
                .map(move |content_type| member_progress(member, catalog, content_type))
        })
        .collect()
}

/// Half-up rounding in integer arithmetic
fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed.min(total) * 100 + total / 2) / total;
    u8::try_from(pct).unwrap_or(100)
}

/// Member counts comfortably fit in `u32`
fn ratio(part: usize, whole: usize) -> f64 {
    let to_f64 = |n: usize| u32::try_from(n).map_or(f64::from(u32::MAX), f64::from);
    to_f64(part) / to_f64(whole)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipFilter {
    /// At least one member is missing the item
    #[default]
    Missing,
    /// Every member owns the item
    Owned,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilter {
    pub ownership: OwnershipFilter,
    /// Case-insensitive substring of the item name
    pub search: Option<String>,
    /// Case-insensitive acquisition source label
    pub source: Option<String>,
}

impl ContentFilter {
    fn accepts(&self, item: &ContentItem, owned_count: usize, member_count: usize) -> bool {
        let ownership = match self.ownership {
            OwnershipFilter::Missing => owned_count < member_count,
            OwnershipFilter::Owned => owned_count == member_count,
            OwnershipFilter::All => true,
        };
        if !ownership {
            return false;
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !item.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }

        match self.source.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(source) => item
                .sources()
                .iter()
                .any(|label| label.eq_ignore_ascii_case(source)),
            None => true,
        }
    }
}

/// Guild-wide progress of one catalog item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentProgress {
    pub id: ContentId,
    pub name: String,
    pub content_type: ContentType,
    pub owners: Vec<MemberId>,
    pub owned_count: usize,
    pub member_count: usize,
    /// Fraction of members owning the item, 0.0 to 1.0
    pub completion_rate: f64,
}

/// Per-item progress for one content type, in catalog order
pub fn content_progress(
    members: &[FcMember],
    catalog: &ContentCatalog,
    content_type: ContentType,
    filter: &ContentFilter,
) -> Vec<ContentProgress> {
    let member_count = members.len();

    catalog
        .items(content_type)
        .iter()
        .filter_map(|item| {
            let owners: Vec<MemberId> = members
                .iter()
                .filter(|member| member.completed_content.contains(content_type, &item.id))
                .map(|member| member.id)
                .collect();
            let owned_count = owners.len();

            if !filter.accepts(item, owned_count, member_count) {
                return None;
            }

            let completion_rate = if member_count == 0 {
                0.0
            } else {
                ratio(owned_count, member_count)
            };

            Some(ContentProgress {
                id: item.id.clone(),
                name: item.name.clone(),
                content_type,
                owners,
                owned_count,
                member_count,
                completion_rate,
            })
        })
        .collect()
}
