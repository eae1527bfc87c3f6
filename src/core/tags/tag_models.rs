use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_TAG_NAME_LEN: usize = 32;
pub const MAX_TAG_CONTENT_LEN: usize = 2000;

/// Optional embed presentation for a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEmbed {
    pub title: String,
    pub colour: Option<u32>,
}

/// Optional link button shown under a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagButton {
    pub label: String,
    pub url: String,
}

/// Extra presentation metadata, stored as one JSON column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagExtras {
    pub embed: Option<TagEmbed>,
    pub button: Option<TagButton>,
}

/// A canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lower-cased; tag lookups are case-insensitive.
    pub name: String,
    pub owner_id: u64,
    pub content: String,
    pub uses: u64,
    pub created: DateTime<Utc>,
    pub extras: TagExtras,
}

impl Tag {
    pub fn new(name: &str, owner_id: u64, content: String) -> Self {
        Self {
            name: normalize_name(name),
            owner_id,
            content,
            uses: 0,
            created: Utc::now(),
            extras: TagExtras::default(),
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
