//! The item record and its identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique, store-assigned identity of an item.
///
/// Identities start at 1 and are never reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// The first identity a fresh store hands out.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw identity.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identity.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identity that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A managed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Store-assigned identity.
    pub id: ItemId,
    /// Short title, 3 to 100 characters.
    pub title: String,
    /// Free text, at most 500 characters.
    pub description: String,
    /// Whether the item is done.
    pub completed: bool,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed by every successful mutation; never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
}

/// The caller-supplied part of a new item.
///
/// The store turns a draft into an [`Item`] by assigning the identity and
/// both timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    /// Title of the new item.
    pub title: String,
    /// Description of the new item.
    pub description: String,
    /// Initial completion flag.
    pub completed: bool,
}

impl ItemDraft {
    /// Creates an incomplete draft.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            completed: false,
        }
    }

    /// Builds the stored item for `id`, stamped at `now`.
    #[must_use]
    pub fn into_item(self, id: ItemId, now: DateTime<Utc>) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A sparse update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New title, if supplied.
    pub title: Option<String>,
    /// New description, if supplied. `Some("")` clears it.
    pub description: Option<String>,
    /// New completion flag, if supplied.
    pub completed: Option<bool>,
}

impl ItemPatch {
    /// Returns `true` when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Overwrites every supplied field of `item`.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(title) = &self.title {
            item.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            item.description.clone_from(description);
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Item {
        ItemDraft::new("Learn Go", "Read docs").into_item(ItemId::FIRST, Utc::now())
    }

    #[test]
    fn test_draft_starts_incomplete() {
        let item = sample();
        assert!(!item.completed);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_item_id_parse_and_display() {
        let id: ItemId = "42".parse().expect("should parse");
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<ItemId>().is_err());
        assert!("-1".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_item_serializes_flat_id() {
        let json = serde_json::to_value(sample()).expect("serialization should work");
        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Learn Go");
        assert_eq!(json["completed"], false);
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut item = sample();
        let before = item.clone();
        let patch = ItemPatch::default();
        assert!(patch.is_empty());

        patch.apply_to(&mut item);
        patch.apply_to(&mut item);
        assert_eq!(item, before);
    }

    #[test]
    fn test_patch_overwrites_supplied_fields_only() {
        let mut item = sample();
        let patch = ItemPatch {
            completed: Some(true),
            description: Some(String::new()),
            ..ItemPatch::default()
        };
        patch.apply_to(&mut item);

        assert_eq!(item.title, "Learn Go");
        assert_eq!(item.description, "");
        assert!(item.completed);
    }
}
