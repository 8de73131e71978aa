//! Inbound payloads and their validation.
//!
//! Validation runs at the boundary, before the service is called, so a
//! rejected request never reaches the store.

use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ItemError, ItemResult};
use crate::item::{ItemId, ItemPatch};

/// Minimum title length in characters.
pub const TITLE_MIN_LEN: usize = 3;

/// Maximum title length in characters.
pub const TITLE_MAX_LEN: usize = 100;

/// Maximum description length in characters.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Payload of a create request.
///
/// Unknown keys, including `completed`, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItemRequest {
    /// Required title.
    #[serde(default)]
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateItemRequest {
    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> ItemResult<()> {
        let mut errors = FieldErrors::new();
        if self.title.is_empty() {
            errors.add("title", "is required");
        } else {
            check_title(&self.title, &mut errors);
        }
        if let Some(description) = &self.description {
            check_description(description, &mut errors);
        }
        errors.into_result()
    }
}

/// Payload of an update request.
///
/// Each field is tri-state: an omitted key or JSON `null` leaves the stored
/// value alone, anything else overwrites it after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    /// Replacement title.
    #[serde(default)]
    pub title: Option<String>,
    /// Replacement description; `""` clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement completion flag.
    #[serde(default)]
    pub completed: Option<bool>,
}

impl UpdateItemRequest {
    /// Checks every supplied field.
    pub fn validate(&self) -> ItemResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }
        if let Some(description) = &self.description {
            check_description(description, &mut errors);
        }
        errors.into_result()
    }

    /// Converts into the sparse patch handed to the service.
    #[must_use]
    pub fn into_patch(self) -> ItemPatch {
        ItemPatch {
            title: self.title,
            description: self.description,
            completed: self.completed,
        }
    }
}

/// Parses a path segment into an identity.
///
/// Only positive integers written as plain ASCII digits are accepted, so
/// `+1` is not an alias for `1`.
pub fn parse_item_id(raw: &str) -> ItemResult<ItemId> {
    let invalid = || ItemError::invalid_field("id", "must be a positive integer");

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match raw.parse::<ItemId>() {
        Ok(id) if id.get() > 0 => Ok(id),
        _ => Err(invalid()),
    }
}

fn check_title(title: &str, errors: &mut FieldErrors) {
    let len = title.chars().count();
    if len < TITLE_MIN_LEN {
        errors.add("title", format!("must be at least {TITLE_MIN_LEN} characters"));
    } else if len > TITLE_MAX_LEN {
        errors.add("title", format!("must be at most {TITLE_MAX_LEN} characters"));
    }
}

fn check_description(description: &str, errors: &mut FieldErrors) {
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        errors.add(
            "description",
            format!("must be at most {DESCRIPTION_MAX_LEN} characters"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn field_errors(result: ItemResult<()>) -> FieldErrors {
        match result {
            Err(ItemError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_create() {
        let req = CreateItemRequest {
            title: "Learn Go".into(),
            description: Some("Read docs".into()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_title_is_required() {
        let errors = field_errors(CreateItemRequest::default().validate());
        assert_eq!(errors.get("title"), Some(&["is required".to_string()][..]));
    }

    #[test]
    fn test_title_bounds_count_characters() {
        let short = CreateItemRequest {
            title: "ab".into(),
            description: None,
        };
        assert!(field_errors(short.validate()).contains("title"));

        // three characters, six bytes
        let multibyte = CreateItemRequest {
            title: "äöü".into(),
            description: None,
        };
        assert!(multibyte.validate().is_ok());

        let long = CreateItemRequest {
            title: "x".repeat(TITLE_MAX_LEN + 1),
            description: None,
        };
        assert!(field_errors(long.validate()).contains("title"));
    }

    #[test]
    fn test_reports_all_fields() {
        let req = CreateItemRequest {
            title: "ab".into(),
            description: Some("d".repeat(DESCRIPTION_MAX_LEN + 1)),
        };
        let errors = field_errors(req.validate());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_create_ignores_completed_key() {
        let req: CreateItemRequest =
            serde_json::from_str(r#"{"title":"Learn Go","completed":true}"#)
                .expect("unknown keys should be ignored");
        assert_eq!(req.title, "Learn Go");
        assert!(req.description.is_none());
    }

    #[test]
    fn test_update_null_means_absent() {
        let req: UpdateItemRequest =
            serde_json::from_str(r#"{"title":null,"completed":false}"#).expect("should parse");
        assert!(req.title.is_none());
        assert_eq!(req.completed, Some(false));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_empty_title_is_rejected() {
        let req = UpdateItemRequest {
            title: Some(String::new()),
            ..UpdateItemRequest::default()
        };
        assert!(field_errors(req.validate()).contains("title"));
    }

    #[test]
    fn test_update_empty_description_clears() {
        let req = UpdateItemRequest {
            description: Some(String::new()),
            ..UpdateItemRequest::default()
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.into_patch().description.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_item_id() {
        assert_eq!(parse_item_id("7").map(ItemId::get).ok(), Some(7));
        for raw in ["0", "-3", "abc", "", "1.5"] {
            let err = parse_item_id(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "input {raw:?}");
        }
    }

    #[test]
    fn test_parse_item_id_is_canonical_digits_only() {
        for raw in ["+1", " 1", "1 ", "１", "0x1"] {
            let err = parse_item_id(raw).unwrap_err();
            assert!(err.field_errors().unwrap().contains("id"), "input {raw:?}");
        }
        assert_eq!(parse_item_id("007").map(ItemId::get).ok(), Some(7));
    }
}
