//! Error types for taskd.
//!
//! This module provides [`ItemError`], the single error vocabulary shared by
//! the store and the service, and [`ErrorKind`], its five-way taxonomy.
//!
//! | `ErrorKind` | HTTP status | Public message |
//! |---|---|---|
//! | `Validation` | 400 | `validation failed` (+ per-field details) |
//! | `NotFound` | 404 | cause message |
//! | `Canceled` | 499 | cause message |
//! | `DeadlineExceeded` | 504 | cause message |
//! | `Internal` | 500 | `internal server error` |
//!
//! Mapping a failure to a response happens in exactly one place, the
//! [`classify`](mod@crate::classify) module.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Non-standard "client closed request" status.
pub const STATUS_CLIENT_CLOSED_REQUEST: u16 = 499;

/// Public summary used for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Result type alias using [`ItemError`].
pub type ItemResult<T> = Result<T, ItemError>;

/// The five kinds of failure a request can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input failed structural or semantic validation.
    Validation,
    /// The referenced identity is absent.
    NotFound,
    /// The caller withdrew interest.
    Canceled,
    /// The time budget ran out.
    DeadlineExceeded,
    /// Anything unexpected.
    Internal,
}

impl ErrorKind {
    /// Classification order, first match wins.
    pub const PRECEDENCE: [Self; 5] = [
        Self::Validation,
        Self::NotFound,
        Self::Canceled,
        Self::DeadlineExceeded,
        Self::Internal,
    ];

    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Canceled => StatusCode::from_u16(STATUS_CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::BAD_REQUEST),
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for kinds that point at a server-side problem.
    #[must_use]
    pub const fn is_server_fault(self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Internal)
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Canceled => "canceled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for store and service operations.
///
/// # Example
///
/// ```
/// use taskd_core::{ErrorKind, ItemError};
///
/// let err = ItemError::NotFound;
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.to_string(), "todo not found");
/// ```
#[derive(Error, Debug)]
pub enum ItemError {
    /// Input failed validation before reaching the store.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// No item has the requested identity.
    #[error("todo not found")]
    NotFound,

    /// The request's token fired.
    #[error("context canceled")]
    Canceled,

    /// The request's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Internal failure; the message never reaches clients.
    #[error("internal error: {message}")]
    Internal {
        /// Diagnostic message for logs.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ItemError {
    /// Creates a validation error from collected field errors.
    #[must_use]
    pub fn validation(field_errors: FieldErrors) -> Self {
        Self::Validation(field_errors)
    }

    /// Creates a validation error for a single field.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, reason);
        Self::Validation(errors)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the taxonomy kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound => ErrorKind::NotFound,
            Self::Canceled => ErrorKind::Canceled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns the message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal { .. } => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the field errors of a validation failure.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Field-specific validation errors.
///
/// Serializes as a plain object of field name to reasons, ordered by field
/// name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("field validation errors")]
#[serde(transparent)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates a new empty `FieldErrors`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns the reasons recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Returns `true` if `field` has at least one error.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns `true` if there are no field errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Converts into `Err(ItemError::Validation)` when any error was recorded.
    pub fn into_result(self) -> ItemResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ItemError::Validation(self))
        }
    }
}
