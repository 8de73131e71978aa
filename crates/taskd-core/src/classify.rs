//! Failure classification.
//!
//! [`classify`] is invoked once per failing request. It inspects a generic
//! [`anyhow::Error`], which may wrap an [`ItemError`] under any number of
//! context layers, picks exactly one [`ErrorKind`], and builds the response
//! contract (status plus a two-field body).
//!
//! Kinds are tried in [`ErrorKind::PRECEDENCE`] order against the whole
//! cause chain, so a validation failure wrapped around a cancellation is
//! still reported as a validation failure.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{ErrorKind, FieldErrors, ItemError, INTERNAL_ERROR_MESSAGE};

/// Response body for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable summary.
    pub error: String,
    /// Structured details, such as per-field validation reasons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A classified failure, ready to be written by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    kind: ErrorKind,
    status: StatusCode,
    body: ErrorBody,
}

impl ErrorResponse {
    /// Builds the response for `kind` with the given summary and details.
    #[must_use]
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind,
            status: kind.status_code(),
            body: ErrorBody {
                error: message.into(),
                details,
            },
        }
    }

    /// Returns the taxonomy kind that matched.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response body.
    #[must_use]
    pub const fn body(&self) -> &ErrorBody {
        &self.body
    }

    /// Serializes the body to JSON bytes.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(&self.body)
            .unwrap_or_else(|_| br#"{"error":"internal server error"}"#.to_vec())
    }
}

/// Classifies `err` and logs it once.
///
/// Validation, not-found and canceled failures log at `warn`; deadline and
/// internal failures log at `error`. The raw cause of an internal failure is
/// logged but never placed in the response.
pub fn classify(ctx: &RequestContext, err: &anyhow::Error) -> ErrorResponse {
    let response = build_response(err);
    let request_id = ctx.request_id();
    let operation = ctx.operation_id().unwrap_or("-");

    if response.kind().is_server_fault() {
        tracing::error!(
            request_id = %request_id,
            operation_id = operation,
            kind = %response.kind(),
            status = response.status().as_u16(),
            error = %format!("{err:#}"),
            "request failed"
        );
    } else {
        tracing::warn!(
            request_id = %request_id,
            operation_id = operation,
            kind = %response.kind(),
            status = response.status().as_u16(),
            error = %format!("{err:#}"),
            "request failed"
        );
    }

    response
}

/// Returns the kind `err` would be classified as.
#[must_use]
pub fn kind_of(err: &anyhow::Error) -> ErrorKind {
    ErrorKind::PRECEDENCE
        .into_iter()
        .find(|kind| matches_kind(err, *kind))
        .unwrap_or(ErrorKind::Internal)
}

fn build_response(err: &anyhow::Error) -> ErrorResponse {
    match kind_of(err) {
        ErrorKind::Validation => {
            let details = find_field_errors(err).and_then(|f| serde_json::to_value(f).ok());
            ErrorResponse::new(ErrorKind::Validation, "validation failed", details)
        }
        ErrorKind::Internal => ErrorResponse::new(ErrorKind::Internal, INTERNAL_ERROR_MESSAGE, None),
        kind => {
            let message = find_item_error(err, kind)
                .map_or_else(|| default_message(kind).to_string(), ToString::to_string);
            ErrorResponse::new(kind, message, None)
        }
    }
}

fn matches_kind(err: &anyhow::Error, kind: ErrorKind) -> bool {
    match kind {
        ErrorKind::Validation => find_field_errors(err).is_some(),
        ErrorKind::DeadlineExceeded => {
            find_item_error(err, kind).is_some()
                || err
                    .chain()
                    .any(|cause| cause.is::<tokio::time::error::Elapsed>())
        }
        ErrorKind::Internal => true,
        other => find_item_error(err, other).is_some(),
    }
}

// The outermost context layer only downcasts through `anyhow::Error` itself,
// the remaining causes through the chain.
fn item_errors(err: &anyhow::Error) -> impl Iterator<Item = &ItemError> {
    err.downcast_ref::<ItemError>()
        .into_iter()
        .chain(err.chain().filter_map(|cause| cause.downcast_ref::<ItemError>()))
}

fn find_item_error(err: &anyhow::Error, kind: ErrorKind) -> Option<&ItemError> {
    item_errors(err).find(|item_err| item_err.kind() == kind)
}

fn find_field_errors(err: &anyhow::Error) -> Option<&FieldErrors> {
    item_errors(err)
        .find_map(ItemError::field_errors)
        .or_else(|| err.downcast_ref::<FieldErrors>())
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<FieldErrors>()))
}

const fn default_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation failed",
        ErrorKind::NotFound => "todo not found",
        ErrorKind::Canceled => "context canceled",
        ErrorKind::DeadlineExceeded => "context deadline exceeded",
        ErrorKind::Internal => INTERNAL_ERROR_MESSAGE,
    }
}
