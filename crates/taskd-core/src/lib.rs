//! # Taskd Core
//!
//! Core types shared by every taskd crate.
//!
//! - [`Item`] - The managed record, with [`ItemId`], [`ItemDraft`] and [`ItemPatch`]
//! - [`RequestContext`] - Per-request context carrying identity, cancellation and deadline
//! - [`ItemError`] - Standard error type, with its [`ErrorKind`] taxonomy
//! - [`classify()`] - Maps any failure to exactly one status and body
//! - [`CreateItemRequest`] / [`UpdateItemRequest`] - Inbound payloads and their validation

#![doc(html_root_url = "https://docs.rs/taskd-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod classify;
mod context;
mod error;
mod item;
pub mod request;

pub use classify::{classify, ErrorBody, ErrorResponse};
pub use context::{RequestContext, RequestId};
pub use error::{
    ErrorKind, FieldErrors, ItemError, ItemResult, INTERNAL_ERROR_MESSAGE,
    STATUS_CLIENT_CLOSED_REQUEST,
};
pub use item::{Item, ItemDraft, ItemId, ItemPatch};
pub use request::{parse_item_id, CreateItemRequest, UpdateItemRequest};
