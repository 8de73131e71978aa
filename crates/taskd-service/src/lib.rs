//! # Taskd Service
//!
//! Business rules on top of an [`ItemStore`](taskd_store::ItemStore).
//!
//! [`ItemService`] forces defaults on new items, applies sparse patches
//! inside the store's exclusive section, and emits one structured event per
//! call. Store failures are returned unchanged.

#![doc(html_root_url = "https://docs.rs/taskd-service/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod service;

pub use service::ItemService;
