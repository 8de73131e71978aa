//! # Taskd Store
//!
//! Storage for taskd items.
//!
//! - [`ItemStore`] - The storage capability every backend implements
//! - [`MemoryStore`] - In-process store guarded by a single reader/writer lock
//! - [`FailingStore`] - Wrapper that injects failures, for tests
//!
//! Every operation takes the caller's [`RequestContext`](taskd_core::RequestContext)
//! and checks it before touching state, so a cancelled or expired request
//! fails with no effect.

#![doc(html_root_url = "https://docs.rs/taskd-store/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod failing;
mod memory;
mod store;

pub use failing::{FailingStore, StoreOperation};
pub use memory::MemoryStore;
pub use store::ItemStore;
