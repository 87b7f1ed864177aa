//! In-memory storage backend.
//!
//! This module provides a fast, **ephemeral** storage implementation where all
//! data is held in RAM and **lost when the process exits**, unless it is saved
//! with [`save_to_jsonl`]. It is suitable for:
//!
//! - Testing and development
//! - Small deployments where one JSONL file is an adequate database
//!
//! # Persistence
//!
//! - **In-memory only**: Use [`new_in_memory_storage`] for ephemeral storage
//! - **With persistence**: Use [`load_from_jsonl`] to load from disk, then call
//!   [`save_to_jsonl`] after each change. [`crate::storage::create_storage`]
//!   wires this up for [`StorageBackend::Jsonl`](crate::storage::StorageBackend).
//!
//! # Architecture
//!
//! Issues live in a `BTreeMap<IssueId, Issue>`. Because identifiers lead with
//! their creation time and end with a counter, map order is creation order,
//! which gives listings a stable natural order without an explicit sort.
//!
//! # Thread Safety
//!
//! The storage is wrapped in `Arc<Mutex<InMemoryStorageInner>>`. Each trait
//! call holds the lock for its whole duration, so every call is atomic with
//! respect to the others.

mod inner;
mod jsonl;
mod trait_impl;

use crate::storage::IssueStorage;
use inner::InMemoryStorageInner;
use std::sync::Arc;
use tokio::sync::Mutex;

// Re-export public API
pub use jsonl::{load_from_jsonl, save_to_jsonl, LoadWarning};

/// Thread-safe in-memory storage.
pub(crate) type InMemoryStorage = Arc<Mutex<InMemoryStorageInner>>;

/// Create a new, empty in-memory storage instance.
///
/// # Example
///
/// ```
/// use issuetrack::storage::in_memory::new_in_memory_storage;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let storage = new_in_memory_storage();
///     assert_eq!(storage.count().await.unwrap(), 0);
/// }
/// ```
#[must_use]
pub fn new_in_memory_storage() -> Box<dyn IssueStorage> {
    Box::new(Arc::new(Mutex::new(InMemoryStorageInner::new())))
}
