//! Storage abstraction layer for issuetrack.
//!
//! This module provides the document store trait and factory for creating
//! storage backends:
//!
//! - **In-memory**: Fast, ephemeral storage backed by an ordered map
//! - **JSONL**: Persistent file-based storage using JSON Lines format
//!
//! # Architecture
//!
//! The storage layer uses an async trait so the service is independent of
//! the backend. The trait is object-safe, allowing for dynamic dispatch via
//! `Box<dyn IssueStorage>`.
//!
//! # Test Utilities
//!
//! This module provides a [`MockStorage`] implementation that rejects every
//! call, for testing how callers handle store failures. Enable the
//! `test-util` feature to use it outside this crate:
//!
//! ```toml
//! [dev-dependencies]
//! issuetrack = { version = "...", features = ["test-util"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use issuetrack::storage::{create_storage, StorageBackend};
//! use issuetrack::domain::NewIssue;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let mut storage = create_storage(StorageBackend::InMemory).await?;
//!
//!     let issue = storage
//!         .create(NewIssue {
//!             issue_title: "Fix login".to_string(),
//!             issue_text: "The login form rejects valid passwords".to_string(),
//!             created_by: "alice".to_string(),
//!             assigned_to: String::new(),
//!             status_text: String::new(),
//!             project: "webapp".to_string(),
//!         })
//!         .await?;
//!     println!("Created issue: {}", issue.id);
//!
//!     Ok(())
//! }
//! ```

use crate::domain::{Issue, IssueFilter, IssueId, IssueUpdate, NewIssue};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod in_memory;

/// Document store for issues.
///
/// Every backend implements this trait. The service shares one store across
/// request tasks, so implementations are `Send + Sync`.
///
/// # Method Categories
///
/// - **CRUD**: `create`, `get`, `update`, `delete`
/// - **Queries**: `list`, `count`
/// - **Batch Operations**: `import_issues`, `export_all`
/// - **Persistence**: `save`, `reload`
///
/// # Error Handling
///
/// Failures surface as [`crate::error::Error`]; the ones callers see most
/// are `IssueNotFound` for update and delete of an unknown ID and `Storage`
/// for backend failures.
#[async_trait]
pub trait IssueStorage: Send + Sync {
    // ========== CRUD Operations ==========

    /// Insert a new issue.
    ///
    /// Generates a unique ID, opens the issue and sets `created_on` and
    /// `updated_on` to the same instant.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if no unique ID can be generated.
    async fn create(&mut self, issue: NewIssue) -> Result<Issue>;

    /// Get an issue by ID.
    ///
    /// Returns `None` if the issue doesn't exist.
    async fn get(&self, id: &IssueId) -> Result<Option<Issue>>;

    /// Update an existing issue.
    ///
    /// Only fields present in `updates` are modified. When `updates` carries
    /// an `updated_on` that is not after the stored one, the stored value is
    /// advanced by one microsecond instead, so `updated_on` strictly
    /// increases with every update. Returns the updated issue.
    ///
    /// # Errors
    ///
    /// Returns `Error::IssueNotFound` if the issue doesn't exist.
    async fn update(&mut self, id: &IssueId, updates: IssueUpdate) -> Result<Issue>;

    /// Delete an issue, returning the removed document.
    ///
    /// # Errors
    ///
    /// Returns `Error::IssueNotFound` if the issue doesn't exist.
    async fn delete(&mut self, id: &IssueId) -> Result<Issue>;

    // ========== Queries ==========

    /// List issues matching the given filter, in ascending ID order.
    async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Number of stored issues.
    async fn count(&self) -> Result<usize>;

    // ========== Batch Operations ==========

    /// Import multiple issues, keeping their IDs.
    ///
    /// An imported issue replaces any stored issue with the same ID.
    async fn import_issues(&mut self, issues: Vec<Issue>) -> Result<()>;

    /// Export all issues in ascending ID order.
    async fn export_all(&self) -> Result<Vec<Issue>>;

    // ========== Persistence ==========

    /// Save changes to persistent storage.
    ///
    /// For in-memory storage this is a no-op. For JSONL-backed storage this
    /// writes every issue to disk.
    async fn save(&self) -> Result<()>;

    /// Reload state from persistent storage, discarding in-memory changes.
    ///
    /// Used to restore consistency when a mutation succeeded in memory but
    /// the following `save()` failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be read.
    async fn reload(&mut self) -> Result<()>;
}

/// Which document store to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// The data file, for backends that have one.
    #[must_use]
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// Wrapper that adds JSONL file persistence to the in-memory store.
///
/// Reads and mutations go to the inner store; `save()` writes all issues to
/// the JSONL file atomically.
struct JsonlBackedStorage {
    inner: Box<dyn IssueStorage>,
    path: PathBuf,
}

#[async_trait]
impl IssueStorage for JsonlBackedStorage {
    async fn create(&mut self, issue: NewIssue) -> Result<Issue> {
        self.inner.create(issue).await
    }

    async fn get(&self, id: &IssueId) -> Result<Option<Issue>> {
        self.inner.get(id).await
    }

    async fn update(&mut self, id: &IssueId, updates: IssueUpdate) -> Result<Issue> {
        self.inner.update(id, updates).await
    }

    async fn delete(&mut self, id: &IssueId) -> Result<Issue> {
        self.inner.delete(id).await
    }

    async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        self.inner.list(filter).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn import_issues(&mut self, issues: Vec<Issue>) -> Result<()> {
        self.inner.import_issues(issues).await
    }

    async fn export_all(&self) -> Result<Vec<Issue>> {
        self.inner.export_all().await
    }

    async fn save(&self) -> Result<()> {
        in_memory::save_to_jsonl(self.inner.as_ref(), &self.path).await
    }

    async fn reload(&mut self) -> Result<()> {
        self.inner = open_jsonl(&self.path).await?;
        Ok(())
    }
}

/// Load the in-memory store from `path`, or start empty if it doesn't exist.
async fn open_jsonl(path: &Path) -> Result<Box<dyn IssueStorage>> {
    if !path.exists() {
        // File doesn't exist yet (first run)
        return Ok(in_memory::new_in_memory_storage());
    }

    let (storage, warnings) = in_memory::load_from_jsonl(path).await?;
    for warning in &warnings {
        tracing::warn!(warning = ?warning, path = %path.display(), "JSONL load warning");
    }
    Ok(storage)
}

/// Create a storage instance for the given backend.
///
/// The service only ever sees the returned trait object.
///
/// # Errors
///
/// - `Error::Io` if the JSONL file exists but cannot be read
pub async fn create_storage(backend: StorageBackend) -> Result<Box<dyn IssueStorage>> {
    match backend {
        StorageBackend::InMemory => Ok(in_memory::new_in_memory_storage()),
        StorageBackend::Jsonl(path) => {
            let inner = open_jsonl(&path).await?;
            tracing::debug!(path = %path.display(), "Opened JSONL-backed storage");
            Ok(Box::new(JsonlBackedStorage { inner, path }))
        }
    }
}

// ========== Test Utilities ==========

/// Mock implementation of [`IssueStorage`] that fails every call.
///
/// Every method returns `Error::Storage`. Use it to verify that callers turn
/// store failures into the right responses.
///
/// # Availability
///
/// This type is available when:
/// - Running tests (`#[cfg(test)]`)
/// - The `test-util` feature is enabled
///
/// For tests that need working CRUD, use
/// [`in_memory::new_in_memory_storage`] instead.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct MockStorage;

#[cfg(any(test, feature = "test-util"))]
impl MockStorage {
    /// Create a new `MockStorage` instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn failure<T>(operation: &str) -> Result<T> {
        Err(crate::error::Error::Storage(format!(
            "MockStorage rejects {operation}"
        )))
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl IssueStorage for MockStorage {
    async fn create(&mut self, _issue: NewIssue) -> Result<Issue> {
        Self::failure("create")
    }

    async fn get(&self, _id: &IssueId) -> Result<Option<Issue>> {
        Self::failure("get")
    }

    async fn update(&mut self, _id: &IssueId, _updates: IssueUpdate) -> Result<Issue> {
        Self::failure("update")
    }

    async fn delete(&mut self, _id: &IssueId) -> Result<Issue> {
        Self::failure("delete")
    }

    async fn list(&self, _filter: &IssueFilter) -> Result<Vec<Issue>> {
        Self::failure("list")
    }

    async fn count(&self) -> Result<usize> {
        Self::failure("count")
    }

    async fn import_issues(&mut self, _issues: Vec<Issue>) -> Result<()> {
        Self::failure("import_issues")
    }

    async fn export_all(&self) -> Result<Vec<Issue>> {
        Self::failure("export_all")
    }

    async fn save(&self) -> Result<()> {
        Self::failure("save")
    }

    async fn reload(&mut self) -> Result<()> {
        Self::failure("reload")
    }
}
