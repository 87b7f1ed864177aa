//! Core in-memory storage data structures.

use crate::domain::{Issue, IssueId};
use crate::error::{Error, Result};
use crate::id_generation::IdGenerator;
use std::collections::BTreeMap;

/// Inner storage structure (not thread-safe).
///
/// Wrapped in `Arc<Mutex<>>` by [`super::InMemoryStorage`].
pub(crate) struct InMemoryStorageInner {
    /// Issues ordered by ID, which is creation order
    pub(super) issues: BTreeMap<IssueId, Issue>,

    /// ID generator for creating new issue IDs.
    ///
    /// Every ID ever stored is registered here, including IDs of deleted
    /// issues, so IDs are never reused.
    pub(super) id_generator: IdGenerator,
}

impl InMemoryStorageInner {
    /// Create a new empty storage instance
    pub(crate) fn new() -> Self {
        Self {
            issues: BTreeMap::new(),
            id_generator: IdGenerator::new(),
        }
    }

    /// Generate a new unique ID for an issue
    pub(super) fn generate_id(&mut self) -> Result<IssueId> {
        let id_str = self
            .id_generator
            .generate()
            .map_err(|e| Error::Storage(format!("ID generation failed: {e}")))?;

        IssueId::parse(&id_str)
    }

    /// Insert an issue under its own ID, registering the ID with the generator.
    ///
    /// Returns the issue previously stored under that ID, if any.
    pub(super) fn insert(&mut self, issue: Issue) -> Option<Issue> {
        self.id_generator.register_id(issue.id.as_str().to_string());
        self.issues.insert(issue.id.clone(), issue)
    }
}
