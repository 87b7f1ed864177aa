//! The issue service: create, list, update and delete issues.
//!
//! Every operation returns a [`Reply`], which is either the success payload or
//! a logical error. Both are ordinary data: transports are expected to send
//! them with the same success status and let the `error` key carry failure.
//!
//! # Error tiers
//!
//! - **Validation** ([`Rejection::is_validation`]): the request is incomplete.
//!   Detected before the store is touched.
//! - **Operation**: the store rejected the request or found nothing. Store
//!   error details are logged, never returned.
//!
//! # Example
//!
//! ```
//! use issuetrack::service::IssueService;
//! use issuetrack::storage::in_memory::new_in_memory_storage;
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let service = IssueService::new(new_in_memory_storage());
//!
//!     let payload = json!({
//!         "issue_title": "Title",
//!         "issue_text": "Text",
//!         "created_by": "Creator"
//!     });
//!     let created = service
//!         .create_issue("test", payload.as_object().unwrap())
//!         .await
//!         .into_success()
//!         .unwrap();
//!
//!     assert!(created.open);
//!     assert_eq!(created.project, "test");
//! }
//! ```

use crate::domain::{
    present_text, Issue, IssueField, IssueFilter, IssueId, IssueUpdate, NewIssue,
};
use crate::error::Result;
use crate::storage::IssueStorage;
use chrono::Utc;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Loosely typed request fields, as decoded from a request body.
pub type Fields = Map<String, Value>;

/// Shared handle to the document store.
pub type SharedStorage = Arc<RwLock<Box<dyn IssueStorage>>>;

/// Why an operation produced a logical error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A required field was missing on create
    RequiredFieldsMissing,
    /// Update or delete without `_id`
    MissingId,
    /// Update with nothing but `_id`
    NoUpdateFields,
    /// The request body could not be decoded
    InvalidBody,
    /// Listing failed
    CouldNotList,
    /// Creating failed in the store
    CouldNotCreate,
    /// Updating failed
    CouldNotUpdate,
    /// Deleting failed
    CouldNotDelete,
}

impl Rejection {
    /// The message sent to clients.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Rejection::RequiredFieldsMissing => "required field(s) missing",
            Rejection::MissingId => "missing _id",
            Rejection::NoUpdateFields => "no update field(s) sent",
            Rejection::InvalidBody => "invalid request body",
            Rejection::CouldNotList => "could not list issues",
            Rejection::CouldNotCreate => "could not create issue",
            Rejection::CouldNotUpdate => "could not update",
            Rejection::CouldNotDelete => "could not delete",
        }
    }

    /// Whether the request was rejected before reaching the store.
    #[must_use]
    pub const fn is_validation(self) -> bool {
        matches!(
            self,
            Rejection::RequiredFieldsMissing
                | Rejection::MissingId
                | Rejection::NoUpdateFields
                | Rejection::InvalidBody
        )
    }
}

impl Serialize for Rejection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Body of a logical error: `{error}` or `{error, _id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// What went wrong
    pub error: Rejection,

    /// The `_id` the request named, when it named one
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Acknowledgement of an update or delete: `{result, _id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Outcome message
    pub result: &'static str,

    /// The `_id` the request named
    #[serde(rename = "_id")]
    pub id: String,
}

impl Ack {
    fn updated(id: String) -> Self {
        Self {
            result: "successfully updated",
            id,
        }
    }

    fn deleted(id: String) -> Self {
        Self {
            result: "successfully deleted",
            id,
        }
    }
}

/// Outcome of a service operation.
///
/// Serializes as the bare payload in either case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    /// The operation succeeded
    Success(T),

    /// The operation failed; the body says why
    LogicalError(ErrorBody),
}

impl<T> Reply<T> {
    /// A logical error reply.
    #[must_use]
    pub fn rejected(error: Rejection, id: Option<String>) -> Self {
        Reply::LogicalError(ErrorBody { error, id })
    }

    /// Whether this is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    /// The success payload, if any.
    #[must_use]
    pub fn into_success(self) -> Option<T> {
        match self {
            Reply::Success(value) => Some(value),
            Reply::LogicalError(_) => None,
        }
    }

    /// The error body, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Reply::Success(_) => None,
            Reply::LogicalError(body) => Some(body),
        }
    }
}

/// Issue operations over a shared document store.
///
/// Cloning is cheap; clones share the store.
#[derive(Clone)]
pub struct IssueService {
    storage: SharedStorage,
}

impl std::fmt::Debug for IssueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueService")
            .field("storage", &"<dyn IssueStorage>")
            .finish()
    }
}

impl IssueService {
    /// Create a service that owns `storage`.
    #[must_use]
    pub fn new(storage: Box<dyn IssueStorage>) -> Self {
        Self::with_shared(Arc::new(RwLock::new(storage)))
    }

    /// Create a service over an already shared store.
    #[must_use]
    pub fn with_shared(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// The shared store.
    #[must_use]
    pub fn storage(&self) -> SharedStorage {
        Arc::clone(&self.storage)
    }

    /// List the issues of `project` that match every filter exactly.
    ///
    /// Filter values are cast through the issue schema. A value that cannot
    /// be cast, or a store failure, yields [`Rejection::CouldNotList`].
    pub async fn list_issues(&self, project: &str, filters: &[(String, String)]) -> Reply<Vec<Issue>> {
        let query = filters.iter().map(|(name, value)| (name.as_str(), value.as_str()));
        let filter = match IssueFilter::for_project(project).with_query(query) {
            Ok(filter) => filter,
            Err(e) => {
                warn!(project, error = %e, "Rejected list filter");
                return Reply::rejected(Rejection::CouldNotList, None);
            }
        };

        let storage = self.storage.read().await;
        match storage.list(&filter).await {
            Ok(issues) => {
                debug!(project, matched = issues.len(), "Listed issues");
                Reply::Success(issues)
            }
            Err(e) => {
                error!(project, error = %e, "Failed to list issues");
                Reply::rejected(Rejection::CouldNotList, None)
            }
        }
    }

    /// Create an issue in `project`.
    ///
    /// `issue_title`, `issue_text` and `created_by` must be provided;
    /// `assigned_to` and `status_text` default to the empty string. Other
    /// payload keys are ignored.
    pub async fn create_issue(&self, project: &str, payload: &Fields) -> Reply<Issue> {
        let (Some(issue_title), Some(issue_text), Some(created_by)) = (
            present_text(payload.get(IssueField::IssueTitle.name())),
            present_text(payload.get(IssueField::IssueText.name())),
            present_text(payload.get(IssueField::CreatedBy.name())),
        ) else {
            let missing: Vec<&str> = IssueField::REQUIRED_ON_CREATE
                .iter()
                .filter(|field| present_text(payload.get(field.name())).is_none())
                .map(|field| field.name())
                .collect();
            debug!(project, ?missing, "Rejected issue without required fields");
            return Reply::rejected(Rejection::RequiredFieldsMissing, None);
        };

        let new_issue = NewIssue {
            issue_title,
            issue_text,
            created_by,
            assigned_to: present_text(payload.get(IssueField::AssignedTo.name())).unwrap_or_default(),
            status_text: present_text(payload.get(IssueField::StatusText.name())).unwrap_or_default(),
            project: project.to_string(),
        };

        let mut storage = self.storage.write().await;
        let issue = match storage.create(new_issue).await {
            Ok(issue) => issue,
            Err(e) => {
                error!(project, error = %e, "Failed to create issue");
                return Reply::rejected(Rejection::CouldNotCreate, None);
            }
        };

        if let Err(e) = commit(storage.as_mut()).await {
            error!(project, issue_id = %issue.id, error = %e, "Failed to persist new issue");
            return Reply::rejected(Rejection::CouldNotCreate, None);
        }

        info!(project, issue_id = %issue.id, "Created issue");
        Reply::Success(issue)
    }

    /// Merge the fields of `body` into the issue named by its `_id`.
    ///
    /// `updated_on` is set to the current time. Values are cast through the
    /// issue schema; names outside the schema are ignored but still count as
    /// sent fields.
    pub async fn update_issue(&self, body: &Fields) -> Reply<Ack> {
        let Some(raw_id) = present_text(body.get(IssueField::Id.name())) else {
            return Reply::rejected(Rejection::MissingId, None);
        };

        if body.keys().all(|name| name == IssueField::Id.name()) {
            return Reply::rejected(Rejection::NoUpdateFields, Some(raw_id));
        }

        let prepared = IssueId::parse(&raw_id)
            .and_then(|id| IssueUpdate::from_fields(body).map(|updates| (id, updates)));
        let (id, mut updates) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(issue_id = %raw_id, error = %e, "Rejected update");
                return Reply::rejected(Rejection::CouldNotUpdate, Some(raw_id));
            }
        };
        updates.updated_on = Some(Utc::now());

        let mut storage = self.storage.write().await;
        if let Err(e) = storage.update(&id, updates).await {
            warn!(issue_id = %id, error = %e, "Could not update issue");
            return Reply::rejected(Rejection::CouldNotUpdate, Some(raw_id));
        }

        if let Err(e) = commit(storage.as_mut()).await {
            error!(issue_id = %id, error = %e, "Failed to persist update");
            return Reply::rejected(Rejection::CouldNotUpdate, Some(raw_id));
        }

        info!(issue_id = %id, "Updated issue");
        Reply::Success(Ack::updated(raw_id))
    }

    /// Delete the issue named by the `_id` of `body`, in any project.
    pub async fn delete_issue(&self, body: &Fields) -> Reply<Ack> {
        let Some(raw_id) = present_text(body.get(IssueField::Id.name())) else {
            return Reply::rejected(Rejection::MissingId, None);
        };

        let id = match IssueId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                debug!(issue_id = %raw_id, error = %e, "Rejected delete");
                return Reply::rejected(Rejection::CouldNotDelete, Some(raw_id));
            }
        };

        let mut storage = self.storage.write().await;
        let removed = match storage.delete(&id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(issue_id = %id, error = %e, "Could not delete issue");
                return Reply::rejected(Rejection::CouldNotDelete, Some(raw_id));
            }
        };

        if let Err(e) = commit(storage.as_mut()).await {
            error!(issue_id = %id, error = %e, "Failed to persist delete");
            return Reply::rejected(Rejection::CouldNotDelete, Some(raw_id));
        }

        info!(issue_id = %id, project = %removed.project, "Deleted issue");
        Reply::Success(Ack::deleted(raw_id))
    }
}

/// Save after a mutation. If saving fails, reload so memory matches disk.
async fn commit(storage: &mut dyn IssueStorage) -> Result<()> {
    let Err(e) = storage.save().await else {
        return Ok(());
    };

    if let Err(reload_err) = storage.reload().await {
        error!(error = %reload_err, "Failed to reload storage after save failure");
    }
    Err(e)
}
