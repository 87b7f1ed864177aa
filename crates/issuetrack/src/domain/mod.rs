//! Domain types for issue tracking.
//!
//! This module contains the issue document, the payloads used to create and
//! update it, and the filter used to query it.

mod schema;

pub use schema::{present_text, FieldKind, FieldValue, IssueField};

use crate::error::{Error, Result};
use crate::id_generation::validate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Unique identifier for an issue
///
/// Always 24 lowercase hex characters; see [`crate::id_generation`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId(String);

impl IssueId {
    /// Parse an issue ID, normalizing it to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidId` if the value is not 24 hex characters.
    pub fn parse(id: &str) -> Result<Self> {
        if validate_id(id) {
            Ok(Self(id.to_ascii_lowercase()))
        } else {
            Err(Error::InvalidId(id.to_string()))
        }
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for IssueId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<IssueId> for String {
    fn from(id: IssueId) -> Self {
        id.0
    }
}

/// Represents an issue in the tracking system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier, assigned by the store
    #[serde(rename = "_id")]
    pub id: IssueId,

    /// Issue title
    pub issue_title: String,

    /// Issue description
    pub issue_text: String,

    /// Who reported the issue
    pub created_by: String,

    /// Assignee, empty when unassigned
    #[serde(default)]
    pub assigned_to: String,

    /// Free-form status line
    #[serde(default)]
    pub status_text: String,

    /// Creation timestamp
    pub created_on: DateTime<Utc>,

    /// Last update timestamp
    pub updated_on: DateTime<Utc>,

    /// Whether the issue is still open
    #[serde(default = "default_open")]
    pub open: bool,

    /// Project the issue belongs to
    pub project: String,
}

fn default_open() -> bool {
    true
}

impl Issue {
    /// Current value of a field.
    #[must_use]
    pub fn field_value(&self, field: IssueField) -> FieldValue {
        match field {
            IssueField::Id => FieldValue::Identifier(self.id.clone()),
            IssueField::IssueTitle => FieldValue::Text(self.issue_title.clone()),
            IssueField::IssueText => FieldValue::Text(self.issue_text.clone()),
            IssueField::CreatedBy => FieldValue::Text(self.created_by.clone()),
            IssueField::AssignedTo => FieldValue::Text(self.assigned_to.clone()),
            IssueField::StatusText => FieldValue::Text(self.status_text.clone()),
            IssueField::CreatedOn => FieldValue::Timestamp(self.created_on),
            IssueField::UpdatedOn => FieldValue::Timestamp(self.updated_on),
            IssueField::Open => FieldValue::Boolean(self.open),
            IssueField::Project => FieldValue::Text(self.project.clone()),
        }
    }

    /// Merge an update into the issue.
    ///
    /// Only fields present in `update` change. The identifier never changes.
    pub fn apply(&mut self, update: IssueUpdate) {
        if let Some(issue_title) = update.issue_title {
            self.issue_title = issue_title;
        }
        if let Some(issue_text) = update.issue_text {
            self.issue_text = issue_text;
        }
        if let Some(created_by) = update.created_by {
            self.created_by = created_by;
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(status_text) = update.status_text {
            self.status_text = status_text;
        }
        if let Some(created_on) = update.created_on {
            self.created_on = created_on;
        }
        if let Some(updated_on) = update.updated_on {
            self.updated_on = updated_on;
        }
        if let Some(open) = update.open {
            self.open = open;
        }
        if let Some(project) = update.project {
            self.project = project;
        }
    }
}

/// Data for creating a new issue
///
/// The store assigns the identifier and timestamps and opens the issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    /// Issue title
    pub issue_title: String,

    /// Issue description
    pub issue_text: String,

    /// Who reported the issue
    pub created_by: String,

    /// Assignee, empty when unassigned
    pub assigned_to: String,

    /// Free-form status line
    pub status_text: String,

    /// Project the issue belongs to
    pub project: String,
}

/// Data for updating an existing issue
///
/// Every field is optional; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    /// New title
    pub issue_title: Option<String>,

    /// New description
    pub issue_text: Option<String>,

    /// New reporter
    pub created_by: Option<String>,

    /// New assignee
    pub assigned_to: Option<String>,

    /// New status line
    pub status_text: Option<String>,

    /// New creation timestamp
    pub created_on: Option<DateTime<Utc>>,

    /// New update timestamp
    pub updated_on: Option<DateTime<Utc>>,

    /// New open flag
    pub open: Option<bool>,

    /// New project
    pub project: Option<String>,
}

impl IssueUpdate {
    /// Build an update from loosely typed request fields.
    ///
    /// Each known field is cast through the schema. `_id` and names outside
    /// the schema are ignored.
    ///
    /// # Errors
    ///
    /// Returns the cast error of the first value that does not fit its field.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let mut update = Self::default();

        for (name, value) in fields {
            match IssueField::from_name(name) {
                Some(IssueField::Id) => {}
                Some(field) => update.set(field, field.cast(value)?)?,
                None => debug!(field = %name, "Ignoring field outside the issue schema"),
            }
        }

        Ok(update)
    }

    /// Set one field from an already-cast value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidField` if the value kind does not match the
    /// field, or if the field is `_id`.
    pub fn set(&mut self, field: IssueField, value: FieldValue) -> Result<()> {
        match (field, value) {
            (IssueField::IssueTitle, FieldValue::Text(v)) => self.issue_title = Some(v),
            (IssueField::IssueText, FieldValue::Text(v)) => self.issue_text = Some(v),
            (IssueField::CreatedBy, FieldValue::Text(v)) => self.created_by = Some(v),
            (IssueField::AssignedTo, FieldValue::Text(v)) => self.assigned_to = Some(v),
            (IssueField::StatusText, FieldValue::Text(v)) => self.status_text = Some(v),
            (IssueField::Project, FieldValue::Text(v)) => self.project = Some(v),
            (IssueField::CreatedOn, FieldValue::Timestamp(v)) => self.created_on = Some(v),
            (IssueField::UpdatedOn, FieldValue::Timestamp(v)) => self.updated_on = Some(v),
            (IssueField::Open, FieldValue::Boolean(v)) => self.open = Some(v),
            (field, value) => {
                return Err(Error::InvalidField {
                    field: field.name().to_string(),
                    reason: format!("cannot set to {value:?}"),
                });
            }
        }
        Ok(())
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single filter constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Criterion {
    /// The field must equal the value
    Equals(IssueField, FieldValue),

    /// A field outside the schema; no issue has it, so nothing matches
    Unknown(String),
}

/// Filter for querying issues
///
/// All constraints must hold (logical AND); comparison is exact equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Only issues in this project
    pub project: Option<String>,

    criteria: Vec<Criterion>,
}

impl IssueFilter {
    /// A filter matching every issue in `project`.
    #[must_use]
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            criteria: Vec::new(),
        }
    }

    /// Add an exact-match constraint.
    #[must_use]
    pub fn with_criterion(mut self, field: IssueField, value: FieldValue) -> Self {
        self.criteria.push(Criterion::Equals(field, value));
        self
    }

    /// Add constraints from query-string pairs.
    ///
    /// Values are cast through the schema. A name outside the schema adds a
    /// constraint that no issue satisfies.
    ///
    /// A name that appears more than once adds one constraint per value, and
    /// all of them must hold. `open=true&open=false` therefore matches no
    /// issue, while repeating the same value is harmless.
    ///
    /// # Errors
    ///
    /// Returns the cast error of the first value that does not fit its field.
    pub fn with_query<'a, I>(mut self, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, raw) in params {
            let criterion = match IssueField::from_name(name) {
                Some(field) => Criterion::Equals(field, field.cast_str(raw)?),
                None => Criterion::Unknown(name.to_string()),
            };
            self.criteria.push(criterion);
        }
        Ok(self)
    }

    /// Whether an issue satisfies every constraint.
    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        if self
            .project
            .as_ref()
            .is_some_and(|project| &issue.project != project)
        {
            return false;
        }

        self.criteria.iter().all(|criterion| match criterion {
            Criterion::Equals(field, value) => issue.field_value(*field) == *value,
            Criterion::Unknown(_) => false,
        })
    }
}
