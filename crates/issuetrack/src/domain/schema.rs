//! The issue schema.
//!
//! [`IssueField`] is the single, process-wide description of an issue
//! document: every field's wire name and the kind of value it holds. Query
//! strings and request bodies arrive loosely typed, so filters and updates
//! are cast through the schema before they reach the store.

use super::IssueId;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::fmt;

/// Kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,

    /// `true` / `false`
    Boolean,

    /// UTC timestamp
    Timestamp,

    /// Issue identifier
    Identifier,
}

/// A field of the issue document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueField {
    /// `_id`
    Id,
    /// `issue_title`
    IssueTitle,
    /// `issue_text`
    IssueText,
    /// `created_by`
    CreatedBy,
    /// `assigned_to`
    AssignedTo,
    /// `status_text`
    StatusText,
    /// `created_on`
    CreatedOn,
    /// `updated_on`
    UpdatedOn,
    /// `open`
    Open,
    /// `project`
    Project,
}

impl IssueField {
    /// Every field, in document order.
    pub const ALL: [IssueField; 10] = [
        IssueField::Id,
        IssueField::IssueTitle,
        IssueField::IssueText,
        IssueField::CreatedBy,
        IssueField::AssignedTo,
        IssueField::StatusText,
        IssueField::CreatedOn,
        IssueField::UpdatedOn,
        IssueField::Open,
        IssueField::Project,
    ];

    /// Fields a client must supply when creating an issue.
    pub const REQUIRED_ON_CREATE: [IssueField; 3] = [
        IssueField::IssueTitle,
        IssueField::IssueText,
        IssueField::CreatedBy,
    ];

    /// Wire name of the field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            IssueField::Id => "_id",
            IssueField::IssueTitle => "issue_title",
            IssueField::IssueText => "issue_text",
            IssueField::CreatedBy => "created_by",
            IssueField::AssignedTo => "assigned_to",
            IssueField::StatusText => "status_text",
            IssueField::CreatedOn => "created_on",
            IssueField::UpdatedOn => "updated_on",
            IssueField::Open => "open",
            IssueField::Project => "project",
        }
    }

    /// Kind of value the field holds.
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            IssueField::Id => FieldKind::Identifier,
            IssueField::CreatedOn | IssueField::UpdatedOn => FieldKind::Timestamp,
            IssueField::Open => FieldKind::Boolean,
            IssueField::IssueTitle
            | IssueField::IssueText
            | IssueField::CreatedBy
            | IssueField::AssignedTo
            | IssueField::StatusText
            | IssueField::Project => FieldKind::Text,
        }
    }

    /// Look a field up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Cast a JSON value to this field's kind.
    ///
    /// Text fields take strings as-is and numbers or booleans as their
    /// textual form. Booleans accept `true/false`, `1/0` and `yes/no`.
    /// Timestamps accept RFC 3339 strings, `YYYY-MM-DD` dates and epoch
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidField` when the value cannot represent this
    /// field, or `Error::InvalidId` for a malformed identifier.
    pub fn cast(self, value: &Value) -> Result<FieldValue> {
        match (self.kind(), value) {
            (FieldKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldKind::Text, Value::Number(n)) => Ok(FieldValue::Text(n.to_string())),
            (FieldKind::Text, Value::Bool(b)) => Ok(FieldValue::Text(b.to_string())),
            (FieldKind::Boolean, Value::Bool(b)) => Ok(FieldValue::Boolean(*b)),
            (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(1) => Ok(FieldValue::Boolean(true)),
                Some(0) => Ok(FieldValue::Boolean(false)),
                _ => Err(self.invalid(format!("'{n}' is not a boolean"))),
            },
            (FieldKind::Boolean, Value::String(s)) => parse_bool(s)
                .map(FieldValue::Boolean)
                .ok_or_else(|| self.invalid(format!("'{s}' is not a boolean"))),
            (FieldKind::Timestamp, Value::String(s)) => parse_timestamp(s)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| self.invalid(format!("'{s}' is not a timestamp"))),
            (FieldKind::Timestamp, Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| self.invalid(format!("'{n}' is not a timestamp"))),
            (FieldKind::Identifier, Value::String(s)) => IssueId::parse(s).map(FieldValue::Identifier),
            (_, other) => Err(self.invalid(format!("unsupported value {other}"))),
        }
    }

    /// Cast a query-string value to this field's kind.
    ///
    /// # Errors
    ///
    /// Same as [`cast`](Self::cast).
    pub fn cast_str(self, value: &str) -> Result<FieldValue> {
        self.cast(&Value::String(value.to_string()))
    }

    fn invalid(self, reason: String) -> Error {
        Error::InvalidField {
            field: self.name().to_string(),
            reason,
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value cast to a field's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// Timestamp value
    Timestamp(DateTime<Utc>),

    /// Identifier value
    Identifier(IssueId),
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Text of a value that counts as "provided".
///
/// Non-empty strings, non-zero numbers and `true` are provided. Absent
/// values, `null`, `""`, `0`, `false`, arrays and objects are not.
#[must_use]
pub fn present_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f.abs() > 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}
