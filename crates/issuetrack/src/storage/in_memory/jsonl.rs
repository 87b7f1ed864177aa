//! JSONL persistence for in-memory storage.
//!
//! One issue document per line, in ID order.

use super::inner::InMemoryStorageInner;
use crate::domain::{Issue, IssueId};
use crate::error::{Error, Result};
use crate::storage::IssueStorage;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal: the offending line is skipped and loading continues.
/// They indicate data that was edited by hand or written by a crashed
/// process, and should be logged.
///
/// ```no_run
/// # use issuetrack::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (storage, warnings) = load_from_jsonl(Path::new("data/issues.jsonl")).await?;
///
/// for warning in warnings {
///     match warning {
///         LoadWarning::MalformedJson { line_number, error } => {
///             eprintln!("Skipped malformed JSON at line {line_number}: {error}");
///         }
///         LoadWarning::DuplicateId { line_number, issue_id } => {
///             eprintln!("Skipped duplicate issue {issue_id} at line {line_number}");
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line that couldn't be parsed as an issue document
    ///
    /// Covers invalid JSON, missing required fields and malformed IDs.
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser error message
        error: String,
    },

    /// Issue whose ID already appeared on an earlier line
    ///
    /// The first occurrence wins.
    DuplicateId {
        /// 1-based line number of the skipped occurrence
        line_number: usize,
        /// The repeated ID
        issue_id: IssueId,
    },
}

/// Load storage from a JSONL file.
///
/// Blank lines are ignored. Lines that fail to parse and repeated IDs are
/// skipped and reported as warnings. Every loaded ID is registered with the
/// ID generator so new IDs never collide with stored ones.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read.
pub async fn load_from_jsonl(path: &Path) -> Result<(Box<dyn IssueStorage>, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut inner = InMemoryStorageInner::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let issue: Issue = match serde_json::from_str(&line) {
            Ok(issue) => issue,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if !seen.insert(issue.id.clone()) {
            warnings.push(LoadWarning::DuplicateId {
                line_number,
                issue_id: issue.id,
            });
            continue;
        }

        inner.insert(issue);
    }

    tracing::debug!(
        path = %path.display(),
        issues = inner.issues.len(),
        warnings = warnings.len(),
        "Loaded issues from JSONL"
    );

    Ok((Box::new(Arc::new(Mutex::new(inner))), warnings))
}

/// Save storage to a JSONL file with atomic writes.
///
/// Writes to a temporary file next to `path`, then renames it over `path`.
/// If the process crashes midway, the original file remains unchanged. On
/// any other failure the temporary file is removed before returning.
///
/// # Errors
///
/// Returns `Error::Io` on any filesystem failure and `Error::Json` if an
/// issue cannot be serialized.
pub async fn save_to_jsonl(storage: &dyn IssueStorage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    match write_and_rename(storage, &temp_path, path).await {
        Ok(saved) => {
            tracing::debug!(path = %path.display(), issues = saved, "Saved issues to JSONL");
            Ok(())
        }
        Err(e) => {
            match tokio::fs::remove_file(&temp_path).await {
                Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                    tracing::warn!(
                        path = %temp_path.display(),
                        error = %cleanup,
                        "Failed to remove temporary JSONL file"
                    );
                }
                _ => {}
            }
            Err(e)
        }
    }
}

async fn write_and_rename(storage: &dyn IssueStorage, temp_path: &Path, path: &Path) -> Result<usize> {
    let file = File::create(temp_path).await?;
    let mut writer = BufWriter::new(file);

    let issues = storage.export_all().await?;

    for issue in &issues {
        let json = serde_json::to_string(issue).map_err(Error::Json)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    drop(writer);

    // Atomic rename
    tokio::fs::rename(temp_path, path).await?;
    Ok(issues.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::in_memory::new_in_memory_storage;
    use crate::storage::MockStorage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_failed_save_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("issues.jsonl");
        std::fs::write(&path, "previous contents\n").unwrap();

        // Exporting from the mock always fails, after the temp file exists
        let result = save_to_jsonl(&MockStorage::new(), &path).await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous contents\n");
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail
        let path = temp_dir.path().join("issues.jsonl");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "").unwrap();

        let storage = new_in_memory_storage();
        let result = save_to_jsonl(storage.as_ref(), &path).await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!path.with_extension("tmp").exists());
    }
}
