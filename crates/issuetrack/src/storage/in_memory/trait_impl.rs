//! `IssueStorage` trait implementation for in-memory storage.

use super::InMemoryStorage;
use crate::domain::{Issue, IssueFilter, IssueId, IssueUpdate, NewIssue};
use crate::error::{Error, Result};
use crate::storage::IssueStorage;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tracing::debug;

#[async_trait]
impl IssueStorage for InMemoryStorage {
    async fn create(&mut self, new_issue: NewIssue) -> Result<Issue> {
        let mut inner = self.lock().await;

        let id = inner.generate_id()?;
        let now = Utc::now();

        let issue = Issue {
            id: id.clone(),
            issue_title: new_issue.issue_title,
            issue_text: new_issue.issue_text,
            created_by: new_issue.created_by,
            assigned_to: new_issue.assigned_to,
            status_text: new_issue.status_text,
            created_on: now,
            updated_on: now,
            open: true,
            project: new_issue.project,
        };

        inner.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn get(&self, id: &IssueId) -> Result<Option<Issue>> {
        let inner = self.lock().await;
        Ok(inner.issues.get(id).cloned())
    }

    async fn update(&mut self, id: &IssueId, updates: IssueUpdate) -> Result<Issue> {
        let mut inner = self.lock().await;

        let issue = inner
            .issues
            .get_mut(id)
            .ok_or_else(|| Error::IssueNotFound(id.clone()))?;

        let previous_update = issue.updated_on;
        issue.apply(updates);

        // updated_on must move forward on every update, even when the clock
        // reads the same instant twice
        if issue.updated_on <= previous_update {
            issue.updated_on = previous_update + TimeDelta::microseconds(1);
        }

        Ok(issue.clone())
    }

    async fn delete(&mut self, id: &IssueId) -> Result<Issue> {
        let mut inner = self.lock().await;

        inner
            .issues
            .remove(id)
            .ok_or_else(|| Error::IssueNotFound(id.clone()))
    }

    async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let inner = self.lock().await;

        Ok(inner
            .issues
            .values()
            .filter(|issue| filter.matches(issue))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let inner = self.lock().await;
        Ok(inner.issues.len())
    }

    async fn import_issues(&mut self, issues: Vec<Issue>) -> Result<()> {
        let mut inner = self.lock().await;

        for issue in issues {
            let id = issue.id.clone();
            if inner.insert(issue).is_some() {
                debug!(issue_id = %id, "Imported issue replaced an existing one");
            }
        }

        Ok(())
    }

    async fn export_all(&self) -> Result<Vec<Issue>> {
        let inner = self.lock().await;
        Ok(inner.issues.values().cloned().collect())
    }

    async fn save(&self) -> Result<()> {
        // No-op for in-memory storage
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        // Nothing on disk to reload from
        Ok(())
    }
}
