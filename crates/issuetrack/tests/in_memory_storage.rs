//! Integration tests for the in-memory store and its JSONL persistence.

use issuetrack::domain::{FieldValue, IssueField, IssueFilter, IssueUpdate, NewIssue};
use issuetrack::storage::in_memory::{
    load_from_jsonl, new_in_memory_storage, save_to_jsonl, LoadWarning,
};
use issuetrack::storage::IssueStorage;
use proptest::prelude::*;
use rstest::rstest;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn new_issue(project: &str, title: &str) -> NewIssue {
    NewIssue {
        issue_title: title.to_string(),
        issue_text: format!("Description for {title}"),
        created_by: "Creator".to_string(),
        assigned_to: String::new(),
        status_text: String::new(),
        project: project.to_string(),
    }
}

#[tokio::test]
async fn test_create_assigns_distinct_ids_in_creation_order() {
    let mut storage = new_in_memory_storage();

    let mut ids = Vec::new();
    for i in 0..20 {
        let issue = storage.create(new_issue("test", &format!("Issue {i}"))).await.unwrap();
        ids.push(issue.id);
    }

    let listed: Vec<_> = storage
        .list(&IssueFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|issue| issue.id)
        .collect();

    assert_eq!(listed, ids);
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 20);
}

#[tokio::test]
async fn test_update_advances_updated_on_on_every_call() {
    let mut storage = new_in_memory_storage();
    let issue = storage.create(new_issue("test", "Title")).await.unwrap();

    let mut previous = issue.updated_on;
    for _ in 0..5 {
        // An update that tries to keep the old timestamp still moves it forward
        let update = IssueUpdate {
            updated_on: Some(issue.updated_on),
            status_text: Some("busy".to_string()),
            ..Default::default()
        };
        let updated = storage.update(&issue.id, update).await.unwrap();
        assert!(updated.updated_on > previous);
        assert_eq!(updated.created_on, issue.created_on);
        previous = updated.updated_on;
    }
}

#[tokio::test]
async fn test_update_and_delete_unknown_issue() {
    let mut storage = new_in_memory_storage();
    let issue = storage.create(new_issue("test", "Title")).await.unwrap();
    storage.delete(&issue.id).await.unwrap();

    assert!(storage.get(&issue.id).await.unwrap().is_none());
    assert!(storage.update(&issue.id, IssueUpdate::default()).await.is_err());
    assert!(storage.delete(&issue.id).await.is_err());
}

#[tokio::test]
async fn test_deleted_ids_are_not_reused() {
    let mut storage = new_in_memory_storage();
    let first = storage.create(new_issue("test", "First")).await.unwrap();
    storage.delete(&first.id).await.unwrap();

    let second = storage.create(new_issue("test", "Second")).await.unwrap();

    assert_ne!(first.id, second.id);
}

#[rstest]
#[case(IssueField::Open, FieldValue::Boolean(false), 1)]
#[case(IssueField::Open, FieldValue::Boolean(true), 2)]
#[case(IssueField::AssignedTo, FieldValue::Text("Ann".to_string()), 2)]
#[case(IssueField::CreatedBy, FieldValue::Text("Nobody".to_string()), 0)]
#[tokio::test]
async fn test_list_with_criterion(
    #[case] field: IssueField,
    #[case] value: FieldValue,
    #[case] expected: usize,
) {
    let mut storage = new_in_memory_storage();
    let a = storage.create(new_issue("test", "A")).await.unwrap();
    let b = storage.create(new_issue("test", "B")).await.unwrap();
    storage.create(new_issue("test", "C")).await.unwrap();
    storage.create(new_issue("other", "D")).await.unwrap();

    let assign = IssueUpdate {
        assigned_to: Some("Ann".to_string()),
        ..Default::default()
    };
    storage.update(&a.id, assign.clone()).await.unwrap();
    storage.update(&b.id, assign).await.unwrap();
    let close = IssueUpdate {
        open: Some(false),
        ..Default::default()
    };
    storage.update(&b.id, close).await.unwrap();

    let filter = IssueFilter::for_project("test").with_criterion(field, value);
    let issues = storage.list(&filter).await.unwrap();

    assert_eq!(issues.len(), expected);
    assert!(issues.iter().all(|issue| issue.project == "test"));
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("issues.jsonl");

    let mut storage = new_in_memory_storage();
    let first = storage.create(new_issue("test", "First")).await.unwrap();
    let second = storage.create(new_issue("other", "Second")).await.unwrap();
    save_to_jsonl(storage.as_ref(), &path).await.unwrap();

    assert!(!path.with_extension("tmp").exists());

    let (loaded, warnings) = load_from_jsonl(&path).await.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(loaded.export_all().await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn test_load_skips_malformed_and_duplicate_lines() {
    let mut source = new_in_memory_storage();
    let issue = source.create(new_issue("test", "Kept")).await.unwrap();
    let line = serde_json::to_string(&issue).unwrap();

    let mut duplicate = issue.clone();
    duplicate.issue_title = "Shadow".to_string();
    let duplicate_line = serde_json::to_string(&duplicate).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{line}").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "{{not json").unwrap();
    writeln!(file, r#"{{"_id": "xyz", "issue_title": "bad id"}}"#).unwrap();
    writeln!(file, "{duplicate_line}").unwrap();
    file.flush().unwrap();

    let (storage, warnings) = load_from_jsonl(file.path()).await.unwrap();

    assert_eq!(storage.count().await.unwrap(), 1);
    assert_eq!(
        storage.get(&issue.id).await.unwrap().unwrap().issue_title,
        "Kept"
    );
    assert_eq!(warnings.len(), 3);
    assert!(matches!(
        warnings[0],
        LoadWarning::MalformedJson { line_number: 3, .. }
    ));
    assert!(matches!(
        warnings[1],
        LoadWarning::MalformedJson { line_number: 4, .. }
    ));
    assert_eq!(
        warnings[2],
        LoadWarning::DuplicateId {
            line_number: 5,
            issue_id: issue.id,
        }
    );
}

#[tokio::test]
async fn test_loaded_ids_are_not_reissued() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("issues.jsonl");

    let mut storage = new_in_memory_storage();
    let existing = storage.create(new_issue("test", "Existing")).await.unwrap();
    save_to_jsonl(storage.as_ref(), &path).await.unwrap();

    let (mut loaded, _) = load_from_jsonl(&path).await.unwrap();
    let fresh = loaded.create(new_issue("test", "Fresh")).await.unwrap();

    assert_ne!(fresh.id, existing.id);
    assert_eq!(loaded.count().await.unwrap(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Listing by a field returns exactly the project's issues with that value.
    #[test]
    fn prop_list_matches_exact_values(
        assignees in prop::collection::vec(prop::sample::select(vec!["", "Ann", "Bob"]), 1..12),
        wanted in prop::sample::select(vec!["", "Ann", "Bob"]),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let mut storage = new_in_memory_storage();
            for (i, assignee) in assignees.iter().enumerate() {
                let mut issue = new_issue(if i % 2 == 0 { "even" } else { "odd" }, "T");
                issue.assigned_to = (*assignee).to_string();
                storage.create(issue).await.unwrap();
            }

            let filter = IssueFilter::for_project("even")
                .with_criterion(IssueField::AssignedTo, FieldValue::Text(wanted.to_string()));
            let listed = storage.list(&filter).await.unwrap();

            let expected = assignees
                .iter()
                .enumerate()
                .filter(|(i, assignee)| i % 2 == 0 && **assignee == wanted)
                .count();
            prop_assert_eq!(listed.len(), expected);
            for issue in &listed {
                prop_assert_eq!(issue.project.as_str(), "even");
                prop_assert_eq!(issue.assigned_to.as_str(), wanted);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
