//! Integration tests for the case store
//!
//! Runs the case repository against a real SQLite file with migrations
//! applied.

use chrono::DateTime;
use lexbrain_engine::db::{CaseUpdate, Database};
use std::time::Duration;
use tempfile::TempDir;

async fn open() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("lexbrain.db"))
        .await
        .unwrap();
    (temp_dir, db)
}

#[tokio::test]
async fn test_case_lifecycle() {
    let (_dir, db) = open().await;
    let repo = db.cases();

    let case = repo
        .create_case("Doe v. Acme", "Wrongful termination", None)
        .await
        .unwrap();
    assert_eq!(case.status, "Open");
    assert_eq!(case.created_at, case.updated_at);

    tokio::time::sleep(Duration::from_millis(10)).await;

    let update = CaseUpdate {
        status: Some("In Progress".to_string()),
        ..CaseUpdate::default()
    };
    assert!(repo.update_case(case.case_id, &update).await.unwrap());

    let updated = repo.get_case(case.case_id).await.unwrap().unwrap();
    assert_eq!(updated.status, "In Progress");
    assert_eq!(updated.title, "Doe v. Acme");
    assert_eq!(updated.description, "Wrongful termination");
    assert_eq!(updated.created_at, case.created_at);

    let before = DateTime::parse_from_rfc3339(&case.updated_at).unwrap();
    let after = DateTime::parse_from_rfc3339(&updated.updated_at).unwrap();
    assert!(after > before);

    assert!(repo.delete_case(case.case_id).await.unwrap());
    assert!(repo.get_case(case.case_id).await.unwrap().is_none());
    assert!(!repo.delete_case(case.case_id).await.unwrap());
}

#[tokio::test]
async fn test_update_missing_case() {
    let (_dir, db) = open().await;
    let update = CaseUpdate {
        title: Some("Renamed".to_string()),
        ..CaseUpdate::default()
    };
    assert!(!db.cases().update_case(999, &update).await.unwrap());
}

#[tokio::test]
async fn test_list_cases_by_status() {
    let (_dir, db) = open().await;
    let repo = db.cases();

    repo.create_case("First", "", None).await.unwrap();
    repo.create_case("Second", "", Some("Closed")).await.unwrap();
    repo.create_case("Third", "", None).await.unwrap();

    let all = repo.list_cases(None).await.unwrap();
    let titles: Vec<&str> = all.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);

    let open_cases = repo.list_cases(Some("Open")).await.unwrap();
    assert_eq!(open_cases.len(), 2);

    let closed = repo.list_cases(Some("Closed")).await.unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].title, "Second");

    assert!(repo.list_cases(Some("Archived")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_notes_and_documents() {
    let (_dir, db) = open().await;
    let repo = db.cases();
    let case = repo.create_case("Estate of Roe", "", None).await.unwrap();

    repo.add_note(case.case_id, "Called the executor").await.unwrap();
    repo.add_note(case.case_id, "Filed probate petition").await.unwrap();
    let notes = repo.get_notes(case.case_id).await.unwrap();
    let contents: Vec<&str> = notes.iter().map(|n| n.content.as_str()).collect();
    assert_eq!(contents, vec!["Called the executor", "Filed probate petition"]);

    let will = repo
        .add_document(case.case_id, "Last will", Some("/docs/will.pdf"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(will.file_path.as_deref(), Some("/docs/will.pdf"));
    repo.add_document(case.case_id, "Inventory", None)
        .await
        .unwrap()
        .unwrap();

    let documents = repo.get_documents(case.case_id).await.unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1].file_path, None);

    assert!(repo.add_document(999, "Orphan", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_cascades() {
    let (_dir, db) = open().await;
    let repo = db.cases();

    let keep = repo.create_case("Keep", "", None).await.unwrap();
    let drop = repo.create_case("Drop", "", None).await.unwrap();
    repo.add_note(keep.case_id, "stays").await.unwrap();
    repo.add_note(drop.case_id, "goes").await.unwrap();
    repo.add_document(drop.case_id, "Brief", None).await.unwrap();

    assert!(repo.delete_case(drop.case_id).await.unwrap());

    assert!(repo.get_notes(drop.case_id).await.unwrap().is_empty());
    assert!(repo.get_documents(drop.case_id).await.unwrap().is_empty());
    assert_eq!(repo.get_notes(keep.case_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lexbrain.db");

    let db = Database::new(&path).await.unwrap();
    let case = db.cases().create_case("Persisted", "", None).await.unwrap();
    db.close().await.unwrap();

    let db = Database::new(&path).await.unwrap();
    let fetched = db.cases().get_case(case.case_id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Persisted");
}
