//! Integration test for the annotation store lifecycle.
//!
//! Exercises: open_db, migrate, resume_or_create_session, record_annotation,
//! load_open_annotations, retract_annotation, touch_session.

use revbot_core::db;
use revbot_core::types::Severity;

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn full_annotation_lifecycle() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    // Verify schema_version = 1
    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    // Verify WAL mode
    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    // Create a session
    let session = db::resume_or_create_session(&conn, "/tmp/test-repo", "staged", "")
        .await
        .unwrap();
    assert!(!session.id.is_empty(), "session ID should be non-empty UUID");
    assert_eq!(session.repo_path, "/tmp/test-repo");

    // Resume same session (should return same ID)
    let resumed = db::resume_or_create_session(&conn, "/tmp/test-repo", "staged", "")
        .await
        .unwrap();
    assert_eq!(resumed.id, session.id, "should resume same session");

    // Different diff_mode creates new session
    let other = db::resume_or_create_session(&conn, "/tmp/test-repo", "range", "main..dev")
        .await
        .unwrap();
    assert_ne!(other.id, session.id, "different mode = new session");

    // No annotations yet
    let open = db::load_open_annotations(&conn, &session.id).await.unwrap();
    assert!(open.is_empty(), "no annotations recorded yet");

    // Record two annotations
    let a1 = db::record_annotation(
        &conn,
        &session.id,
        "src/main.rs",
        14,
        Severity::High,
        "**Bug:** off by one\n<!-- revbot:finding -->",
    )
    .await
    .unwrap();
    let _a2 = db::record_annotation(
        &conn,
        &session.id,
        "src/lib.rs",
        3,
        Severity::Low,
        "**Bug:** naming\n<!-- revbot:finding -->",
    )
    .await
    .unwrap();

    let open = db::load_open_annotations(&conn, &session.id).await.unwrap();
    assert_eq!(open.len(), 2);
    let first = open.iter().find(|a| a.id == a1).unwrap();
    assert_eq!(first.path, "src/main.rs");
    assert_eq!(first.line, Some(14));
    assert_eq!(first.original_line, 14);
    assert!(first.body.contains("<!-- revbot:finding -->"));

    // Annotations are scoped to their session
    let other_open = db::load_open_annotations(&conn, &other.id).await.unwrap();
    assert!(other_open.is_empty(), "other session sees no annotations");

    // Retract one annotation
    let retracted = db::retract_annotation(&conn, &a1).await.unwrap();
    assert!(retracted, "first retraction updates the row");

    // Retracting again is a no-op, not an error
    let again = db::retract_annotation(&conn, &a1).await.unwrap();
    assert!(!again, "second retraction finds nothing to update");

    // Unknown id is also a no-op
    let missing = db::retract_annotation(&conn, "no-such-id").await.unwrap();
    assert!(!missing);

    let open = db::load_open_annotations(&conn, &session.id).await.unwrap();
    assert_eq!(open.len(), 1, "retracted annotation no longer loads");
    assert_ne!(open[0].id, a1);

    db::touch_session(&conn, &session.id).await.unwrap();

    // Verify persistence: open a second connection to the same DB
    let conn2 = db::open_db(&path).await.unwrap();
    let open2 = db::load_open_annotations(&conn2, &session.id).await.unwrap();
    assert_eq!(open2.len(), 1, "annotation state should persist across connections");
}
