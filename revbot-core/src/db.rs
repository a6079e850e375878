//! Async access to the WAL-mode SQLite annotation store.
//!
//! All queries run through `tokio_rusqlite::Connection::call`, which hops to
//! the connection's worker thread. Writes use `BEGIN IMMEDIATE` so a second
//! revbot process cannot interleave between read and write.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::types::{PostedAnnotation, Session, Severity};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This function is the single entry point for all database connections.
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string)
/// so the setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL
/// configuration fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| {
        // WAL pragmas are connection-level settings, re-applied on every open.
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;

        // Checkpoint any leftover WAL from a previous run.
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;

        crate::schema::migrate(db)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Finds the most recent session for `repo_path + diff_mode + diff_args`,
/// or creates one.
///
/// On resume, `updated_at` is bumped so the session stays the most recent
/// match. On create, a new UUID v4 id is generated. Either way the returned
/// session is the one the current run's annotations belong to, and the one
/// whose history the reconciler reads.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query or write transaction fails.
pub async fn resume_or_create_session(
    conn: &Connection,
    repo_path: &str,
    diff_mode: &str,
    diff_args: &str,
) -> Result<Session, tokio_rusqlite::Error> {
    let repo_path = repo_path.to_owned();
    let diff_mode = diff_mode.to_owned();
    let diff_args = diff_args.to_owned();

    conn.call(move |db| {
        let existing: Option<Session> = db
            .query_row(
                "SELECT id, repo_path, diff_mode, diff_args, created_at, updated_at
                 FROM sessions
                 WHERE repo_path = ?1 AND diff_mode = ?2 AND diff_args = ?3
                 ORDER BY updated_at DESC
                 LIMIT 1",
                rusqlite::params![&repo_path, &diff_mode, &diff_args],
                |r| {
                    Ok(Session {
                        id: r.get(0)?,
                        repo_path: r.get(1)?,
                        diff_mode: r.get(2)?,
                        diff_args: r.get(3)?,
                        created_at: r.get(4)?,
                        updated_at: r.get(5)?,
                    })
                },
            )
            .optional()?;

        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let session = if let Some(mut session) = existing {
            tx.execute(
                "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, &session.id],
            )?;
            session.updated_at = now;
            session
        } else {
            let id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO sessions (id, repo_path, diff_mode, diff_args, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![&id, &repo_path, &diff_mode, &diff_args, now],
            )?;
            Session {
                id,
                repo_path,
                diff_mode,
                diff_args,
                created_at: now,
                updated_at: now,
            }
        };

        tx.commit()?;
        Ok(session)
    })
    .await
}

/// Records one posted annotation within `session_id` and returns its id.
///
/// `line` is stored both as the live anchor (`line_number`) and as
/// `original_line`, the value the reconciler falls back to if the anchor is
/// later invalidated.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the insert transaction fails.
pub async fn record_annotation(
    conn: &Connection,
    session_id: &str,
    path: &str,
    line: u32,
    severity: Severity,
    body: &str,
) -> Result<String, tokio_rusqlite::Error> {
    let session_id = session_id.to_owned();
    let path = path.to_owned();
    let body = body.to_owned();

    conn.call(move |db| {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO annotations
                 (id, session_id, file_path, line_number, original_line,
                  severity, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7)",
            rusqlite::params![&id, &session_id, &path, line, severity.as_str(), &body, now],
        )?;
        tx.commit()?;
        Ok(id)
    })
    .await
}

/// Loads all unretracted annotations for `session_id`, oldest first.
///
/// This is the prior-annotation input to the reconciler. Retracted rows are
/// excluded — they were already handled by an earlier run.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn load_open_annotations(
    conn: &Connection,
    session_id: &str,
) -> Result<Vec<PostedAnnotation>, tokio_rusqlite::Error> {
    let session_id = session_id.to_owned();

    conn.call(move |db| {
        let mut stmt = db.prepare(
            "SELECT id, file_path, line_number, original_line, body
             FROM annotations
             WHERE session_id = ?1 AND retracted_at IS NULL
             ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![&session_id], |r| {
                Ok(PostedAnnotation {
                    id: r.get(0)?,
                    path: r.get(1)?,
                    line: r.get::<_, Option<u32>>(2)?,
                    original_line: r.get(3)?,
                    body: r.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })
    .await
}

/// Marks the annotation `id` as retracted.
///
/// Returns `true` if a row was updated, `false` if the id does not exist or
/// was already retracted. Rows are never deleted; retraction is a one-way
/// timestamp so a retracted annotation can never be retracted twice.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the update transaction fails.
pub async fn retract_annotation(
    conn: &Connection,
    id: &str,
) -> Result<bool, tokio_rusqlite::Error> {
    let id = id.to_owned();

    conn.call(move |db| {
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let updated = tx.execute(
            "UPDATE annotations SET retracted_at = ?1
             WHERE id = ?2 AND retracted_at IS NULL",
            rusqlite::params![now, &id],
        )?;
        tx.commit()?;
        Ok(updated > 0)
    })
    .await
}

/// Updates the `updated_at` timestamp for `session_id` to the current time.
///
/// Called at the end of a run so `resume_or_create_session` keeps resuming
/// the same session next time.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the `BEGIN IMMEDIATE` transaction fails.
pub async fn touch_session(
    conn: &Connection,
    session_id: &str,
) -> Result<(), tokio_rusqlite::Error> {
    let session_id = session_id.to_owned();

    conn.call(move |db| {
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now, &session_id],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await
}
