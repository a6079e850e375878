//! SQLite schema and forward-only migrations for the annotation store.

/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the full v1 schema.
///
/// Contains two tables:
/// - `sessions`: one row per review session, keyed by UUID v4 text. A
///   session groups the runs for one (repo, diff mode, diff args) tuple.
/// - `annotations`: inline annotations posted by review runs. `line_number`
///   is nullable (an anchor can be invalidated by later edits) while
///   `original_line` always records the line at posting time; the
///   reconciler falls back to it. `retracted_at` is set when a later run
///   retracts the annotation — rows are never deleted or edited.
///
/// All tables use `STRICT` mode for type enforcement.
/// Foreign keys use `ON DELETE CASCADE` so removing a session cleans up all
/// of its annotations.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        id          TEXT    PRIMARY KEY,
        repo_path   TEXT    NOT NULL,
        diff_mode   TEXT    NOT NULL,
        diff_args   TEXT    NOT NULL DEFAULT '',
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS annotations (
        id            TEXT    PRIMARY KEY,
        session_id    TEXT    NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        file_path     TEXT    NOT NULL,
        line_number   INTEGER,
        original_line INTEGER NOT NULL,
        severity      TEXT    NOT NULL
                              CHECK(severity IN ('high','medium','low')),
        body          TEXT    NOT NULL,
        created_at    INTEGER NOT NULL,
        retracted_at  INTEGER
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_annotations_session
        ON annotations(session_id, retracted_at);
";

/// Runs forward-only schema migration to migrate the DB to the latest version.
///
/// This function is idempotent: safe to call on every startup regardless of
/// whether the schema has already been applied.
///
/// # Process
///
/// 1. Creates the `schema_version` table if it does not exist.
/// 2. Reads the current version (`0` if the table is empty).
/// 3. If the version is below 1, applies `SCHEMA_V1_SQL` inside a
///    `BEGIN IMMEDIATE` transaction and records `version = 1`.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
