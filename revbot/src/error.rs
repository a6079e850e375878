use thiserror::Error;

/// Main error type for revbot runs.
///
/// Core algorithms never produce these — malformed patches and findings
/// degrade to empty results inside `revbot-core`. Errors here come from the
/// system boundary: git, the store, the inference backend, and IO.
#[derive(Debug, Error)]
pub enum RevbotError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("backend throttled: {0}")]
    Throttled(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("change set unavailable: {0}")]
    ChangeSet(String),
}
