//! Owned data types for the git background thread.
//!
//! All types in this module are fully owned (no borrowed lifetimes) and
//! implement `Send` so change-set data can be transferred from the thread
//! that owns the `git2::Repository` to the async harness.

use std::str::FromStr;

use revbot_core::types::ChangedFile;

/// Which git comparison produces the change set under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// Working directory vs index (`git diff`).
    #[default]
    Unstaged,
    /// Index vs HEAD (`git diff --cached`).
    Staged,
    /// Arbitrary commit range (`git diff A..B`).
    CommitRange,
    /// Branch comparison (`git diff main..HEAD`).
    BranchComparison,
}

impl DiffMode {
    /// Stable string form, used as the session key in the annotation store.
    pub fn as_str(self) -> &'static str {
        match self {
            DiffMode::Unstaged => "unstaged",
            DiffMode::Staged => "staged",
            DiffMode::CommitRange => "range",
            DiffMode::BranchComparison => "branch",
        }
    }
}

impl FromStr for DiffMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstaged" => Ok(DiffMode::Unstaged),
            "staged" => Ok(DiffMode::Staged),
            "range" => Ok(DiffMode::CommitRange),
            "branch" => Ok(DiffMode::BranchComparison),
            other => Err(format!(
                "unknown diff mode '{other}' (expected unstaged, staged, range, or branch)"
            )),
        }
    }
}

/// Commands sent from the harness to the git background worker thread.
///
/// Sent over a `crossbeam_channel::Sender<ChangeSetRequest>`; the worker
/// receives these and performs the corresponding git operation.
#[derive(Debug)]
pub enum ChangeSetRequest {
    /// Collect the change set for a simple mode (Unstaged, Staged, or
    /// BranchComparison).
    Collect(DiffMode),
    /// Collect the change set for an explicit commit range.
    CollectRange {
        /// The starting ref (older commit or branch tip).
        from: String,
        /// The ending ref (newer commit or branch tip).
        to: String,
    },
}

/// Result payload sent from the git background thread back to the harness.
#[derive(Debug)]
pub struct ChangeSetPayload {
    /// The diff mode that was requested.
    pub mode: DiffMode,
    /// One entry per changed file, in diff order, each carrying its own
    /// unified patch text (absent for binary files).
    pub files: Vec<ChangedFile>,
    /// Set when the repository could not be diffed; `files` is empty then.
    pub error: Option<String>,
}
