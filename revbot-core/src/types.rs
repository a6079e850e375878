//! Shared data types for the review pipeline.
//!
//! All types here are fully owned (no borrowed lifetimes) so change-set data
//! can be built on the git worker thread and sent to the async harness over
//! a channel without arena allocation.

use std::fmt;

/// A review session tied to a specific repository, diff mode, and arguments.
///
/// Sessions are keyed by UUID v4 text. Each unique combination of `repo_path`,
/// `diff_mode`, and `diff_args` produces a separate session on first run;
/// subsequent runs resume the most-recent matching session, which is what
/// gives the reconciler a stable annotation history to compare against.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,           // UUID v4 text
    pub repo_path: String,
    pub diff_mode: String,
    pub diff_args: String,
    pub created_at: i64,      // Unix timestamp seconds
    pub updated_at: i64,      // Unix timestamp seconds
}

/// Status of a single file within a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Removed => "removed",
            FileStatus::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

/// One changed file in the change set under review.
///
/// `patch` is the file's unified-diff text; `None` for binary or over-large
/// files, which the addresser and selector treat as empty.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    /// Repository-relative path to the file.
    pub path: String,
    pub status: FileStatus,
    /// Number of lines added in this file.
    pub additions: usize,
    /// Number of lines removed from this file.
    pub deletions: usize,
    /// Unified-diff patch text, absent for binary files.
    pub patch: Option<String>,
}

/// Severity tag attached to a finding by the model.
///
/// Ordered from most to least severe; [`Severity::rank`] gives the sort key
/// used to keep high-severity findings ahead of the locator's inline cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Parses a severity tag case-insensitively. Unknown tags yield `None`;
    /// the caller drops the finding rather than guessing.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    /// Lowercase tag, matching the `CHECK` constraint in the annotations table.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Sort key: lower ranks sort first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(s)
    }
}

/// A single issue reported by the inference backend.
///
/// Produced from untrusted model output — instances only exist after
/// [`crate::findings`] has validated path, line, and severity. `line` is the
/// 1-based line number in the new version of the file.
#[derive(Debug, Clone)]
pub struct Finding {
    pub path: String,
    pub line: u32,
    pub severity: Severity,
    /// One-sentence description of the issue.
    pub bug: String,
    /// Optional remediation text.
    pub suggested_fix: Option<String>,
    /// Optional machine-actionable prompt for a follow-up agent.
    pub agent_prompt: Option<String>,
}

/// An inline annotation recorded by a previous review run.
///
/// Read-only input to the reconciler. `id` is the opaque identifier used to
/// retract the annotation; the core compares it but never mints one.
/// `line` is `None` when intervening edits invalidated the annotation's
/// anchor, in which case `original_line` (the line at posting time) is the
/// reconciliation fallback.
#[derive(Debug, Clone)]
pub struct PostedAnnotation {
    pub id: String,
    pub path: String,
    pub line: Option<u32>,
    pub original_line: u32,
    /// Full annotation body. Annotations created by this system embed the
    /// configured marker string; bodies without it are foreign comments.
    pub body: String,
}
