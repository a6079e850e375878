//! Background thread that owns git2::Repository for its lifetime.
//!
//! git2::Repository is !Send — it must be opened inside the thread, not
//! passed in. All communication is via channels: ChangeSetRequest in,
//! ChangeSetPayload out over a tokio channel the async harness awaits.

use crossbeam_channel::Receiver;
use git2::{Delta, Diff, DiffOptions, Repository};
use tokio::sync::mpsc::UnboundedSender;

use revbot_core::types::{ChangedFile, FileStatus};

use crate::git::types::{ChangeSetPayload, ChangeSetRequest, DiffMode};

/// Entry point for the background thread that owns the git Repository.
///
/// Opens the Repository at `path` and loops over incoming `ChangeSetRequest`
/// messages until the channel is closed (sender dropped). Each request gets
/// exactly one `ChangeSetPayload` reply on `result_tx`.
pub fn change_set_worker(
    path: String,
    rx: Receiver<ChangeSetRequest>,
    result_tx: UnboundedSender<ChangeSetPayload>,
) {
    let repo = match Repository::open(&path) {
        Ok(r) => r,
        Err(e) => {
            let _ = result_tx.send(ChangeSetPayload {
                mode: DiffMode::default(),
                files: Vec::new(),
                error: Some(format!("cannot open repository at {path}: {e}")),
            });
            return;
        }
    };

    for request in rx {
        let payload = handle_request(&repo, request);
        let _ = result_tx.send(payload);
    }
}

/// Dispatches a ChangeSetRequest to the appropriate git2 diff and converts
/// the result to owned changed files.
fn handle_request(repo: &Repository, request: ChangeSetRequest) -> ChangeSetPayload {
    let (mode, diff_result) = match request {
        ChangeSetRequest::Collect(mode) => (mode, diff_for_mode(repo, mode)),
        ChangeSetRequest::CollectRange { from, to } => {
            (DiffMode::CommitRange, diff_for_range(repo, &from, &to))
        }
    };

    match diff_result {
        Ok(diff) => ChangeSetPayload {
            mode,
            files: collect_changed_files(&diff),
            error: None,
        },
        Err(e) => ChangeSetPayload {
            mode,
            files: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

/// Obtains a git2::Diff for simple diff modes (Unstaged, Staged, BranchComparison).
///
/// Returns git2::Error on any failure (repo missing HEAD, no branch named
/// "main", etc.).
fn diff_for_mode(repo: &Repository, mode: DiffMode) -> Result<Diff<'_>, git2::Error> {
    match mode {
        DiffMode::Unstaged => {
            let mut opts = DiffOptions::new();
            repo.diff_index_to_workdir(None, Some(&mut opts))
        }
        DiffMode::Staged => {
            let head_commit = repo.head()?.peel_to_commit()?;
            let head_tree = head_commit.tree()?;
            let mut opts = DiffOptions::new();
            repo.diff_tree_to_index(Some(&head_tree), None, Some(&mut opts))
        }
        DiffMode::BranchComparison => {
            let base_obj = repo.revparse_single("main")?;
            let base_commit = base_obj.peel_to_commit()?;
            let base_tree = base_commit.tree()?;
            let head_commit = repo.head()?.peel_to_commit()?;
            let head_tree = head_commit.tree()?;
            let mut opts = DiffOptions::new();
            repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut opts))
        }
        DiffMode::CommitRange => {
            // CommitRange requires explicit refs; Collect(CommitRange) is a no-op.
            Err(git2::Error::from_str("CommitRange requires CollectRange"))
        }
    }
}

/// Resolves two ref strings to trees and diffs them.
///
/// Returns git2::Error if either ref cannot be resolved or tree-walking fails.
fn diff_for_range<'a>(
    repo: &'a Repository,
    from: &str,
    to: &str,
) -> Result<Diff<'a>, git2::Error> {
    let old_obj = repo.revparse_single(from)?;
    let old_commit = old_obj.peel_to_commit()?;
    let old_tree = old_commit.tree()?;

    let new_obj = repo.revparse_single(to)?;
    let new_commit = new_obj.peel_to_commit()?;
    let new_tree = new_commit.tree()?;

    let mut opts = DiffOptions::new();
    repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))
}

/// Converts each diff delta into an owned [`ChangedFile`] with patch text.
///
/// Per-file patch text comes from `git2::Patch::to_buf`, which renders the
/// file header plus hunks exactly as `git diff` would — the format the diff
/// addresser and selector expect. Binary files (and any delta whose patch
/// cannot be materialized) get `patch: None` and zero line counts; the
/// selector treats them as empty and the addresser never sees them.
fn collect_changed_files(diff: &Diff<'_>) -> Vec<ChangedFile> {
    let mut files = Vec::new();

    for (idx, delta) in diff.deltas().enumerate() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_owned());

        let status = match delta.status() {
            Delta::Added => FileStatus::Added,
            Delta::Deleted => FileStatus::Removed,
            Delta::Renamed => FileStatus::Renamed,
            _ => FileStatus::Modified,
        };

        let (additions, deletions, patch) = match git2::Patch::from_diff(diff, idx) {
            Ok(Some(mut patch)) => {
                let (_, additions, deletions) = patch.line_stats().unwrap_or((0, 0, 0));
                let text = patch
                    .to_buf()
                    .ok()
                    .and_then(|buf| buf.as_str().map(str::to_owned));
                (additions, deletions, text)
            }
            _ => (0, 0, None),
        };

        files.push(ChangedFile {
            path,
            status,
            additions,
            deletions,
            patch,
        });
    }

    files
}
