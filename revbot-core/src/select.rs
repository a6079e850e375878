//! Change-set selection: priority ordering and byte-budget truncation.
//!
//! Prompt context is finite, so the change set is ordered by a configurable
//! rule table (important paths first) and the aggregate patch text is cut to
//! a byte budget. Truncation only ever happens at a newline boundary so the
//! surviving text stays parseable by the diff addresser and never splits a
//! multi-byte UTF-8 sequence.

use regex::Regex;

use crate::types::ChangedFile;

/// Weight assigned to filenames no rule matches. Higher weight sorts later.
pub const DEFAULT_WEIGHT: u32 = 10;

/// Appended to a partially included patch so readers (human or model) can
/// see the cut. Leads with a newline because the cut lands before one.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Minimum leftover budget worth filling with a partial file. Below this,
/// the fragment would be too small to review and the file is dropped whole.
const MIN_PARTIAL_BYTES: usize = 500;

/// One entry in the ordered priority table.
///
/// Rules are evaluated top to bottom and the first match wins, so the order
/// of the table is part of the policy — keep it a list, never a hash.
#[derive(Debug, Clone)]
pub struct PriorityRule {
    pub pattern: Regex,
    /// Lower weight = reviewed first.
    pub weight: u32,
}

/// The ordered, possibly pruned change set that fits the byte budget.
#[derive(Debug, Clone)]
pub struct ChangeSelection {
    /// Files in priority order; the last one may carry a truncated patch.
    pub files: Vec<ChangedFile>,
    /// True when any file was partially or fully dropped.
    pub truncated: bool,
    /// Number of files in the original, unpruned change set.
    pub total_files: usize,
}

/// Returns the weight of the first rule matching `path`, or [`DEFAULT_WEIGHT`].
pub fn file_weight(rules: &[PriorityRule], path: &str) -> u32 {
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(path))
        .map(|rule| rule.weight)
        .unwrap_or(DEFAULT_WEIGHT)
}

/// Orders `files` by the rule table and truncates to `budget_bytes`.
///
/// Files are accumulated in sorted order, summing each patch's UTF-8 byte
/// length. The first file that would exceed the budget becomes the boundary:
/// if more than [`MIN_PARTIAL_BYTES`] of budget remain, its patch is cut at
/// the last newline that keeps patch plus [`TRUNCATION_MARKER`] within the
/// budget and included; otherwise it is dropped. Everything after the
/// boundary is excluded.
pub fn select_change_set(
    files: &[ChangedFile],
    rules: &[PriorityRule],
    budget_bytes: usize,
) -> ChangeSelection {
    let mut sorted: Vec<ChangedFile> = files.to_vec();
    // Stable sort: files with equal weight keep their change-set order.
    sorted.sort_by_key(|f| file_weight(rules, &f.path));

    let mut included = Vec::new();
    let mut used_bytes = 0usize;
    let mut truncated = false;

    for file in sorted {
        let patch = file.patch.as_deref().unwrap_or("");
        let patch_bytes = patch.len();

        if used_bytes + patch_bytes > budget_bytes {
            truncated = true;
            let remaining = budget_bytes - used_bytes;
            if remaining > MIN_PARTIAL_BYTES {
                if let Some(partial) = truncate_patch(patch, remaining) {
                    let mut boundary = file.clone();
                    boundary.patch = Some(partial);
                    included.push(boundary);
                }
            }
            break;
        }

        used_bytes += patch_bytes;
        included.push(file);
    }

    ChangeSelection {
        files: included,
        truncated,
        total_files: files.len(),
    }
}

/// Cuts `patch` at the last newline that leaves room for the truncation
/// marker within `remaining` bytes, and appends the marker.
///
/// Returns `None` when no usable newline exists before the cut point, in
/// which case the boundary file is dropped entirely.
fn truncate_patch(patch: &str, remaining: usize) -> Option<String> {
    let limit = remaining.checked_sub(TRUNCATION_MARKER.len())?;
    let limit = limit.min(patch.len().saturating_sub(1));
    let cut = patch.as_bytes()[..=limit].iter().rposition(|&b| b == b'\n')?;
    if cut == 0 {
        return None;
    }
    Some(format!("{}{}", &patch[..cut], TRUNCATION_MARKER))
}
