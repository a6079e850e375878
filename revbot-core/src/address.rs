//! Diff addressing: new-file line numbers to patch-relative offsets.
//!
//! Inline annotations attach to an *addressable offset* — the 1-based index
//! of a physical line within a file's unified-diff text, counting every line
//! from the first hunk header onward (headers, context, additions, and
//! deletions all advance the offset). This module builds the lookup table
//! that translates a finding's new-file line number into that offset.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Map from new-file line number to addressable offset within the patch.
///
/// Deletion lines have no new-file line number and never appear as keys.
/// A line number absent from the map is outside the addressable range of
/// the diff; callers must treat it as unaddressable, not as offset zero.
pub type AddressMap = HashMap<u32, u32>;

// Hunk header: @@ -oldStart[,oldCount] +newStart[,newCount] @@
static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").expect("hunk header regex")
});

/// Builds the [`AddressMap`] for one file's unified-diff text.
///
/// Scans physical lines in order. A hunk header counts as one physical line
/// and resets the running new-file line counter to its declared start; lines
/// before the first header (file headers, mode lines) are ignored. Within a
/// hunk, `+` and context lines record `(line → offset)` and advance the line
/// counter; `-` lines advance only the offset. The offset counter runs
/// monotonically across all hunks of the patch.
///
/// An empty patch, or one with no hunk headers, yields an empty map.
pub fn build_address_map(patch: &str) -> AddressMap {
    let mut map = AddressMap::new();
    let mut offset: u32 = 0;
    let mut new_line: u32 = 0;

    for line in patch.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            offset += 1;
            new_line = caps[1].parse().unwrap_or(0);
            continue;
        }

        // Before the first hunk header — unaddressable region.
        if offset == 0 {
            continue;
        }

        offset += 1;

        if line.starts_with('+') {
            map.insert(new_line, offset);
            new_line += 1;
        } else if line.starts_with('-') {
            // Removed line: no new-file line number, offset only.
        } else {
            map.insert(new_line, offset);
            new_line += 1;
        }
    }

    map
}
