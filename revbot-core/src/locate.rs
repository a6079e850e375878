//! Finding location: resolving findings onto addressable diff offsets.
//!
//! The annotation-posting interface attaches comments by addressable offset
//! and has a hard capacity limit, so this module splits a finding list into
//! the ones that resolve to an offset (capped) and the ones that reference
//! lines outside the diff's addressable range.

use std::collections::HashMap;

use crate::address::{build_address_map, AddressMap};
use crate::types::{ChangedFile, Finding};

/// Default cap on located findings, matching the posting interface limit.
pub const DEFAULT_INLINE_CAP: usize = 25;

/// A finding successfully resolved to an addressable offset.
#[derive(Debug, Clone)]
pub struct LocatedFinding {
    /// Position in the original finding list, kept for downstream display.
    pub index: usize,
    pub finding: Finding,
    /// 1-based physical offset within the file's patch text.
    pub offset: u32,
}

/// A finding whose (file, line) could not be resolved to an offset.
#[derive(Debug, Clone)]
pub struct UnlocatedFinding {
    /// Position in the original finding list, kept for downstream display.
    pub index: usize,
    pub finding: Finding,
}

/// Output of [`locate_findings`].
#[derive(Debug, Clone, Default)]
pub struct LocatedSet {
    pub located: Vec<LocatedFinding>,
    pub unlocated: Vec<UnlocatedFinding>,
}

/// Resolves each finding to an addressable offset within its file's patch.
///
/// One [`AddressMap`] is built per filename and reused across findings for
/// the duration of the call. A finding naming a file outside the change set,
/// or a line with no entry in that file's map, is classified unlocated —
/// never coerced to a default offset.
///
/// The located list is capped at `inline_cap`, preferring the findings'
/// original relative order (callers pre-sort by severity). Located findings
/// beyond the cap are dropped from the output entirely rather than demoted
/// to unlocated, since the posting interface could not carry them anyway.
pub fn locate_findings(
    findings: &[Finding],
    files: &[ChangedFile],
    inline_cap: usize,
) -> LocatedSet {
    let maps: HashMap<&str, AddressMap> = files
        .iter()
        .map(|f| {
            let patch = f.patch.as_deref().unwrap_or("");
            (f.path.as_str(), build_address_map(patch))
        })
        .collect();

    let mut set = LocatedSet::default();

    for (index, finding) in findings.iter().enumerate() {
        let offset = maps
            .get(finding.path.as_str())
            .and_then(|map| map.get(&finding.line))
            .copied();

        match offset {
            Some(offset) => {
                if set.located.len() < inline_cap {
                    set.located.push(LocatedFinding {
                        index,
                        finding: finding.clone(),
                        offset,
                    });
                }
                // Over the cap: dropped, not demoted to unlocated.
            }
            None => set.unlocated.push(UnlocatedFinding {
                index,
                finding: finding.clone(),
            }),
        }
    }

    set
}
