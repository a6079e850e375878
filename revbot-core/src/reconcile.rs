//! Annotation reconciliation: retracting annotations for vanished findings.
//!
//! Each run compares its fresh finding set against the annotations posted by
//! prior runs. Identity across runs is the reconciliation key — the joined
//! `(path, line)` pair — so an annotation survives as long as *some* finding
//! still points at its location, even if the finding's text changed. Only
//! annotations carrying this system's marker are ever considered; everything
//! else is a foreign comment and must never be touched.

use std::collections::HashSet;

use crate::types::{Finding, PostedAnnotation};

/// One retraction to apply (or log, in dry-run mode).
///
/// `id` is the opaque identifier carried by the [`PostedAnnotation`]; the
/// path and line are retained for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retraction {
    pub id: String,
    pub path: String,
    pub line: u32,
}

/// Joins `(path, line)` into the key used to match findings to annotations.
pub fn reconciliation_key(path: &str, line: u32) -> String {
    format!("{path}:{line}")
}

/// Determines which marked prior annotations are stale.
///
/// An annotation is stale exactly when no finding in `findings` shares its
/// reconciliation key. Annotations whose body does not contain `marker` are
/// skipped unconditionally. When an annotation's live line was invalidated
/// (`line` is `None`), its `original_line` is used for the key instead.
///
/// Pure and idempotent: the same inputs always yield the same retractions.
pub fn plan_retractions(
    prior: &[PostedAnnotation],
    findings: &[Finding],
    marker: &str,
) -> Vec<Retraction> {
    let fresh_keys: HashSet<String> = findings
        .iter()
        .map(|f| reconciliation_key(&f.path, f.line))
        .collect();

    let mut stale = Vec::new();
    for annotation in prior {
        if !annotation.body.contains(marker) {
            continue;
        }
        let line = annotation.line.unwrap_or(annotation.original_line);
        if !fresh_keys.contains(&reconciliation_key(&annotation.path, line)) {
            stale.push(Retraction {
                id: annotation.id.clone(),
                path: annotation.path.clone(),
                line,
            });
        }
    }

    stale
}
