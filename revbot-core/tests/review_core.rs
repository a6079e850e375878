//! Integration tests for the pure review core.
//!
//! Exercises: build_address_map, select_change_set, locate_findings,
//! plan_retractions, and parse_review_response.

use regex::Regex;

use revbot_core::address::build_address_map;
use revbot_core::findings::parse_review_response;
use revbot_core::locate::locate_findings;
use revbot_core::reconcile::{plan_retractions, Retraction};
use revbot_core::select::{select_change_set, PriorityRule, TRUNCATION_MARKER};
use revbot_core::types::{ChangedFile, FileStatus, Finding, PostedAnnotation, Severity};

const MARKER: &str = "<!-- revbot:finding -->";

fn changed_file(path: &str, patch: Option<&str>) -> ChangedFile {
    ChangedFile {
        path: path.to_owned(),
        status: FileStatus::Modified,
        additions: 0,
        deletions: 0,
        patch: patch.map(str::to_owned),
    }
}

fn finding(path: &str, line: u32) -> Finding {
    Finding {
        path: path.to_owned(),
        line,
        severity: Severity::Medium,
        bug: "test issue".to_owned(),
        suggested_fix: None,
        agent_prompt: None,
    }
}

fn annotation(id: &str, path: &str, line: u32, marked: bool) -> PostedAnnotation {
    PostedAnnotation {
        id: id.to_owned(),
        path: path.to_owned(),
        line: Some(line),
        original_line: line,
        body: if marked {
            format!("**Bug:** something\n{MARKER}\n")
        } else {
            "a human wrote this".to_owned()
        },
    }
}

fn rule(pattern: &str, weight: u32) -> PriorityRule {
    PriorityRule {
        pattern: Regex::new(pattern).unwrap(),
        weight,
    }
}

// --- Patch Addresser ---

#[test]
fn address_map_empty_for_patch_without_hunks() {
    assert!(build_address_map("").is_empty());
    assert!(build_address_map("just some text\nno hunks here\n").is_empty());
}

#[test]
fn address_map_counts_physical_lines_from_first_hunk() {
    let patch = "@@ -1,3 +1,4 @@\n context1\n+added2\n context3\n context4";
    let map = build_address_map(patch);

    // Header is offset 1; every following physical line increments.
    assert_eq!(map.get(&1), Some(&2));
    assert_eq!(map.get(&2), Some(&3));
    assert_eq!(map.get(&3), Some(&4));
    assert_eq!(map.get(&4), Some(&5));
    assert_eq!(map.len(), 4);
}

#[test]
fn address_map_skips_deletions_and_file_headers() {
    let patch = "--- a/foo.rs\n+++ b/foo.rs\n@@ -1,2 +1,2 @@\n a\n-old\n+new";
    let map = build_address_map(patch);

    // File headers before the first @@ are unaddressable and uncounted.
    assert_eq!(map.get(&1), Some(&2), "context line right after header");
    // "-old" consumed offset 3 but recorded no key.
    assert_eq!(map.get(&2), Some(&4), "added line lands after the deletion");
    assert_eq!(map.len(), 2);
    assert!(map.values().all(|&offset| offset != 3), "deletion offset is never a value");
}

#[test]
fn address_map_offset_runs_across_hunks() {
    let patch = "@@ -1,2 +1,2 @@\n a\n-old\n+new\n@@ -10,2 +11,2 @@\n b\n+c";
    let map = build_address_map(patch);

    assert_eq!(map.get(&1), Some(&2));
    assert_eq!(map.get(&2), Some(&4));
    // Second header restarts the line counter at 11 but the offset keeps going.
    assert_eq!(map.get(&11), Some(&6));
    assert_eq!(map.get(&12), Some(&7));
}

#[test]
fn address_map_line_without_count_fields() {
    let map = build_address_map("@@ -3 +3 @@\n ctx");
    assert_eq!(map.get(&3), Some(&2));
}

// --- Change Set Selector ---

#[test]
fn selector_orders_by_first_matching_rule() {
    let rules = vec![rule("^routes/", 1), rule("^docs/", 5)];
    let files = vec![
        changed_file("docs/readme.md", Some("@@ -1 +1 @@\n x")),
        changed_file("routes/api.rs", Some("@@ -1 +1 @@\n y")),
        changed_file("zzz.bin", Some("@@ -1 +1 @@\n z")),
    ];

    let selection = select_change_set(&files, &rules, 10_000);
    let order: Vec<&str> = selection.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(order, vec!["routes/api.rs", "docs/readme.md", "zzz.bin"]);
    assert!(!selection.truncated);
    assert_eq!(selection.total_files, 3);
}

#[test]
fn selector_includes_partial_boundary_file_within_budget() {
    // First file fits; second file is the boundary with ample budget left.
    let small = "@@ -1,2 +1,2 @@\n aa\n bb"; // 22 bytes
    let big_body: String = (0..200).map(|i| format!("+line number {i}\n")).collect();
    let big = format!("@@ -1,1 +1,200 @@\n{big_body}");

    let files = vec![
        changed_file("a.rs", Some(small)),
        changed_file("b.rs", Some(&big)),
    ];
    let budget = small.len() + 600;

    let selection = select_change_set(&files, &[], budget);
    assert!(selection.truncated);
    assert_eq!(selection.files.len(), 2);

    let boundary = selection.files[1].patch.as_deref().unwrap();
    assert!(boundary.ends_with(TRUNCATION_MARKER));
    assert!(!boundary.ends_with(&format!("\n{TRUNCATION_MARKER}")), "cut lands at a newline, marker supplies its own");

    let total_bytes: usize = selection
        .files
        .iter()
        .map(|f| f.patch.as_deref().unwrap_or("").len())
        .sum();
    assert!(total_bytes <= budget, "output {total_bytes} bytes exceeds budget {budget}");

    // The partial patch still starts with an intact hunk header.
    assert!(boundary.starts_with("@@ -1,1 +1,200 @@"));
}

#[test]
fn selector_drops_boundary_file_when_budget_remainder_is_small() {
    let small = "@@ -1,2 +1,2 @@\n aa\n bb";
    let big: String = std::iter::once("@@ -1,1 +1,300 @@\n".to_owned())
        .chain((0..300).map(|i| format!("+line {i}\n")))
        .collect();

    let files = vec![
        changed_file("a.rs", Some(small)),
        changed_file("b.rs", Some(&big)),
    ];
    // Less than 500 bytes of headroom after the first file.
    let selection = select_change_set(&files, &[], small.len() + 100);

    assert!(selection.truncated);
    assert_eq!(selection.files.len(), 1);
    assert_eq!(selection.files[0].path, "a.rs");
}

#[test]
fn selector_excludes_everything_after_the_boundary() {
    let patch: String = std::iter::once("@@ -1,1 +1,50 @@\n".to_owned())
        .chain((0..50).map(|i| format!("+l{i}\n")))
        .collect();
    let files = vec![
        changed_file("a.rs", Some(&patch)),
        changed_file("b.rs", Some(&patch)),
        changed_file("c.rs", Some(&patch)),
    ];

    // Budget fits exactly one file and leaves <500 bytes.
    let selection = select_change_set(&files, &[], patch.len() + 10);
    assert!(selection.truncated);
    assert_eq!(selection.files.len(), 1);
    assert_eq!(selection.total_files, 3);
}

#[test]
fn selector_treats_missing_patch_as_empty() {
    let files = vec![changed_file("bin.dat", None)];
    let selection = select_change_set(&files, &[], 100);
    assert_eq!(selection.files.len(), 1);
    assert!(!selection.truncated);
}

// --- Finding Locator ---

#[test]
fn locator_splits_located_and_unlocated() {
    let patch = "@@ -1,3 +1,4 @@\n context1\n+added2\n context3\n context4";
    let files = vec![changed_file("src/a.rs", Some(patch))];
    let findings = vec![
        finding("src/a.rs", 2),   // addressable
        finding("src/a.rs", 99),  // line outside the diff
        finding("other.rs", 1),   // file outside the change set
    ];

    let set = locate_findings(&findings, &files, 25);
    assert_eq!(set.located.len(), 1);
    assert_eq!(set.located[0].offset, 3);
    assert_eq!(set.located[0].index, 0);

    let unlocated: Vec<usize> = set.unlocated.iter().map(|u| u.index).collect();
    assert_eq!(unlocated, vec![1, 2]);
}

#[test]
fn locator_cap_drops_excess_without_demoting() {
    let patch = "@@ -1,3 +1,4 @@\n context1\n+added2\n context3\n context4";
    let files = vec![changed_file("src/a.rs", Some(patch))];
    let findings: Vec<Finding> = (1..=4).map(|line| finding("src/a.rs", line)).collect();

    let set = locate_findings(&findings, &files, 2);
    assert_eq!(set.located.len(), 2);
    // First two findings in input order survive the cap.
    assert_eq!(set.located[0].index, 0);
    assert_eq!(set.located[1].index, 1);
    // The excess located findings appear nowhere.
    assert!(set.unlocated.is_empty());
}

#[test]
fn locator_handles_empty_change_set() {
    let set = locate_findings(&[finding("a.rs", 1)], &[], 25);
    assert!(set.located.is_empty());
    assert_eq!(set.unlocated.len(), 1);
}

// --- Annotation Reconciler ---

#[test]
fn reconciler_retains_matching_keys_and_ignores_foreign_comments() {
    let prior = vec![
        annotation("a1", "x.ts", 5, true),
        annotation("a2", "y.ts", 9, false),
    ];
    let fresh = vec![finding("x.ts", 5)];

    let retractions = plan_retractions(&prior, &fresh, MARKER);
    assert!(retractions.is_empty(), "matched key retained, unmarked comment untouched");
}

#[test]
fn reconciler_retracts_vanished_location_exactly_once() {
    let prior = vec![annotation("a1", "x.ts", 5, true)];
    let retractions = plan_retractions(&prior, &[], MARKER);

    assert_eq!(
        retractions,
        vec![Retraction {
            id: "a1".to_owned(),
            path: "x.ts".to_owned(),
            line: 5,
        }]
    );
}

#[test]
fn reconciler_falls_back_to_original_line() {
    let mut invalidated = annotation("a1", "x.ts", 5, true);
    invalidated.line = None;
    invalidated.original_line = 7;

    // A finding at the original line keeps the annotation alive.
    let kept = plan_retractions(&[invalidated.clone()], &[finding("x.ts", 7)], MARKER);
    assert!(kept.is_empty());

    let gone = plan_retractions(&[invalidated], &[finding("x.ts", 8)], MARKER);
    assert_eq!(gone.len(), 1);
    assert_eq!(gone[0].line, 7);
}

#[test]
fn reconciler_is_idempotent() {
    let prior = vec![
        annotation("a1", "x.ts", 5, true),
        annotation("a2", "x.ts", 6, true),
    ];
    let fresh = vec![finding("x.ts", 6)];

    let first = plan_retractions(&prior, &fresh, MARKER);
    let second = plan_retractions(&prior, &fresh, MARKER);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "a1");
}

// --- Response parsing ---

#[test]
fn parse_accepts_direct_json() {
    let text = r#"{"summary":"looked at 2 files","issues":[
        {"path":"src/a.rs","line":3,"severity":"HIGH","bug":"boom"},
        {"path":"src/b.rs","line":8,"severity":"low","bug":"meh"}
    ]}"#;

    let review = parse_review_response(text);
    assert_eq!(review.summary, "looked at 2 files");
    assert_eq!(review.findings.len(), 2);
    assert_eq!(review.dropped, 0);
    // Sorted high before low.
    assert_eq!(review.findings[0].severity, Severity::High);
    assert_eq!(review.findings[1].severity, Severity::Low);
}

#[test]
fn parse_extracts_embedded_json_block() {
    let text = "Sure! Here is the review:\n{\"summary\":\"ok\",\"issues\":[]}\nHope that helps.";
    let review = parse_review_response(text);
    assert_eq!(review.summary, "ok");
    assert!(review.findings.is_empty());
}

#[test]
fn parse_falls_back_to_plain_text_summary() {
    let review = parse_review_response("I could not produce JSON today.");
    assert_eq!(review.summary, "I could not produce JSON today.");
    assert!(review.findings.is_empty());
    assert_eq!(review.dropped, 0);
}

#[test]
fn parse_drops_malformed_entries_individually() {
    let text = r#"{"summary":"s","issues":[
        {"path":"ok.rs","line":1,"severity":"medium","bug":"real"},
        {"path":"","line":1,"severity":"medium","bug":"empty path"},
        {"path":"x.rs","line":0,"severity":"medium","bug":"zero line"},
        {"path":"x.rs","line":"12","severity":"medium","bug":"string line"},
        {"path":"x.rs","line":2,"severity":"catastrophic","bug":"bad tag"},
        {"path":"x.rs","line":3,"bug":"no severity"}
    ]}"#;

    let review = parse_review_response(text);
    assert_eq!(review.findings.len(), 1);
    assert_eq!(review.findings[0].path, "ok.rs");
    assert_eq!(review.dropped, 5);
}

#[test]
fn parse_supports_legacy_comments_field() {
    let text = r#"{"summary":"s","comments":[
        {"path":"a.rs","line":4,"severity":"high","bug":"b","suggestedFix":"fix it"}
    ]}"#;

    let review = parse_review_response(text);
    assert_eq!(review.findings.len(), 1);
    assert_eq!(review.findings[0].suggested_fix.as_deref(), Some("fix it"));
}
