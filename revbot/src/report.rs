//! Report and annotation-body rendering.
//!
//! Two user-visible artifacts come out of a run: the per-finding annotation
//! body recorded in the store (carrying the stable marker the reconciler
//! keys on) and the run report printed to stdout. Truncation gets an
//! explicit notice and findings outside the addressable range get their own
//! section instead of being silently dropped.

use std::fmt::Write;

use revbot_core::locate::{LocatedFinding, UnlocatedFinding};
use revbot_core::select::ChangeSelection;
use revbot_core::types::Finding;

/// Renders the body of one inline annotation.
///
/// The marker line is what identifies the annotation as revbot's own in
/// later runs — everything else is presentation.
pub fn annotation_body(finding: &Finding, marker: &str) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "**Bug:** {}", finding.bug);
    let _ = writeln!(body, "Severity: {}", finding.severity);
    let _ = writeln!(body, "{marker}");

    if let Some(fix) = &finding.suggested_fix {
        let _ = writeln!(body, "\n**Suggested fix:** {fix}");
    }
    if let Some(prompt) = &finding.agent_prompt {
        let _ = writeln!(
            body,
            "\n**Prompt for AI agent:**\n```\nLocation: {}#L{}\n\n{}\n```",
            finding.path, finding.line, prompt
        );
    }

    body
}

/// Renders the run report.
///
/// Sections, in order: summary, issue counts, the truncation notice (when
/// any file was pruned), and the "outside addressable range" list of
/// findings that could not be placed inline.
pub fn review_report(
    summary: &str,
    total_findings: usize,
    located: &[LocatedFinding],
    unlocated: &[UnlocatedFinding],
    selection: &ChangeSelection,
    marker: &str,
) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "## Automated review\n\n{summary}\n");

    if total_findings > 0 {
        let plural = if total_findings == 1 { "" } else { "s" };
        let _ = writeln!(
            report,
            "**{total_findings} issue{plural} found** ({} inline, {} outside the diff)",
            located.len(),
            unlocated.len()
        );
    } else {
        let _ = writeln!(report, "No issues found.");
    }

    if selection.truncated {
        let _ = writeln!(
            report,
            "\n> The diff was truncated to fit the review budget: {} of {} files were reviewed.",
            selection.files.len(),
            selection.total_files
        );
    }

    if !unlocated.is_empty() {
        let _ = writeln!(report, "\n### Issues outside addressable range\n");
        let _ = writeln!(
            report,
            "_These issues reference lines not present in the diff and could not be placed inline:_\n"
        );
        for item in unlocated {
            let _ = writeln!(
                report,
                "- `{}:{}` — {}",
                item.finding.path, item.finding.line, item.finding.bug
            );
        }
    }

    if !located.is_empty() {
        let _ = writeln!(report, "\n### Inline annotations\n");
        for item in located {
            let _ = writeln!(
                report,
                "- `{}` (offset {}):\n",
                item.finding.path, item.offset
            );
            for line in annotation_body(&item.finding, marker).lines() {
                let _ = writeln!(report, "  {line}");
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use revbot_core::types::Severity;

    fn finding(path: &str, line: u32) -> Finding {
        Finding {
            path: path.to_owned(),
            line,
            severity: Severity::High,
            bug: "index out of bounds".to_owned(),
            suggested_fix: Some("clamp the index".to_owned()),
            agent_prompt: None,
        }
    }

    #[test]
    fn annotation_body_embeds_marker() {
        let body = annotation_body(&finding("src/a.rs", 3), "<!-- revbot:finding -->");
        assert!(body.contains("<!-- revbot:finding -->"));
        assert!(body.contains("Severity: HIGH"));
        assert!(body.contains("**Suggested fix:**"));
    }

    #[test]
    fn report_surfaces_truncation_and_unlocated_sections() {
        let selection = ChangeSelection {
            files: vec![],
            truncated: true,
            total_files: 9,
        };
        let unlocated = vec![UnlocatedFinding {
            index: 0,
            finding: finding("src/a.rs", 400),
        }];

        let report = review_report("summary here", 1, &[], &unlocated, &selection, "<!-- m -->");
        assert!(report.contains("truncated to fit the review budget: 0 of 9"));
        assert!(report.contains("Issues outside addressable range"));
        assert!(report.contains("`src/a.rs:400`"));
    }
}
