//! Prompt assembly for the review request.
//!
//! Renders the selected change set as fenced diff blocks with a strict JSON
//! response contract. Truncation is disclosed to the model so it does not
//! invent findings about files it cannot see.

use std::fmt::Write;

use revbot_core::select::ChangeSelection;

/// System and user halves of the review prompt.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds the review prompt from the bounded change set.
pub fn build_prompt(selection: &ChangeSelection, max_inline: usize) -> Prompt {
    let system = "You are a senior code reviewer. Report only confirmed bugs, \
security vulnerabilities, and performance problems you can demonstrate with a \
specific failing input. Do not report style preferences or speculative issues. \
An empty issues array is the correct output for clean code."
        .to_owned();

    let mut user = String::new();
    let _ = writeln!(user, "Files changed: {}", selection.total_files);
    if selection.truncated {
        let _ = writeln!(
            user,
            "Note: the diff was truncated to fit context limits. {} of {} files \
are shown, ordered by importance.",
            selection.files.len(),
            selection.total_files
        );
    }
    user.push('\n');

    for file in &selection.files {
        let _ = writeln!(
            user,
            "### {} ({}, +{}/-{})\n```diff\n{}\n```\n",
            file.path,
            file.status,
            file.additions,
            file.deletions,
            file.patch.as_deref().unwrap_or("(binary or empty)")
        );
    }

    let _ = write!(
        user,
        "Respond with a JSON object (no markdown fences, just raw JSON):\n\
{{\n\
  \"summary\": \"1-2 sentence overview of the review\",\n\
  \"issues\": [\n\
    {{\n\
      \"path\": \"exact/file/path.rs\",\n\
      \"line\": 42,\n\
      \"severity\": \"HIGH|MEDIUM|LOW\",\n\
      \"bug\": \"one-sentence description of the confirmed bug\",\n\
      \"suggested_fix\": \"concrete fix description\",\n\
      \"agent_prompt\": \"detailed instructions for an AI agent to verify and fix\"\n\
    }}\n\
  ]\n\
}}\n\
Rules:\n\
- `path` must exactly match a filename from the diff\n\
- `line` must be visible as an added (+) or context line in the diff\n\
- Maximum {max_inline} issues, ordered by severity\n\
- If no issues are found, return \"issues\": []"
    );

    Prompt { system, user }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revbot_core::types::{ChangedFile, FileStatus};

    #[test]
    fn prompt_discloses_truncation() {
        let selection = ChangeSelection {
            files: vec![ChangedFile {
                path: "src/a.rs".to_owned(),
                status: FileStatus::Modified,
                additions: 1,
                deletions: 0,
                patch: Some("@@ -1 +1,2 @@\n old\n+new".to_owned()),
            }],
            truncated: true,
            total_files: 7,
        };

        let prompt = build_prompt(&selection, 25);
        assert!(prompt.user.contains("1 of 7 files"));
        assert!(prompt.user.contains("### src/a.rs (modified, +1/-0)"));
        assert!(prompt.user.contains("Maximum 25 issues"));
    }
}
