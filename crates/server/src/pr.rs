//! PR-analysis tools: pending-change summaries and PR templates.
//!
//! These tools shell out to `git` for diff/commit metadata and serve a static
//! template table. Failures are reported as `{"error": …}` tool results, not
//! transport errors — an agent asking about a directory that is not a git
//! repository should see a readable answer, not a 500.

use serde_json::{json, Value};
use tokio::process::Command;

/// The template table: file name and human-readable change type.
const PR_TEMPLATES: [(&str, &str); 7] = [
    ("bug.md", "Bug Fix"),
    ("feature.md", "Feature"),
    ("docs.md", "Documentation"),
    ("refactor.md", "Refactor"),
    ("test.md", "Test"),
    ("performance.md", "Performance"),
    ("security.md", "Security"),
];

/// Keyword → template-file mapping used by [`suggest_template`].
const TYPE_MAPPING: [(&str, &str); 13] = [
    ("bug", "bug.md"),
    ("fix", "bug.md"),
    ("feature", "feature.md"),
    ("enhancement", "feature.md"),
    ("docs", "docs.md"),
    ("documentation", "docs.md"),
    ("refactor", "refactor.md"),
    ("cleanup", "refactor.md"),
    ("test", "test.md"),
    ("testing", "test.md"),
    ("performance", "performance.md"),
    ("optimization", "performance.md"),
    ("security", "security.md"),
];

/// Returns the available PR templates with their markdown skeletons.
pub fn templates() -> Value {
    let templates: Vec<Value> = PR_TEMPLATES
        .iter()
        .map(|(filename, change_type)| {
            json!({
                "filename": filename,
                "type": change_type,
                "content": template_content(change_type),
            })
        })
        .collect();
    json!(templates)
}

fn template_content(change_type: &str) -> String {
    format!(
        "# {change_type}\n\n## Description\n\n## Changes Made\n\n## Testing\n\n## Checklist\n\n- [ ] Tests updated\n- [ ] Documentation updated\n"
    )
}

/// Suggests a template for the described change.
pub fn suggest_template(changes_summary: &str, change_type: &str) -> Value {
    let wanted = change_type.to_lowercase();
    let file = TYPE_MAPPING
        .iter()
        .find(|(keyword, _)| *keyword == wanted)
        .map(|(_, file)| *file)
        .unwrap_or("feature.md");

    let (filename, ttype) = PR_TEMPLATES
        .iter()
        .find(|(f, _)| *f == file)
        .copied()
        .unwrap_or(PR_TEMPLATES[1]);

    json!({
        "recommended_template": {
            "filename": filename,
            "type": ttype,
            "content": template_content(ttype),
        },
        "reasoning": format!(
            "Based on your analysis: '{changes_summary}', this appears to be a {change_type} change."
        ),
        "usage_hint": "Fill out the template sections and attach the change summary.",
    })
}

/// Summarises the changes between `base_branch` and `HEAD`.
pub async fn analyze_file_changes(
    base_branch: &str,
    include_diff: bool,
    max_diff_lines: usize,
    working_directory: Option<&str>,
) -> Value {
    let cwd = working_directory.unwrap_or(".");

    // A repository check first, so the caller gets one readable error
    // instead of four command failures.
    match git(cwd, &["status", "--porcelain"]).await {
        Ok(_) => {}
        Err(_) => return json!({"error": "Not in a git repository or git not available"}),
    }

    let range = format!("{base_branch}...HEAD");
    let files_changed = git(cwd, &["diff", "--name-status", &range]).await;
    let statistics = git(cwd, &["diff", "--stat", &range]).await;
    let commits = git(cwd, &["log", "--oneline", &format!("{base_branch}..HEAD")]).await;

    let (diff, truncated, total_diff_lines) = if include_diff {
        match git(cwd, &["diff", &range]).await {
            Ok(full) => {
                let lines: Vec<&str> = full.lines().collect();
                if lines.len() > max_diff_lines {
                    let shown = lines[..max_diff_lines].join("\n");
                    let note = format!(
                        "\n\n... Output truncated. Showing {max_diff_lines} of {} lines ...",
                        lines.len()
                    );
                    (format!("{shown}{note}"), true, lines.len())
                } else {
                    let total = lines.len();
                    (full, false, total)
                }
            }
            Err(err) => (format!("Diff unavailable: {err}"), false, 0),
        }
    } else {
        ("Diff not included".to_string(), false, 0)
    };

    json!({
        "base_branch": base_branch,
        "files_changed": files_changed.unwrap_or_default(),
        "statistics": statistics.unwrap_or_default(),
        "commits": commits.unwrap_or_default(),
        "diff": diff,
        "truncated": truncated,
        "total_diff_lines": total_diff_lines,
    })
}

/// Runs one git command, returning stdout or the stderr text on failure.
async fn git(cwd: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|err| err.to_string())?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}
