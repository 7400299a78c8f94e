//! Patch extraction and application.
//!
//! Model responses are free-form text; the diff payload may arrive in a
//! tagged fence, an untagged fence, or bare. Extraction failure is an
//! expected outcome the caller records, not an error.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::runner::run_command;

static DIFF_FENCE_RE: OnceLock<Regex> = OnceLock::new();
static ANY_FENCE_RE: OnceLock<Regex> = OnceLock::new();

fn diff_fence_re() -> &'static Regex {
    DIFF_FENCE_RE
        .get_or_init(|| Regex::new(r"(?s)```diff\n(.*?)```").expect("diff fence regex is valid"))
}

fn any_fence_re() -> &'static Regex {
    ANY_FENCE_RE.get_or_init(|| Regex::new(r"(?s)```\n(.*?)```").expect("fence regex is valid"))
}

/// Extract a unified diff from model-generated text.
///
/// Strategies in priority order: a fenced block tagged `diff`, any fenced
/// block whose content carries diff markers, then the raw text itself when
/// it looks like a bare diff. Returns `None` when nothing diff-shaped is
/// found.
pub fn extract_patch(response_text: &str) -> Option<String> {
    if let Some(caps) = diff_fence_re().captures(response_text) {
        return Some(caps.get(1)?.as_str().to_string());
    }

    if let Some(caps) = any_fence_re().captures(response_text) {
        let content = caps.get(1)?.as_str();
        if content.contains("diff --git") || content.contains("--- a/") {
            return Some(content.to_string());
        }
    }

    if response_text.contains("diff --git") && response_text.contains("index") {
        return Some(response_text.to_string());
    }

    None
}

/// Apply a patch file inside the repository checkout.
///
/// Tries `git apply` first and falls back to `patch -p1` with the same
/// file. Returns whether either application succeeded; failure is logged
/// and left for post-verification to surface.
pub async fn apply_patch(patch_file: &Path, repo_dir: &Path) -> bool {
    let abs_path = patch_file
        .canonicalize()
        .unwrap_or_else(|_| patch_file.to_path_buf());

    let git_cmd = format!("git apply {}", abs_path.display());
    match run_command(&git_cmd, None, false, Some(repo_dir)).await {
        Ok(out) if out.success() => return true,
        Ok(out) => {
            warn!(code = out.return_code, "git apply failed, trying patch command");
        }
        Err(e) => {
            warn!(error = %e, "git apply failed, trying patch command");
        }
    }

    let patch_cmd = format!("patch -p1 < {}", abs_path.display());
    match run_command(&patch_cmd, None, false, Some(repo_dir)).await {
        Ok(out) if out.success() => true,
        Ok(out) => {
            warn!(code = out.return_code, "Patch application failed");
            false
        }
        Err(e) => {
            warn!(error = %e, "Patch application failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF_BODY: &str = "diff --git a/src/lib.py b/src/lib.py\nindex 83db48f..bf269f4 100644\n--- a/src/lib.py\n+++ b/src/lib.py\n@@ -1,3 +1,3 @@\n-    return None\n+    return result\n";

    #[test]
    fn test_tagged_diff_fence_returns_exact_content() {
        let response = format!("Here is the fix:\n```diff\n{DIFF_BODY}```\nLet me know.");
        let patch = extract_patch(&response).unwrap();
        assert_eq!(patch, DIFF_BODY);
        assert!(!patch.contains("```"));
    }

    #[test]
    fn test_generic_fence_with_diff_markers() {
        let response = format!("```\n{DIFF_BODY}```");
        let patch = extract_patch(&response).unwrap();
        assert_eq!(patch, DIFF_BODY);
    }

    #[test]
    fn test_generic_fence_with_minus_a_header() {
        let body = "--- a/src/lib.py\n+++ b/src/lib.py\n@@ -1 +1 @@\n-x\n+y\n";
        let response = format!("```\n{body}```");
        assert_eq!(extract_patch(&response).unwrap(), body);
    }

    #[test]
    fn test_generic_fence_without_markers_is_skipped() {
        let response = "```\nprint('hello')\n```";
        assert!(extract_patch(response).is_none());
    }

    #[test]
    fn test_bare_diff_heuristic_returns_raw_text() {
        let patch = extract_patch(DIFF_BODY).unwrap();
        assert_eq!(patch, DIFF_BODY);
    }

    #[test]
    fn test_bare_diff_requires_index_line() {
        let text = "diff --git a/x b/x\n--- a/x\n+++ b/x\n";
        assert!(extract_patch(text).is_none());
    }

    #[test]
    fn test_plain_prose_yields_none() {
        assert!(extract_patch("I could not determine a fix for this bug.").is_none());
    }

    #[test]
    fn test_tagged_fence_preferred_over_generic() {
        let other = "--- a/other.py\n+++ b/other.py\n";
        let response = format!("```\n{other}```\n\n```diff\n{DIFF_BODY}```");
        assert_eq!(extract_patch(&response).unwrap(), DIFF_BODY);
    }
}
