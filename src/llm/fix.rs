//! Fix-request driver: prompt construction, model fallback, persistence.
//!
//! Walks the prioritized model list until one completion succeeds. The
//! winning exchange is recorded twice: a JSONL record for machines and a
//! markdown section for humans. Total exhaustion is reported as `None`;
//! the caller decides whether that is fatal.

use std::path::Path;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use super::anthropic::CompletionProvider;
use crate::artifacts::ArtifactsDir;
use crate::error::LlmError;
use crate::task::TaskConfig;

/// Maximum number of failure-log characters forwarded to the model.
const LOG_TAIL_CHARS: usize = 8000;

/// Prompt preview length in the human-readable transcript.
const PROMPT_PREVIEW_CHARS: usize = 1000;

/// Ask the models, in priority order, for a patch.
///
/// Returns the first successful response text; later models are never
/// tried once one succeeds. Per-model failures are logged and skipped
/// without retry. `None` means every model failed.
pub async fn request_fix(
    provider: &dyn CompletionProvider,
    models: &[String],
    task: &TaskConfig,
    repo_dir: &Path,
    failure_log: &str,
    artifacts: &ArtifactsDir,
) -> Option<String> {
    let system_prompt = build_system_prompt(task, repo_dir);
    let user_message = format!(
        "Here are the failure logs from the pre-verification step:\n\n{}",
        tail(failure_log, LOG_TAIL_CHARS)
    );

    for model in models {
        info!(model = model.as_str(), "Attempting API call");

        match provider.complete(model, &system_prompt, &user_message).await {
            Ok(text) => {
                info!(model = model.as_str(), "Success");
                if let Err(e) = persist_exchange(artifacts, model, &user_message, &text) {
                    // The fix attempt matters more than the transcript.
                    warn!(error = %e, "Failed to persist prompt transcript");
                }
                return Some(text);
            }
            Err(LlmError::ApiError { code, message }) => {
                warn!(
                    model = model.as_str(),
                    status = code,
                    body = message.as_str(),
                    "Model failed, trying next"
                );
            }
            Err(e) => {
                warn!(model = model.as_str(), error = %e, "Model failed, trying next");
            }
        }
    }

    warn!("All models failed");
    None
}

/// System instruction embedding the task context and the output contract.
fn build_system_prompt(task: &TaskConfig, repo_dir: &Path) -> String {
    format!(
        r#"You are an expert software developer tasked with fixing a bug in the repository under test.

Task Context:
{title}
{description}

Technical Requirements:
{requirements}

Interface Specification:
{interface}

The initial test run failed with the logs provided below. Your goal is to analyze the failure and provide a Git patch to fix the issue.

Current Working Directory: {repo}

Output Format:
Return ONLY the Git patch content inside a code block, like this:
```diff
diff --git a/path/to/file.py b/path/to/file.py
index ...
--- a/path/to/file.py
+++ b/path/to/file.py
@@ ... @@
- existing line
+ new line
```
Ensure the paths in the diff are relative to the repository root (e.g., src/core/imports.py).
"#,
        title = task.title,
        description = task.description,
        requirements = task.requirements,
        interface = task.interface,
        repo = repo_dir.display(),
    )
}

/// Record one successful exchange in both artifact forms.
fn persist_exchange(
    artifacts: &ArtifactsDir,
    model: &str,
    prompt: &str,
    response: &str,
) -> std::io::Result<()> {
    let now = Utc::now();

    let record = json!({
        "timestamp": now.to_rfc3339(),
        "model": model,
        "prompt": prompt,
        "response": response,
    });
    artifacts.append_jsonl(&artifacts.prompts_log(), &record)?;

    let section = format!(
        "## Prompt at {ts}\n\n### Model: {model}\n\n### Request\n```\n{preview}...(truncated)...\n```\n\n### Response\n```\n{response}\n```\n\n",
        ts = now.format("%Y-%m-%d %H:%M:%S"),
        model = model,
        preview = head(prompt, PROMPT_PREVIEW_CHARS),
        response = response,
    );
    artifacts.append_text(&artifacts.prompts_md(), &section)
}

/// Last `max_chars` characters of `s`, on char boundaries.
fn tail(s: &str, max_chars: usize) -> &str {
    let total = s.chars().count();
    if total <= max_chars {
        return s;
    }
    let skip = total - max_chars;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// First `max_chars` characters of `s`, on char boundaries.
fn head(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
