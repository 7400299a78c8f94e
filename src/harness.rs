//! Workflow harness for one bug-fix-and-verify cycle.
//!
//! Sequences setup, pre-verification, model invocation, patch application,
//! and post-verification over a target repository checkout, leaving a
//! self-describing artifact trail for the metrics pass. The sequence never
//! branches back; the only aborts are the fatal early exits at startup and
//! at total model failure.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::artifacts::ArtifactsDir;
use crate::llm::{request_fix, AnthropicClient, CompletionProvider, DEFAULT_MODELS};
use crate::outcome::{parse_test_output, VerificationResult};
use crate::patch::{apply_patch, extract_patch};
use crate::runner::run_command;
use crate::task::TaskConfig;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub task_file: PathBuf,
    pub repo_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub models: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            task_file: PathBuf::from("task.yaml"),
            repo_dir: PathBuf::from("/testbed"),
            artifacts_dir: PathBuf::from("."),
            models: DEFAULT_MODELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// What one completed workflow run observed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub pre: VerificationResult,
    pub post: VerificationResult,
    pub patch_extracted: bool,
    pub patch_applied: bool,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Run the full fix cycle against the real Anthropic API.
///
/// The credential check happens first: without `ANTHROPIC_API_KEY` no
/// network activity is attempted.
pub async fn run_workflow(config: &WorkflowConfig) -> Result<WorkflowReport> {
    let client = AnthropicClient::from_env()?;
    run_workflow_with_provider(&client, config).await
}

/// Run the full fix cycle with an explicit completion provider.
///
/// Errors returned here are the fatal states: missing or malformed task
/// configuration, missing repository checkout, or total model failure.
/// Everything else is recorded in artifacts and the run continues through
/// post-verification.
pub async fn run_workflow_with_provider(
    provider: &dyn CompletionProvider,
    config: &WorkflowConfig,
) -> Result<WorkflowReport> {
    info!("=== STARTING AGENT WORKFLOW ===");

    // 1. INIT: task configuration, fatal when missing or malformed.
    let task = TaskConfig::load(&config.task_file)
        .with_context(|| format!("Failed to load {}", config.task_file.display()))?;
    info!(task_file = %config.task_file.display(), title = %task.title, "Loaded task configuration");

    let verification_cmd = task.tests.test_command.clone();
    let artifacts = ArtifactsDir::new(&config.artifacts_dir);
    artifacts.ensure_dir()?;

    // 2. SETUP: the checkout must exist; provisioning is best-effort.
    if !config.repo_dir.exists() {
        anyhow::bail!(
            "Target directory {} does not exist",
            config.repo_dir.display()
        );
    }
    info!(repo = %config.repo_dir.display(), "Found target directory");

    let safe_dir_cmd = format!(
        "git config --global --add safe.directory {}",
        config.repo_dir.display()
    );
    run_command(&safe_dir_cmd, None, false, None).await?;
    let status = run_command("git status", None, false, Some(&config.repo_dir)).await?;
    if status.success() {
        info!("Git status: OK");
    } else {
        warn!(code = status.return_code, "git status failed in target directory");
    }

    for cmd in task.setup_commands() {
        let result = run_command(cmd, None, false, Some(&config.repo_dir)).await?;
        if !result.success() {
            warn!(command = cmd, code = result.return_code, "Setup command warning");
        }
    }

    // 3. PRE_VERIFY: reproduce the bug, capturing the evidence log.
    info!("Starting Pre-Verification...");
    let pre_log = artifacts.pre_verification_log();
    artifacts.reset(&pre_log)?;
    let pre_run = run_command(&verification_cmd, Some(&pre_log), false, None).await?;
    let pre = VerificationResult::new(
        pre_run.return_code,
        pre_run.stdout.clone(),
        parse_test_output(&pre_run.combined()),
    );

    info!(
        code = pre.return_code,
        passed = pre.stats.passed,
        failed = pre.stats.failed,
        "Pre-verification completed"
    );
    if !pre_run.stdout.is_empty() {
        info!("STDOUT preview: {}", preview(&pre_run.stdout, 300));
    }
    if !pre_run.stderr.is_empty() {
        info!("STDERR preview: {}", preview(&pre_run.stderr, 300));
    }

    // 4. AGENT_CALL: the full log file is the model's failure context.
    info!("Starting Agent Execution...");
    let failure_log = artifacts
        .read(&pre_log)
        .unwrap_or_else(|| format!("{}\n{}", pre_run.stdout, pre_run.stderr));

    let Some(response) = request_fix(
        provider,
        &config.models,
        &task,
        &config.repo_dir,
        &failure_log,
        &artifacts,
    )
    .await
    else {
        anyhow::bail!("Agent failed to provide a response");
    };

    artifacts.append_jsonl(
        &artifacts.agent_log(),
        &json!({
            "action": "generate_patch",
            "observation": "Analyzed logs and generated patch",
            "response_length": response.len(),
        }),
    )?;

    // 5. PATCH_APPLY: application failure is recorded, never fatal.
    let mut patch_extracted = false;
    let mut patch_applied = false;
    match extract_patch(&response) {
        Some(patch) => {
            patch_extracted = true;
            let patch_file = artifacts.changes_patch();
            std::fs::write(&patch_file, &patch)?;
            info!(patch = %patch_file.display(), "Patch saved. Applying...");

            patch_applied = apply_patch(&patch_file, &config.repo_dir).await;
            if !patch_applied {
                warn!("Patch application failed, but continuing to post-verification...");
            }
        }
        None => {
            warn!("No valid patch found in agent response");
            std::fs::write(artifacts.raw_response(), &response)?;
        }
    }

    // 6. POST_VERIFY: the rerun's exit code is informational only.
    info!("Starting Post-Verification...");
    let post_log = artifacts.post_verification_log();
    artifacts.reset(&post_log)?;
    let post_run = run_command(&verification_cmd, Some(&post_log), false, None).await?;
    let post = VerificationResult::new(
        post_run.return_code,
        post_run.stdout,
        parse_test_output(&post_run.combined()),
    );

    if post.return_code == 0 {
        info!(passed = post.stats.passed, "Post-verification passed! Fix successful.");
    } else {
        info!(
            code = post.return_code,
            failed = post.stats.failed,
            "Post-verification failed"
        );
    }

    info!("=== WORKFLOW COMPLETE ===");

    Ok(WorkflowReport {
        pre,
        post,
        patch_extracted,
        patch_applied,
    })
}

fn preview(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_config_default() {
        let config = WorkflowConfig::default();
        assert_eq!(config.task_file, PathBuf::from("task.yaml"));
        assert_eq!(config.repo_dir, PathBuf::from("/testbed"));
        assert_eq!(config.artifacts_dir, PathBuf::from("."));
        assert_eq!(config.models.len(), 4);
        assert_eq!(config.models[0], "claude-3-haiku-20240307");
    }

    #[test]
    fn test_preview_short_input() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let out = preview("héllo wörld", 2);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 5);
    }
}
