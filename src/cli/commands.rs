//! CLI command definitions for fixloop.
//!
//! The two subcommands mirror the two passes of the system: `run` drives
//! the workflow and writes artifacts, `metrics` reads them back and
//! writes the final verdict. They can execute in separate invocations
//! (and separate environments) against the same artifacts directory.

use clap::Parser;
use tracing::info;

use crate::artifacts::ArtifactsDir;
use crate::harness::{run_workflow, WorkflowConfig};
use crate::metrics::{compute_metrics, write_metrics};

/// Single-shot bug-fix harness for LLM evaluation.
#[derive(Parser)]
#[command(name = "fixloop")]
#[command(about = "Run a single bug-fix-and-verify cycle against a repository under test")]
#[command(version)]
#[command(
    long_about = "fixloop reproduces a failing test, asks a language model for a patch,\napplies it, re-runs the test, and records the outcome as filesystem artifacts.\n\nExample usage:\n  fixloop run --task task.yaml --repo-dir /testbed --artifacts-dir .\n  fixloop metrics --artifacts-dir ."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run one fix cycle: setup, pre-verify, request a patch, apply, post-verify.
    Run(RunArgs),

    /// Aggregate the artifacts of a finished run into result.json.
    Metrics(MetricsArgs),
}

/// Arguments for `fixloop run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Task configuration file.
    #[arg(short, long, default_value = "task.yaml")]
    pub task: String,

    /// Repository checkout the fix is applied to.
    #[arg(short, long, default_value = "/testbed")]
    pub repo_dir: String,

    /// Directory receiving logs, prompts, and the extracted patch.
    #[arg(short, long, default_value = ".")]
    pub artifacts_dir: String,

    /// Comma-separated model identifiers, tried in order.
    #[arg(short, long)]
    pub models: Option<String>,
}

/// Arguments for `fixloop metrics`.
#[derive(Parser, Debug)]
pub struct MetricsArgs {
    /// Directory holding the artifacts of a finished run.
    #[arg(short, long, default_value = ".")]
    pub artifacts_dir: String,
}

/// Parse command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse arguments and execute the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Execute the selected command with pre-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let mut config = WorkflowConfig {
                task_file: args.task.into(),
                repo_dir: args.repo_dir.into(),
                artifacts_dir: args.artifacts_dir.into(),
                ..WorkflowConfig::default()
            };
            if let Some(models) = args.models {
                config.models = parse_model_list(&models);
            }

            let report = run_workflow(&config).await?;
            info!(
                pre_failed = report.pre.stats.failed,
                post_failed = report.post.stats.failed,
                post_passed = report.post.stats.passed,
                patch_applied = report.patch_applied,
                "Workflow finished"
            );
            Ok(())
        }
        Commands::Metrics(args) => {
            let artifacts = ArtifactsDir::new(args.artifacts_dir);
            let metrics = compute_metrics(&artifacts);
            write_metrics(&artifacts, &metrics)?;
            info!(resolved = metrics.resolved, "Metrics written");
            Ok(())
        }
    }
}

fn parse_model_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}
