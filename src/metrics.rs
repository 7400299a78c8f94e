//! Run metrics aggregation.
//!
//! Second pass over the artifacts an orchestrator run leaves behind:
//! count agent actions, classify both verification phases, and compute
//! the resolved verdict. This pass never fails on missing or malformed
//! logs; a missing file is itself a classification.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::ArtifactsDir;
use crate::outcome::{parse_test_output, TestStats};

/// Classification of one verification phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Pre-verification failed, demonstrating the bug.
    SuccessFailureReproduced,
    /// Pre-verification passed; there is no bug to fix.
    UnexpectedPass,
    /// Post-verification ran tests and none failed.
    SuccessFixed,
    /// Post-verification still fails (or ran nothing).
    FailedFix,
    /// The phase's log file is absent.
    MissingLog,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuccessFailureReproduced => write!(f, "success_failure_reproduced"),
            Self::UnexpectedPass => write!(f, "unexpected_pass"),
            Self::SuccessFixed => write!(f, "success_fixed"),
            Self::FailedFix => write!(f, "failed_fix"),
            Self::MissingLog => write!(f, "missing_log"),
        }
    }
}

/// Parsed counts for the phases whose logs were present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<TestStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<TestStats>,
}

/// Final verdict for one run, written to `result.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub agent_actions: usize,
    pub pre_verification_status: PhaseStatus,
    pub post_verification_status: PhaseStatus,
    pub resolved: bool,
    pub details: RunDetails,
}

/// Pre-verification succeeds when it demonstrates the bug.
pub fn classify_pre(stats: &TestStats) -> PhaseStatus {
    if stats.failed > 0 {
        PhaseStatus::SuccessFailureReproduced
    } else {
        PhaseStatus::UnexpectedPass
    }
}

/// Post-verification succeeds only when tests ran and none failed.
pub fn classify_post(stats: &TestStats) -> PhaseStatus {
    if stats.failed == 0 && stats.passed > 0 {
        PhaseStatus::SuccessFixed
    } else {
        PhaseStatus::FailedFix
    }
}

/// Aggregate the artifacts of a finished run into a [`RunMetrics`].
pub fn compute_metrics(artifacts: &ArtifactsDir) -> RunMetrics {
    let agent_actions = artifacts
        .read(&artifacts.agent_log())
        .map(|content| content.lines().count())
        .unwrap_or(0);

    let mut details = RunDetails::default();

    let pre_verification_status = match artifacts.read(&artifacts.pre_verification_log()) {
        Some(content) => {
            let stats = parse_test_output(&content);
            details.pre = Some(stats);
            classify_pre(&stats)
        }
        None => PhaseStatus::MissingLog,
    };

    let post_verification_status = match artifacts.read(&artifacts.post_verification_log()) {
        Some(content) => {
            let stats = parse_test_output(&content);
            details.post = Some(stats);
            classify_post(&stats)
        }
        None => PhaseStatus::MissingLog,
    };

    let resolved = pre_verification_status == PhaseStatus::SuccessFailureReproduced
        && post_verification_status == PhaseStatus::SuccessFixed;

    RunMetrics {
        agent_actions,
        pre_verification_status,
        post_verification_status,
        resolved,
        details,
    }
}

/// Write the metrics document, replacing any prior result.
pub fn write_metrics(artifacts: &ArtifactsDir, metrics: &RunMetrics) -> Result<()> {
    info!(
        resolved = metrics.resolved,
        pre = %metrics.pre_verification_status,
        post = %metrics.post_verification_status,
        "Generating result.json"
    );
    let json = serde_json::to_string_pretty(metrics)?;
    std::fs::write(artifacts.result_json(), json)?;
    Ok(())
}
