//! Test-output parsing and verification results.
//!
//! The parser targets the pytest summary line (`== 3 failed, 5 passed in
//! 1.2s ==`) and degrades to zeroed counts when no summary is present.
//! An explicit "no tests ran" marker is the one case reported as an error,
//! distinct from output that simply carries no information.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pass/fail counts recovered from one test run's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStats {
    pub passed: u32,
    pub failed: u32,
    #[serde(rename = "error")]
    pub errored: bool,
}

/// Outcome of one verification run: the raw process result plus the
/// counts parsed from its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub return_code: i32,
    pub stdout: String,
    #[serde(flatten)]
    pub stats: TestStats,
}

impl VerificationResult {
    pub fn new(return_code: i32, stdout: impl Into<String>, stats: TestStats) -> Self {
        Self {
            return_code,
            stdout: stdout.into(),
            stats,
        }
    }
}

// Summary line shape: separators around optional "N failed," and "M passed"
// groups, failed before passed. Extra categories (skipped, errors) and the
// timing suffix fall into the uncaptured tail.
static SUMMARY_RE: OnceLock<Regex> = OnceLock::new();

fn summary_re() -> &'static Regex {
    SUMMARY_RE.get_or_init(|| {
        Regex::new(r"=+\s+(?:(\d+)\s+failed,?)?\s*(?:(\d+)\s+passed,?)?.*=+")
            .expect("summary regex is valid")
    })
}

/// Extract pass/fail counts from raw test-runner output.
///
/// A "no tests ran" marker short-circuits to an errored result. Output
/// without a recognizable summary line yields zero counts and no error,
/// keeping the metrics pass always-completing.
pub fn parse_test_output(content: &str) -> TestStats {
    if content.contains("no tests ran") {
        return TestStats {
            passed: 0,
            failed: 0,
            errored: true,
        };
    }

    if let Some(caps) = summary_re().captures(content) {
        let failed = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let passed = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return TestStats {
            passed,
            failed,
            errored: false,
        };
    }

    TestStats {
        passed: 0,
        failed: 0,
        errored: false,
    }
}
