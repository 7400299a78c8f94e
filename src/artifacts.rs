//! Artifact layout shared by the workflow and metrics passes.
//!
//! The orchestrator writes logs, prompts, and patches under one working
//! directory; the metrics pass later reads the same files back. This
//! module is the single definition of that layout, so the two passes can
//! run in separate invocations without agreeing on anything but a path.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pre-fix verification transcript, recreated at the start of the phase.
pub const PRE_VERIFICATION_LOG: &str = "pre_verification.log";
/// Post-fix verification transcript, recreated at the start of the phase.
pub const POST_VERIFICATION_LOG: &str = "post_verification.log";
/// One JSON record per agent invocation.
pub const AGENT_LOG: &str = "agent.log";
/// One JSON record per successful model exchange.
pub const PROMPTS_LOG: &str = "prompts.log";
/// Human-readable transcript of model exchanges.
pub const PROMPTS_MD: &str = "prompts.md";
/// Last extracted diff, overwritten per run.
pub const CHANGES_PATCH: &str = "changes.patch";
/// Raw model response, written only when no patch could be extracted.
pub const RAW_RESPONSE: &str = "agent_response_raw.txt";
/// Final metrics document, overwritten per aggregation.
pub const RESULT_JSON: &str = "result.json";

/// Working directory holding all artifacts of one run.
#[derive(Debug, Clone)]
pub struct ArtifactsDir {
    base_path: PathBuf,
}

impl ArtifactsDir {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Ensure the directory exists before the first write.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_path)
    }

    pub fn pre_verification_log(&self) -> PathBuf {
        self.base_path.join(PRE_VERIFICATION_LOG)
    }

    pub fn post_verification_log(&self) -> PathBuf {
        self.base_path.join(POST_VERIFICATION_LOG)
    }

    pub fn agent_log(&self) -> PathBuf {
        self.base_path.join(AGENT_LOG)
    }

    pub fn prompts_log(&self) -> PathBuf {
        self.base_path.join(PROMPTS_LOG)
    }

    pub fn prompts_md(&self) -> PathBuf {
        self.base_path.join(PROMPTS_MD)
    }

    pub fn changes_patch(&self) -> PathBuf {
        self.base_path.join(CHANGES_PATCH)
    }

    pub fn raw_response(&self) -> PathBuf {
        self.base_path.join(RAW_RESPONSE)
    }

    pub fn result_json(&self) -> PathBuf {
        self.base_path.join(RESULT_JSON)
    }

    /// Remove a stale artifact so the next append starts from empty.
    pub fn reset(&self, path: &Path) -> std::io::Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Read an artifact, treating a missing or unreadable file as absent.
    pub fn read(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    /// Append one JSON object as a line to a JSONL artifact.
    pub fn append_jsonl(&self, path: &Path, record: &serde_json::Value) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", record)
    }

    /// Append free text to an artifact without truncating prior content.
    pub fn append_text(&self, path: &Path, text: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_join_base_dir() {
        let artifacts = ArtifactsDir::new("/tmp/run-1");
        assert_eq!(
            artifacts.pre_verification_log(),
            PathBuf::from("/tmp/run-1/pre_verification.log")
        );
        assert_eq!(artifacts.result_json(), PathBuf::from("/tmp/run-1/result.json"));
    }

    #[test]
    fn test_append_jsonl_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactsDir::new(dir.path());
        let log = artifacts.agent_log();

        artifacts.append_jsonl(&log, &json!({"action": "one"})).unwrap();
        artifacts.append_jsonl(&log, &json!({"action": "two"})).unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn test_reset_removes_existing_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactsDir::new(dir.path());
        let log = artifacts.pre_verification_log();

        artifacts.reset(&log).unwrap();
        std::fs::write(&log, "stale").unwrap();
        artifacts.reset(&log).unwrap();
        assert!(!log.exists());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactsDir::new(dir.path());
        assert!(artifacts.read(&artifacts.post_verification_log()).is_none());
    }

    #[test]
    fn test_append_text_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactsDir::new(dir.path());
        let md = artifacts.prompts_md();

        artifacts.append_text(&md, "## first\n").unwrap();
        artifacts.append_text(&md, "## second\n").unwrap();

        let content = std::fs::read_to_string(&md).unwrap();
        assert_eq!(content, "## first\n## second\n");
    }
}
