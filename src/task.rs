//! Task configuration loading.
//!
//! A task document describes one bug-fix run: narrative fields used for
//! prompt construction, the verification command, and optional setup
//! commands executed before the first test run. The document is loaded
//! once and stays immutable for the run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// One bug-fix task, deserialized from a YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Short task title, prompt construction only.
    #[serde(default)]
    pub title: String,
    /// Narrative description of the bug, prompt construction only.
    #[serde(default)]
    pub description: String,
    /// Technical requirements the fix must respect.
    #[serde(default)]
    pub requirements: String,
    /// Interface specification the fix must respect.
    #[serde(default)]
    pub interface: String,
    /// Verification command configuration.
    pub tests: TestSpec,
    /// Optional provisioning commands run before pre-verification.
    #[serde(default)]
    pub setup: SetupSpec,
}

/// The `tests` section of a task document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Shell command that runs the task's test suite.
    pub test_command: String,
}

/// The `setup` section of a task document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupSpec {
    /// Newline-separated shell commands, run independently.
    #[serde(default)]
    pub commands: String,
}

impl TaskConfig {
    /// Load a task document from a YAML file.
    pub fn load(path: &Path) -> Result<Self, TaskError> {
        if !path.exists() {
            return Err(TaskError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| TaskError::InvalidYaml {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Setup commands that are safe to run standalone.
    ///
    /// Blank lines are skipped, as are `cd ` lines: each command runs in
    /// its own shell, so a directory change would not carry over anyway.
    pub fn setup_commands(&self) -> Vec<&str> {
        self.setup
            .commands
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("cd "))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK_YAML: &str = r#"
title: Fix import dedup
description: Imports are duplicated when retried.
requirements: Keep the public API unchanged.
interface: "process_import(record) -> ImportResult"
tests:
  test_command: "pytest tests/test_imports.py -x"
setup:
  commands: |
    cd /testbed
    pip install -e .

    make fixtures
"#;

    #[test]
    fn test_load_task_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.yaml");
        std::fs::write(&path, TASK_YAML).unwrap();

        let task = TaskConfig::load(&path).unwrap();
        assert_eq!(task.title, "Fix import dedup");
        assert_eq!(task.tests.test_command, "pytest tests/test_imports.py -x");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TaskConfig::load(&dir.path().join("task.yaml")).unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.yaml");
        std::fs::write(&path, "tests: [unclosed").unwrap();

        let err = TaskConfig::load(&path).unwrap_err();
        assert!(matches!(err, TaskError::InvalidYaml { .. }));
    }

    #[test]
    fn test_missing_test_command_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.yaml");
        std::fs::write(&path, "title: no tests section\n").unwrap();

        assert!(TaskConfig::load(&path).is_err());
    }

    #[test]
    fn test_setup_commands_skip_blank_and_cd_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.yaml");
        std::fs::write(&path, TASK_YAML).unwrap();

        let task = TaskConfig::load(&path).unwrap();
        assert_eq!(task.setup_commands(), vec!["pip install -e .", "make fixtures"]);
    }

    #[test]
    fn test_setup_section_optional() {
        let yaml = "tests:\n  test_command: pytest\n";
        let task: TaskConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(task.setup.commands.is_empty());
        assert!(task.setup_commands().is_empty());
    }
}
