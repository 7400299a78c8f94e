//! Error types for fixloop operations.
//!
//! Defines typed errors for the major subsystems:
//! - Task configuration loading
//! - External command execution
//! - LLM API interactions
//!
//! Orchestration code wraps these in `anyhow::Error`; the enums here are
//! the structured leaf failures.

use thiserror::Error;

/// Errors that can occur while loading the task configuration.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task file '{0}' not found")]
    NotFound(String),

    #[error("Invalid YAML in task file '{path}': {message}")]
    InvalidYaml { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during command execution.
///
/// Non-strict execution never produces `NonZeroExit` or `LaunchFailed`;
/// those failures are folded into the returned output instead.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command '{command}' exited with code {code}")]
    NonZeroExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Failed to launch command '{command}': {message}")]
    LaunchFailed { command: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
