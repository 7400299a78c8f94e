//! External command execution.
//!
//! Commands run under `bash -c` with stdout and stderr captured
//! separately. Each invocation can append an audit record to a log file;
//! prior content is never overwritten.

use std::io::Write;
use std::path::Path;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::CommandError;

/// Captured result of one command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout and stderr concatenated, the form written to log files.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    pub fn success(&self) -> bool {
        self.return_code == 0
    }
}

/// Run a shell command, optionally appending an audit record to `log_file`.
///
/// Launch-level failures (command not found, permission denied) are folded
/// into a return code of -1 with the error message on stderr. With `strict`
/// set, a non-zero return code or launch failure instead becomes a
/// [`CommandError`] carrying the captured output.
pub async fn run_command(
    command: &str,
    log_file: Option<&Path>,
    strict: bool,
    cwd: Option<&Path>,
) -> Result<CommandOutput, CommandError> {
    info!(
        command = command,
        cwd = %cwd.map(|p| p.display().to_string()).unwrap_or_else(|| ".".to_string()),
        "Running command"
    );

    let mut cmd = Command::new("bash");
    cmd.args(["-c", command]);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = match cmd.output().await {
        Ok(output) => CommandOutput {
            return_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Err(e) => {
            warn!(command = command, error = %e, "Error executing command");
            if strict {
                return Err(CommandError::LaunchFailed {
                    command: command.to_string(),
                    message: e.to_string(),
                });
            }
            return Ok(CommandOutput {
                return_code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            });
        }
    };

    if let Some(path) = log_file {
        append_log_record(path, command, &output)?;
    }

    if strict && !output.success() {
        warn!(
            command = command,
            code = output.return_code,
            "Command failed in strict mode"
        );
        return Err(CommandError::NonZeroExit {
            command: command.to_string(),
            code: output.return_code,
            output: output.combined(),
        });
    }

    Ok(output)
}

fn append_log_record(
    path: &Path,
    command: &str,
    output: &CommandOutput,
) -> Result<(), CommandError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    write!(
        file,
        "\nCommand: {}\nReturn Code: {}\n--- OUTPUT ---\n{}\n--------------\n",
        command,
        output.return_code,
        output.combined()
    )?;
    Ok(())
}
