use std::process::Output;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single container CLI invocation.
///
/// Callers match on the variant to tell a missing binary apart from a
/// non-zero exit, a timeout or a cancellation.
#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Timed out running '{command}' (exceeded {} ms)", .timeout.as_millis())]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' failed{}: {stderr}", exit_suffix(.exit_code))]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Not on PATH, or not executable.
    #[error("Failed to execute '{command}': {source}")]
    ExecFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `docker stats` reported "No such container".
    #[error("No such container: {container}")]
    ContainerNotFound { container: String },

    #[error("Cancelled '{command}'")]
    Cancelled { command: String },
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit code {})", c))
        .unwrap_or_default()
}

impl DockerError {
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        DockerError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Non-zero exit, keeping the trimmed stderr of `output`.
    pub fn failed(cmd: impl Into<String>, output: &Output) -> Self {
        Self::cmd_failed(
            cmd,
            String::from_utf8_lossy(&output.stderr).trim(),
            output.status.code(),
        )
    }

    pub fn cmd_failed(
        cmd: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        DockerError::CommandFailed {
            command: cmd.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        DockerError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    pub fn cancelled(cmd: impl Into<String>) -> Self {
        DockerError::Cancelled {
            command: cmd.into(),
        }
    }

    /// Exit code of the failed process, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DockerError::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
