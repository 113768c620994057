//! Centralized container CLI client.
//!
//! All child-process interactions go through `DockerClient`, which provides
//! consistent timeout handling, cancellation, error mapping to
//! [`DockerError`], and a single point where `Command::new` is constructed.

use super::DockerError;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default upper bound for a single CLI invocation.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Centralized client for container CLI operations.
///
/// Wraps every subprocess invocation with the configured timeout and the
/// shared [`CancellationToken`]. Cloning is cheap; clones share the token.
#[derive(Debug, Clone)]
pub struct DockerClient {
    binary: String,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerClient {
    pub fn new() -> Self {
        DockerClient {
            binary: "docker".to_string(),
            timeout: DEFAULT_PROCESS_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a different engine binary (absolute path or name on `PATH`).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a cancellation token; cancelling it aborts every in-flight call.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Run an arbitrary program with the client's timeout and cancellation,
    /// returning raw Output regardless of exit status.
    ///
    /// The child is killed if the future is dropped, which is what happens on
    /// timeout or cancellation.
    pub async fn run_program<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
        dir: Option<&Path>,
    ) -> Result<Output, DockerError> {
        let cmd_str = format_command(program, args);

        if self.cancel.is_cancelled() {
            return Err(DockerError::cancelled(cmd_str));
        }

        let mut command = tokio::process::Command::new(program);
        command
            .args(args.iter().map(|a| a.as_ref()))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        debug!(command = %cmd_str, dir = ?dir, "Running container CLI command");

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DockerError::cancelled(cmd_str)),
            result = tokio::time::timeout(self.timeout, command.output()) => match result {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(DockerError::exec_failed(cmd_str, e)),
                Err(_) => Err(DockerError::timeout(cmd_str, self.timeout)),
            },
        }
    }

    /// Like [`run_program`](Self::run_program), returning Output only if exit 0.
    pub async fn run_program_success<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
        dir: Option<&Path>,
    ) -> Result<Output, DockerError> {
        let output = self.run_program(program, args, dir).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(DockerError::failed(format_command(program, args), &output))
        }
    }

    /// Run the engine binary itself (`docker <args>`).
    pub async fn run(&self, args: &[&str]) -> Result<Output, DockerError> {
        self.run_program(&self.binary, args, None).await
    }

    /// Sleep for `delay`, aborting early on cancellation.
    async fn settle(&self, cmd: &str, delay: Duration) -> Result<(), DockerError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DockerError::cancelled(cmd)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    // ========================================================================
    // Engine-level queries
    // ========================================================================

    /// One-shot resource sample for a container, as raw JSON text.
    ///
    /// After the process exits we wait `settle` before accepting its output;
    /// `docker stats` has been seen to flush the last record late. A non-zero
    /// exit is always an error, even when stdout holds a partial record.
    pub async fn stats(&self, container: &str, settle: Duration) -> Result<String, DockerError> {
        let args = [
            "stats",
            container,
            "--no-stream",
            "--no-trunc",
            "--format",
            "{{ json . }}",
        ];
        let cmd_str = format_command(&self.binary, &args);
        let output = self.run(&args).await?;
        self.settle(&cmd_str, settle).await?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Err(DockerError::ContainerNotFound {
                container: container.to_string(),
            });
        }
        Err(DockerError::failed(cmd_str, &output))
    }
}

fn format_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut cmd = program.to_string();
    for arg in args {
        cmd.push(' ');
        cmd.push_str(arg.as_ref());
    }
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_exec_failure() {
        let client = DockerClient::new().with_binary("/nonexistent/hermes-docker");
        let err = client.run(&["ps"]).await.unwrap_err();
        assert!(matches!(err, DockerError::ExecFailed { .. }), "{err}");
    }

    #[tokio::test]
    async fn non_zero_exit_is_command_failure() {
        let client = DockerClient::new();
        let err = client
            .run_program_success("false", &[] as &[&str], None)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let client = DockerClient::new().with_timeout(Duration::from_millis(100));
        let err = client.run_program("sleep", &["5"], None).await.unwrap_err();
        assert!(matches!(err, DockerError::Timeout { .. }), "{err}");
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_spawn() {
        let token = CancellationToken::new();
        token.cancel();
        let client = DockerClient::new().with_cancellation(token);
        let err = client.run_program("sleep", &["5"], None).await.unwrap_err();
        assert!(matches!(err, DockerError::Cancelled { .. }), "{err}");
    }

    #[tokio::test]
    async fn cancellation_interrupts_running_command() {
        let token = CancellationToken::new();
        let client = DockerClient::new().with_cancellation(token.clone());

        let handle = tokio::spawn(async move { client.run_program("sleep", &["5"], None).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cancellation should finish promptly")
            .unwrap();
        assert!(matches!(result, Err(DockerError::Cancelled { .. })));
    }

    #[test]
    fn command_string_includes_args() {
        assert_eq!(
            format_command("docker", &["compose", "up", "-d"]),
            "docker compose up -d"
        );
    }
}
