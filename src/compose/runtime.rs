use super::command::{ComposeCommand, ComposeVariant};
use super::definition::DEFAULT_SERVICE_NAME;
use super::logs::{LogFilter, LogTail, DEFAULT_LOG_FILTERS};
use super::snapshot::{
    parse_players, parse_ps, parse_stats, ContainerSnapshot, PlayerCount, UsageSample,
};
use super::ContainerRuntime;
use crate::config::FleetConfig;
use crate::docker::DockerClient;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Delay after `docker stats` exits before its output is trusted.
pub const DEFAULT_STATS_SETTLE: Duration = Duration::from_millis(500);

pub const DEFAULT_RCON_BINARY: &str = "rcon-cli";

/// [`ContainerRuntime`] backed by the `docker compose` CLI.
///
/// Every invocation runs with the server's working directory as cwd so
/// compose picks up its `docker-compose.yml` and project name.
#[derive(Debug)]
pub struct ComposeRuntime {
    client: DockerClient,
    variant: ComposeVariant,
    command: OnceCell<ComposeCommand>,
    service: String,
    rcon_binary: String,
    log_filter: LogFilter,
    stats_settle: Duration,
}

impl ComposeRuntime {
    pub fn new(client: DockerClient) -> Result<Self> {
        Ok(Self {
            client,
            variant: ComposeVariant::Auto,
            command: OnceCell::new(),
            service: DEFAULT_SERVICE_NAME.to_string(),
            rcon_binary: DEFAULT_RCON_BINARY.to_string(),
            log_filter: LogFilter::new(DEFAULT_LOG_FILTERS)?,
            stats_settle: DEFAULT_STATS_SETTLE,
        })
    }

    pub fn from_config(config: &FleetConfig, cancel: CancellationToken) -> Result<Self> {
        let client = DockerClient::new()
            .with_binary(config.docker_binary.clone())
            .with_timeout(config.process_timeout)
            .with_cancellation(cancel);
        Ok(Self::new(client)?
            .with_variant(config.compose)
            .with_service(config.rcon_service.clone())
            .with_rcon_binary(config.rcon_binary.clone())
            .with_log_filter(LogFilter::new(config.log_filters.as_slice())?)
            .with_stats_settle(config.stats_settle))
    }

    pub fn with_variant(mut self, variant: ComposeVariant) -> Self {
        self.variant = variant;
        self.command = OnceCell::new();
        self
    }

    /// Compose service that commands are executed in.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_rcon_binary(mut self, binary: impl Into<String>) -> Self {
        self.rcon_binary = binary.into();
        self
    }

    pub fn with_log_filter(mut self, filter: LogFilter) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn with_stats_settle(mut self, settle: Duration) -> Self {
        self.stats_settle = settle;
        self
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    async fn command(&self) -> Result<ComposeCommand> {
        self.command
            .get_or_try_init(|| ComposeCommand::resolve(self.variant, &self.client))
            .await
            .copied()
    }

    /// Run `compose <args>` in `dir`, failing on a non-zero exit.
    async fn compose(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        let command = self.command().await?;
        let (program, prefix) = command.program_and_prefix(self.client.binary());
        let full: Vec<&str> = prefix.iter().copied().chain(args.iter().copied()).collect();
        Ok(self.client.run_program_success(program, &full, Some(dir)).await?)
    }
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl ContainerRuntime for ComposeRuntime {
    async fn up(&self, dir: &Path) -> Result<()> {
        self.compose(dir, &["up", "-d"]).await?;
        Ok(())
    }

    async fn stop(&self, dir: &Path) -> Result<()> {
        self.compose(dir, &["stop"]).await?;
        Ok(())
    }

    async fn exec(&self, dir: &Path, command: &str) -> Result<Vec<String>> {
        let output = self
            .compose(dir, &["exec", "-T", self.service.as_str(), self.rcon_binary.as_str(), command])
            .await?;
        Ok(stdout_lines(&output))
    }

    async fn logs(&self, dir: &Path, tail: LogTail) -> Result<Vec<String>> {
        let limit = tail.effective();
        let limit_arg = limit.to_string();
        let output = self
            .compose(dir, &["logs", "--no-color", "--tail", &limit_arg])
            .await?;
        let raw = String::from_utf8_lossy(&output.stdout);
        let lines = self.log_filter.apply(&raw, limit);
        debug!(requested = %tail, returned = lines.len(), "Fetched container logs");
        Ok(lines)
    }

    async fn ps(&self, dir: &Path) -> Result<ContainerSnapshot> {
        let output = self
            .compose(dir, &["ps", "--all", "--format", "json"])
            .await?;
        parse_ps(&String::from_utf8_lossy(&output.stdout))
    }

    async fn stats(&self, container_id: &str) -> Result<UsageSample> {
        let stdout = self.client.stats(container_id, self.stats_settle).await?;
        parse_stats(&stdout)
    }

    async fn players(&self, dir: &Path) -> Result<PlayerCount> {
        let output = self
            .compose(dir, &["exec", "-T", self.service.as_str(), "mc-monitor", "status"])
            .await?;
        parse_players(&String::from_utf8_lossy(&output.stdout))
    }
}

