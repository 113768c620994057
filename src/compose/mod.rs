//! Container CLI invoker.
//!
//! [`ContainerRuntime`] is the seam between the orchestrator and the
//! container engine. [`ComposeRuntime`] implements it by driving the
//! `docker compose` CLI inside a server's working directory; tests swap in
//! recording fakes.

pub mod command;
pub mod definition;
pub mod logs;
pub mod runtime;
pub mod snapshot;

pub use command::{ComposeCommand, ComposeVariant};
pub use definition::{ComposeDefinition, ComposeService, Healthcheck};
pub use logs::{LogFilter, LogTail, MAX_LOG_TAIL};
pub use runtime::ComposeRuntime;
pub use snapshot::{ContainerSnapshot, ContainerState, PlayerCount, UsageSample};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Operations on the single-service compose project in a server directory.
///
/// `dir` is always the server's working directory. Implementations never
/// check that it exists; the orchestrator does that first.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// `compose up -d`
    async fn up(&self, dir: &Path) -> Result<()>;

    /// `compose stop`
    async fn stop(&self, dir: &Path) -> Result<()>;

    /// Send a console command over RCON; returns trimmed, non-empty output lines.
    async fn exec(&self, dir: &Path, command: &str) -> Result<Vec<String>>;

    /// Last lines of the container log, boilerplate removed.
    async fn logs(&self, dir: &Path, tail: LogTail) -> Result<Vec<String>>;

    /// First container reported by `compose ps`.
    async fn ps(&self, dir: &Path) -> Result<ContainerSnapshot>;

    async fn stats(&self, container_id: &str) -> Result<UsageSample>;

    async fn players(&self, dir: &Path) -> Result<PlayerCount>;
}
