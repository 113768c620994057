use super::locks::ServerLocks;
use crate::archive::{ArchiveArtifact, Archiver};
use crate::compose::{
    ComposeDefinition, ContainerRuntime, ContainerSnapshot, LogTail, PlayerCount, UsageSample,
};
use crate::dns::DnsCleanup;
use crate::docker::DockerError;
use crate::error::{Error, Result};
use crate::port::PortRange;
use crate::state::{DnsRecords, NewServer, ServerRecord, ServerStore, StateSynchronizer};
use crate::workspace::{ServerDirs, ServerId};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Options for [`Orchestrator::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Exempt the server from scheduled deletion after it stops.
    pub keep: bool,
    /// Bring the server up once its files are in place.
    pub start: bool,
    pub dns: DnsRecords,
}

/// Sequences the filesystem, container runtime, archive and state components
/// into the public lifecycle operations.
///
/// # Concurrency
///
/// - start, stop, remove and create hold a per-server lock for their whole
///   sequence, so two mutations of one server never interleave
/// - queries (status, logs, usage, players, command) take no lock
/// - a `CancellationToken` aborts in-flight runtime calls; see
///   [`cancel_operations`](Self::cancel_operations)
pub struct Orchestrator {
    pub(super) dirs: ServerDirs,
    pub(super) runtime: Arc<dyn ContainerRuntime>,
    pub(super) archiver: Archiver,
    pub(super) store: Arc<dyn ServerStore>,
    pub(super) sync: StateSynchronizer,
    pub(super) dns: Arc<dyn DnsCleanup>,
    pub(super) locks: ServerLocks,
    pub(super) cancellation_token: CancellationToken,
    pub(super) port_range: PortRange,
    pub(super) service_name: String,
    pub(super) server_environment: BTreeMap<String, String>,
}

impl Orchestrator {
    pub fn builder() -> super::OrchestratorBuilder {
        super::OrchestratorBuilder::new()
    }

    pub fn dirs(&self) -> &ServerDirs {
        &self.dirs
    }

    pub fn port_range(&self) -> PortRange {
        self.port_range
    }

    /// Cancel all in-flight operations.
    ///
    /// Runtime calls in progress return a cancelled error and their child
    /// processes are killed. Sequences stop at the step that was running, with
    /// no rollback of earlier steps. A stop whose container is already down
    /// finishes its archive and record update.
    pub fn cancel_operations(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Get a child cancellation token for use in spawned tasks.
    pub fn child_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }

    /// Run a runtime call, racing it against the cancellation token.
    async fn guarded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => Err(DockerError::cancelled(op).into()),
            result = fut => result,
        }
    }

    /// Take the server's lock, checking existence before and after the wait.
    /// A remove holding the lock may delete the directory in between.
    async fn lock_existing(&self, id: &ServerId) -> Result<(OwnedMutexGuard<()>, PathBuf)> {
        self.dirs.ensure_exists(id)?;
        let guard = self.locks.acquire(id).await;
        let dir = self.dirs.ensure_exists(id)?;
        Ok((guard, dir))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Bring a server up and mark it Running.
    ///
    /// A failed `up` leaves the record untouched.
    #[tracing::instrument(skip(self, id), fields(server = %id))]
    pub async fn start(&self, id: &ServerId) -> Result<()> {
        let (_guard, dir) = self.lock_existing(id).await?;
        self.start_locked(id, dir).await
    }

    async fn start_locked(&self, id: &ServerId, dir: PathBuf) -> Result<()> {
        self.guarded("compose up", self.runtime.up(&dir)).await?;
        self.sync.on_start(id).await?;
        info!(server = %id, "Server started");
        Ok(())
    }

    /// Stop a server, archive its files and mark it Stopped.
    ///
    /// Steps run in order and the first failure aborts the rest. The record
    /// only changes once the container is down and the archive is in hand.
    #[tracing::instrument(skip(self, id), fields(server = %id))]
    pub async fn stop(&self, id: &ServerId) -> Result<()> {
        let (_guard, dir) = self.lock_existing(id).await?;
        self.stop_locked(id, dir).await
    }

    async fn stop_locked(&self, id: &ServerId, dir: PathBuf) -> Result<()> {
        self.guarded("compose stop", self.runtime.stop(&dir)).await?;
        // Not cancellable: the zip runs on a blocking thread that outlives a
        // dropped future.
        let artifact = self.archiver.archive(id).await?;
        let record = self.store.get(id).await?;
        self.sync
            .on_stop(id, record.can_be_deleted, artifact)
            .await?;
        info!(server = %id, "Server stopped");
        Ok(())
    }

    /// Tear a server down completely.
    ///
    /// The stop and the directory removal are best effort: failures are logged
    /// and the sequence continues. A DNS cleanup failure aborts before the
    /// record is deleted. Cancellation always aborts.
    #[tracing::instrument(skip(self, id), fields(server = %id))]
    pub async fn remove(&self, id: &ServerId, force: bool) -> Result<()> {
        let (_guard, dir) = self.lock_existing(id).await?;

        if let Err(e) = self.stop_locked(id, dir).await {
            if e.is_cancelled() {
                return Err(e);
            }
            warn!(server = %id, error = %e, "Stop failed during remove, continuing");
        }

        if let Err(e) = self.dirs.remove_all(id, force) {
            warn!(server = %id, error = %e, "Failed to remove server files, continuing");
        }

        let record = self.store.get(id).await?;
        self.dns.remove_records(id, &record.dns).await?;
        self.sync.on_remove(id).await?;
        info!(server = %id, "Server removed");
        Ok(())
    }

    /// Provision a new server: reserve a port and insert its record
    /// atomically, then lay out its directory and compose file.
    ///
    /// If the files can't be written the directory and record are rolled
    /// back so the port is released.
    #[tracing::instrument(skip(self, id, options), fields(server = %id))]
    pub async fn create(&self, id: &ServerId, options: CreateOptions) -> Result<ServerRecord> {
        let _guard = self.locks.acquire(id).await;
        if self.dirs.exists(id) {
            return Err(Error::ServerExists(id.to_string()));
        }

        let new = NewServer::new(id.clone())
            .can_be_deleted(!options.keep)
            .with_dns(options.dns);
        let record = self.store.create(new, self.port_range).await?;

        if let Err(e) = self.write_server_files(id, record.port) {
            warn!(server = %id, error = %e, "Failed to lay out server files, rolling back");
            if let Err(cleanup) = self.dirs.remove_all(id, true) {
                warn!(server = %id, error = %cleanup, "Failed to remove partial server directory");
            }
            self.store.delete(id).await?;
            return Err(e);
        }
        info!(server = %id, port = record.port, "Server created");

        if options.start {
            let dir = self.dirs.ensure_exists(id)?;
            self.start_locked(id, dir).await?;
            return self.store.get(id).await;
        }
        Ok(record)
    }

    fn write_server_files(&self, id: &ServerId, port: u16) -> Result<()> {
        std::fs::create_dir_all(self.dirs.server_files_dir(id))?;
        ComposeDefinition::game_server(&self.service_name, port)
            .with_env(self.server_environment.clone())?
            .write_to(&self.dirs.compose_file(id))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Send a console command. The text is forwarded verbatim.
    #[tracing::instrument(skip(self, id, command), fields(server = %id))]
    pub async fn command(&self, id: &ServerId, command: &str) -> Result<Vec<String>> {
        let dir = self.dirs.ensure_exists(id)?;
        self.guarded("compose exec", self.runtime.exec(&dir, command))
            .await
    }

    pub async fn logs(&self, id: &ServerId, tail: LogTail) -> Result<Vec<String>> {
        let dir = self.dirs.ensure_exists(id)?;
        self.guarded("compose logs", self.runtime.logs(&dir, tail))
            .await
    }

    /// Container snapshot with the pause marker overlaid.
    pub async fn status(&self, id: &ServerId) -> Result<ContainerSnapshot> {
        let dir = self.dirs.ensure_exists(id)?;
        let snapshot = self.guarded("compose ps", self.runtime.ps(&dir)).await?;
        Ok(snapshot.with_pause_overlay(self.dirs.has_pause_marker(id)))
    }

    pub async fn is_running(&self, id: &ServerId) -> Result<bool> {
        Ok(self.status(id).await?.is_running())
    }

    /// One-shot resource sample, addressed by the container id `ps` reports.
    pub async fn usage(&self, id: &ServerId) -> Result<UsageSample> {
        let dir = self.dirs.ensure_exists(id)?;
        let snapshot = self.guarded("compose ps", self.runtime.ps(&dir)).await?;
        self.guarded("docker stats", self.runtime.stats(&snapshot.id))
            .await
    }

    pub async fn players(&self, id: &ServerId) -> Result<PlayerCount> {
        let dir = self.dirs.ensure_exists(id)?;
        self.guarded("mc-monitor status", self.runtime.players(&dir))
            .await
    }

    pub async fn record(&self, id: &ServerId) -> Result<ServerRecord> {
        self.store.get(id).await
    }

    pub async fn records(&self) -> Result<Vec<ServerRecord>> {
        self.store.list().await
    }

    pub async fn used_ports(&self) -> Result<BTreeSet<u16>> {
        self.store.used_ports().await
    }

    /// The backup stored by the last successful stop.
    pub async fn backup(&self, id: &ServerId) -> Result<ArchiveArtifact> {
        self.store.archive(id).await?.ok_or_else(|| {
            Error::archive(
                id.as_str(),
                "no backup stored; one is taken every time the server stops",
            )
        })
    }
}
