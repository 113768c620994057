use super::locks::ServerLocks;
use super::Orchestrator;
use crate::archive::Archiver;
use crate::compose::{ComposeRuntime, ContainerRuntime};
use crate::config::FleetConfig;
use crate::dns::{DnsCleanup, NoopDnsCleanup};
use crate::error::Result;
use crate::state::{ServerStore, SqliteServerStore, StateSynchronizer};
use crate::workspace::ServerDirs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Builder for constructing an `Orchestrator` with a fluent API.
///
/// Anything not supplied is built from the config: a [`ComposeRuntime`]
/// sharing the orchestrator's cancellation token, a [`SqliteServerStore`] at
/// `config.database` (schema initialized), and [`NoopDnsCleanup`].
///
/// # Example
///
/// ```no_run
/// use hermes_fleet::{FleetConfig, Orchestrator};
///
/// # async fn example() -> Result<(), hermes_fleet::Error> {
/// let orchestrator = Orchestrator::builder()
///     .config(FleetConfig::default())
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<FleetConfig>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    store: Option<Arc<dyn ServerStore>>,
    dns: Option<Arc<dyn DnsCleanup>>,
    cancellation_token: Option<CancellationToken>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// If not set, [`FleetConfig::default`] is used.
    pub fn config(mut self, config: FleetConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Use an existing store. It must already be initialized.
    pub fn store(mut self, store: Arc<dyn ServerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn dns(mut self, dns: Arc<dyn DnsCleanup>) -> Self {
        self.dns = Some(dns);
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub async fn build(self) -> Result<Orchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let cancellation_token = self.cancellation_token.unwrap_or_default();

        let runtime: Arc<dyn ContainerRuntime> = match self.runtime {
            Some(runtime) => runtime,
            None => Arc::new(ComposeRuntime::from_config(
                &config,
                cancellation_token.clone(),
            )?),
        };

        let store: Arc<dyn ServerStore> = match self.store {
            Some(store) => store,
            None => {
                let store = SqliteServerStore::new(config.database.clone()).await?;
                store.initialize().await?;
                Arc::new(store)
            }
        };

        let dirs = ServerDirs::new(config.servers_dir.clone(), config.backups_dir.clone());
        let archiver = Archiver::with_excludes(dirs.clone(), config.archive_excludes.as_slice())?;
        let sync = StateSynchronizer::new(store.clone(), config.deletion_ttl_hours);

        debug!(
            servers_dir = %config.servers_dir.display(),
            ports = %config.ports,
            "Orchestrator ready"
        );

        Ok(Orchestrator {
            dirs,
            runtime,
            archiver,
            store,
            sync,
            dns: self
                .dns
                .unwrap_or_else(|| Arc::new(NoopDnsCleanup) as Arc<dyn DnsCleanup>),
            locks: ServerLocks::new(),
            cancellation_token,
            port_range: config.ports,
            service_name: config.rcon_service,
            server_environment: config.server_environment,
        })
    }
}
