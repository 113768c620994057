//! Persistent server records.
//!
//! Records live in a SQLite database with WAL mode enabled. Only the State
//! Synchronizer ([`StateSynchronizer`]) writes lifecycle fields; creation
//! reserves a port and inserts the record in one transaction.
//!
//! # Example
//!
//! ```ignore
//! use hermes_fleet::state::{NewServer, ServerStore, SqliteServerStore};
//!
//! let store = SqliteServerStore::new(".hermes/fleet.db".into()).await?;
//! store.initialize().await?;
//! let record = store.create(NewServer::new(id), PortRange::DEFAULT).await?;
//! ```

mod sqlite;
mod sync;
mod types;

pub use sqlite::SqliteServerStore;
pub use sync::{DEFAULT_DELETION_TTL_HOURS, StateSynchronizer};
pub use types::{
    ArchiveRef, DnsRecords, LifecycleState, LifecycleUpdate, NewServer, ServerRecord,
};

use crate::archive::ArchiveArtifact;
use crate::error::Result;
use crate::port::PortRange;
use crate::workspace::ServerId;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Read/update/delete API over server records, keyed by server id.
#[async_trait]
pub trait ServerStore: Send + Sync {
    /// Fetch a record; [`Error::RecordNotFound`](crate::Error::RecordNotFound) if absent.
    async fn get(&self, id: &ServerId) -> Result<ServerRecord>;

    async fn list(&self) -> Result<Vec<ServerRecord>>;

    async fn used_ports(&self) -> Result<BTreeSet<u16>>;

    /// Allocate the lowest free port in `range` and insert a Stopped record
    /// holding it, atomically.
    async fn create(&self, new: NewServer, range: PortRange) -> Result<ServerRecord>;

    /// Write every lifecycle field of `update`.
    async fn apply(&self, id: &ServerId, update: LifecycleUpdate) -> Result<()>;

    async fn delete(&self, id: &ServerId) -> Result<()>;

    /// Load the stored backup bytes, if any.
    async fn archive(&self, id: &ServerId) -> Result<Option<ArchiveArtifact>>;
}
