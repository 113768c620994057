use super::{LifecycleUpdate, ServerStore};
use crate::archive::ArchiveArtifact;
use crate::error::Result;
use crate::workspace::ServerId;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// Hours a deletable server is kept after it stops.
pub const DEFAULT_DELETION_TTL_HOURS: u32 = 168;

/// The only writer of lifecycle fields on server records.
#[derive(Clone)]
pub struct StateSynchronizer {
    store: Arc<dyn ServerStore>,
    deletion_ttl: Duration,
}

impl StateSynchronizer {
    pub fn new(store: Arc<dyn ServerStore>, deletion_ttl_hours: u32) -> Self {
        Self {
            store,
            deletion_ttl: Duration::hours(i64::from(deletion_ttl_hours)),
        }
    }

    pub fn deletion_ttl(&self) -> Duration {
        self.deletion_ttl
    }

    pub async fn on_start(&self, id: &ServerId) -> Result<()> {
        self.store
            .apply(id, LifecycleUpdate::started(Utc::now()))
            .await?;
        info!(server = %id, "Marked running");
        Ok(())
    }

    pub async fn on_stop(
        &self,
        id: &ServerId,
        can_be_deleted: bool,
        artifact: ArchiveArtifact,
    ) -> Result<()> {
        let update =
            LifecycleUpdate::stopped(Utc::now(), can_be_deleted, self.deletion_ttl, artifact);
        let deletion_date = update.deletion_date;
        self.store.apply(id, update).await?;
        info!(server = %id, ?deletion_date, "Marked stopped");
        Ok(())
    }

    pub async fn on_remove(&self, id: &ServerId) -> Result<()> {
        self.store.delete(id).await?;
        info!(server = %id, "Deleted record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortRange;
    use crate::state::{LifecycleState, NewServer, SqliteServerStore};

    async fn setup(can_be_deleted: bool) -> (Arc<SqliteServerStore>, StateSynchronizer, ServerId) {
        let store = Arc::new(SqliteServerStore::new_ephemeral().await.unwrap());
        store.initialize().await.unwrap();
        let id = ServerId::new("alpha").unwrap();
        store
            .create(
                NewServer::new(id.clone()).can_be_deleted(can_be_deleted),
                PortRange::DEFAULT,
            )
            .await
            .unwrap();
        let sync = StateSynchronizer::new(store.clone(), 24);
        (store, sync, id)
    }

    fn artifact() -> ArchiveArtifact {
        ArchiveArtifact {
            name: "alpha.zip".into(),
            bytes: b"PK".to_vec(),
        }
    }

    #[tokio::test]
    async fn stop_schedules_deletion_after_ttl() {
        let (store, sync, id) = setup(true).await;
        sync.on_stop(&id, true, artifact()).await.unwrap();

        let record = store.get(&id).await.unwrap();
        let shutdown = record.shutdown_date.unwrap();
        assert_eq!(record.deletion_date, Some(shutdown + Duration::hours(24)));
    }

    #[tokio::test]
    async fn stop_without_deletion_flag_clears_deletion_date() {
        let (store, sync, id) = setup(false).await;
        sync.on_stop(&id, false, artifact()).await.unwrap();

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.state, LifecycleState::Stopped);
        assert!(record.deletion_date.is_none());
        assert!(record.archive.is_some());
    }

    #[tokio::test]
    async fn remove_deletes_record() {
        let (store, sync, id) = setup(true).await;
        sync.on_start(&id).await.unwrap();
        sync.on_remove(&id).await.unwrap();
        assert!(store.get(&id).await.is_err());
    }
}
