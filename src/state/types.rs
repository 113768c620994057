use crate::archive::ArchiveArtifact;
use crate::workspace::ServerId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted lifecycle state. `Paused` is never stored; it is overlaid on
/// container snapshots from the pause marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Running,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Running => f.write_str("running"),
            LifecycleState::Stopped => f.write_str("stopped"),
        }
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(LifecycleState::Running),
            "stopped" => Ok(LifecycleState::Stopped),
            other => Err(format!("unknown lifecycle state '{}'", other)),
        }
    }
}

/// Reference to the archive stored with a record. The bytes themselves stay
/// in the store and are loaded on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub name: String,
    pub size: u64,
}

/// Opaque DNS record ids created alongside the server by the provisioning
/// workflow; the remove path hands them to the DNS cleanup collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecords {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv_record_id: Option<String>,
}

/// Persisted state for a single server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: ServerId,

    /// Host port, unique across all records
    pub port: u16,

    pub state: LifecycleState,

    /// Present iff Running
    pub start_date: Option<DateTime<Utc>>,

    /// Present iff Stopped after at least one stop
    pub shutdown_date: Option<DateTime<Utc>>,

    /// When the server becomes eligible for automatic deletion
    pub deletion_date: Option<DateTime<Utc>>,

    /// Set at creation; decides whether a stop schedules deletion
    pub can_be_deleted: bool,

    /// Backup taken by the last successful stop
    pub archive: Option<ArchiveRef>,

    #[serde(default)]
    pub dns: DnsRecords,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a record. The port is chosen by the store.
#[derive(Debug, Clone)]
pub struct NewServer {
    pub id: ServerId,
    pub can_be_deleted: bool,
    pub dns: DnsRecords,
}

impl NewServer {
    pub fn new(id: ServerId) -> Self {
        Self {
            id,
            can_be_deleted: true,
            dns: DnsRecords::default(),
        }
    }

    pub fn can_be_deleted(mut self, can_be_deleted: bool) -> Self {
        self.can_be_deleted = can_be_deleted;
        self
    }

    pub fn with_dns(mut self, dns: DnsRecords) -> Self {
        self.dns = dns;
        self
    }
}

/// Full set of lifecycle fields written by a start or stop.
///
/// Every field is written, including `None`s, so applying an update fully
/// determines the record's lifecycle columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleUpdate {
    pub state: LifecycleState,
    pub start_date: Option<DateTime<Utc>>,
    pub shutdown_date: Option<DateTime<Utc>>,
    pub deletion_date: Option<DateTime<Utc>>,
    pub archive: Option<ArchiveArtifact>,
}

impl LifecycleUpdate {
    /// Running since `now`. A fresh run invalidates the previous backup.
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            state: LifecycleState::Running,
            start_date: Some(now),
            shutdown_date: None,
            deletion_date: None,
            archive: None,
        }
    }

    /// Stopped at `now` with `artifact` as the new backup. Deletion is
    /// scheduled `ttl` after `now` only for deletable servers.
    pub fn stopped(
        now: DateTime<Utc>,
        can_be_deleted: bool,
        ttl: Duration,
        artifact: ArchiveArtifact,
    ) -> Self {
        Self {
            state: LifecycleState::Stopped,
            start_date: None,
            shutdown_date: Some(now),
            deletion_date: can_be_deleted.then(|| now + ttl),
            archive: Some(artifact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ArchiveArtifact {
        ArchiveArtifact {
            name: "alpha.zip".into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn started_clears_stop_fields() {
        let now = Utc::now();
        let update = LifecycleUpdate::started(now);
        assert_eq!(update.state, LifecycleState::Running);
        assert_eq!(update.start_date, Some(now));
        assert!(update.shutdown_date.is_none());
        assert!(update.deletion_date.is_none());
        assert!(update.archive.is_none());
    }

    #[test]
    fn stopped_schedules_deletion_only_when_deletable() {
        let now = Utc::now();
        let ttl = Duration::hours(168);

        let deletable = LifecycleUpdate::stopped(now, true, ttl, artifact());
        assert_eq!(deletable.state, LifecycleState::Stopped);
        assert!(deletable.start_date.is_none());
        assert_eq!(deletable.shutdown_date, Some(now));
        assert_eq!(deletable.deletion_date, Some(now + ttl));
        assert_eq!(deletable.archive, Some(artifact()));

        let kept = LifecycleUpdate::stopped(now, false, ttl, artifact());
        assert!(kept.deletion_date.is_none());
        assert!(kept.archive.is_some());
    }

    #[test]
    fn lifecycle_state_round_trips_through_text() {
        for state in [LifecycleState::Running, LifecycleState::Stopped] {
            assert_eq!(state.to_string().parse::<LifecycleState>(), Ok(state));
        }
        assert!("paused".parse::<LifecycleState>().is_err());
    }
}
