use super::types::{ArchiveRef, DnsRecords, LifecycleState, LifecycleUpdate, NewServer, ServerRecord};
use super::ServerStore;
use crate::archive::ArchiveArtifact;
use crate::error::{Error, Result};
use crate::port::{allocate, PortRange};
use crate::workspace::ServerId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use rusqlite::types::Type;
use rusqlite::OptionalExtension;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

const SCHEMA_VERSION: i32 = 1;

const RECORD_COLUMNS: &str = "id, port, state, start_date, shutdown_date, deletion_date, \
     can_be_deleted, archive_name, length(archive_blob), cname_record_id, srv_record_id, created_at";

/// SQLite-backed server record store.
///
/// Provides ACID transactions and crash recovery via WAL mode. Holds an
/// advisory file lock (`<db>.lock`) for its lifetime so two `hermes`
/// processes don't drive the same fleet unnoticed.
pub struct SqliteServerStore {
    db_path: PathBuf,
    conn: Connection,
    /// Advisory lock file handle - held to prevent concurrent modifications.
    /// `None` when another process holds the lock or the store is ephemeral.
    #[allow(dead_code)]
    lock_file: Option<std::fs::File>,
}

impl SqliteServerStore {
    /// Open (or create) the database at `db_path`.
    ///
    /// Call [`initialize`](Self::initialize) before use.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let lock_path = lock_path_for(&db_path);
        let lock_file = Self::try_acquire_lock(&lock_path)?;

        let conn = Connection::open(&db_path).await?;

        // Configure WAL mode for crash recovery
        conn.call(|conn: &mut rusqlite::Connection| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            db_path,
            conn,
            lock_file,
        })
    }

    /// Create an ephemeral in-memory store with no file lock.
    pub async fn new_ephemeral() -> Result<Self> {
        let conn = Connection::open(":memory:").await?;

        conn.call(|conn: &mut rusqlite::Connection| {
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            conn,
            lock_file: None,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Try to acquire an advisory file lock.
    ///
    /// Returns the lock file handle if successful, or None if another process
    /// holds the lock (with a warning logged). The lock is automatically
    /// released when the file handle is dropped.
    fn try_acquire_lock(lock_path: &Path) -> Result<Option<std::fs::File>> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                // Write our PID to the lock file for debugging
                let _ = file.set_len(0);
                let _ = writeln!(file, "{}", std::process::id());
                debug!("Acquired advisory lock on {:?}", lock_path);
                Ok(Some(file))
            }
            Err(e) => {
                let owner = std::fs::read_to_string(lock_path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                if owner == std::process::id().to_string() {
                    debug!("Lock held by this process already");
                } else {
                    warn!(
                        "Another hermes instance (PID {}) holds {:?} ({}). \
                         Proceeding anyway, but concurrent lifecycle changes are possible.",
                        if owner.is_empty() { "unknown" } else { owner.as_str() },
                        lock_path,
                        e
                    );
                }
                Ok(None)
            }
        }
    }

    /// Execute a function within a transaction and commit it.
    #[tracing::instrument(skip(self, f), fields(operation = "db_transaction"))]
    async fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn: &mut rusqlite::Connection| {
                let tx = conn.transaction()?;
                let result = f(&tx)?;
                tx.commit()?;
                Ok(result)
            })
            .await
            .map_err(Error::from)
    }

    /// Initialize the store - create schema or validate the existing one
    pub async fn initialize(&self) -> Result<()> {
        let schema_exists: bool = self
            .conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<bool> {
                    Ok(conn.query_row(
                        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
                        [],
                        |row| row.get(0),
                    )?)
                },
            )
            .await?;

        if !schema_exists {
            debug!("Creating SQLite schema");
            return self.create_schema().await;
        }

        let version: i32 = self
            .conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<i32> {
                    Ok(conn.query_row(
                        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                        [],
                        |row| row.get(0),
                    )?)
                },
            )
            .await?;

        if version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Database {:?} uses schema version {} but this build understands up to {}",
                self.db_path, version, SCHEMA_VERSION
            )));
        }
        debug!("Loaded existing SQLite state (schema v{})", version);
        Ok(())
    }

    /// Create database schema
    async fn create_schema(&self) -> Result<()> {
        self.conn
            .call(|conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<()> {
                conn.execute_batch(
                    r#"
                    -- Schema version tracking
                    CREATE TABLE schema_version (
                        version INTEGER PRIMARY KEY,
                        applied_at TEXT NOT NULL
                    );

                    CREATE TABLE servers (
                        id TEXT PRIMARY KEY,
                        port INTEGER NOT NULL UNIQUE,
                        state TEXT NOT NULL CHECK (state IN ('running', 'stopped')),
                        start_date TEXT,
                        shutdown_date TEXT,
                        deletion_date TEXT,
                        can_be_deleted INTEGER NOT NULL DEFAULT 1,
                        archive_name TEXT,
                        archive_blob BLOB,
                        cname_record_id TEXT,
                        srv_record_id TEXT,
                        created_at TEXT NOT NULL
                    );

                    CREATE INDEX idx_servers_deletion_date ON servers(deletion_date)
                        WHERE deletion_date IS NOT NULL;
                    "#,
                )?;

                // Insert schema version separately (can't use placeholders in execute_batch)
                conn.execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                    rusqlite::params![SCHEMA_VERSION],
                )?;

                Ok(())
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ServerStore for SqliteServerStore {
    async fn get(&self, id: &ServerId) -> Result<ServerRecord> {
        let key = id.to_string();
        let record = self
            .conn
            .call(
                move |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<Option<ServerRecord>> {
                    let sql = format!("SELECT {} FROM servers WHERE id = ?1", RECORD_COLUMNS);
                    Ok(conn
                        .query_row(&sql, rusqlite::params![&key], row_to_record)
                        .optional()?)
                },
            )
            .await?;

        record.ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<ServerRecord>> {
        let records = self
            .conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<Vec<ServerRecord>> {
                    let sql = format!("SELECT {} FROM servers ORDER BY id", RECORD_COLUMNS);
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map([], row_to_record)?;
                    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
                },
            )
            .await?;
        Ok(records)
    }

    async fn used_ports(&self) -> Result<BTreeSet<u16>> {
        let ports = self
            .conn
            .call(
                |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<BTreeSet<u16>> {
                    Ok(select_ports(conn)?)
                },
            )
            .await?;
        Ok(ports)
    }

    #[tracing::instrument(skip(self, new), fields(server = %new.id))]
    async fn create(&self, new: NewServer, range: PortRange) -> Result<ServerRecord> {
        let now = Utc::now();
        let record = self
            .with_transaction(move |tx| -> rusqlite::Result<Result<ServerRecord>> {
                let exists: bool = tx.query_row(
                    "SELECT COUNT(*) > 0 FROM servers WHERE id = ?1",
                    rusqlite::params![new.id.as_str()],
                    |row| row.get(0),
                )?;
                if exists {
                    return Ok(Err(Error::ServerExists(new.id.to_string())));
                }

                let port = match allocate(&select_ports(tx)?, range) {
                    Ok(port) => port,
                    Err(e) => return Ok(Err(e)),
                };

                tx.execute(
                    "INSERT INTO servers (id, port, state, can_be_deleted, cname_record_id, srv_record_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        new.id.as_str(),
                        port,
                        LifecycleState::Stopped.to_string(),
                        new.can_be_deleted,
                        new.dns.cname_record_id,
                        new.dns.srv_record_id,
                        now.to_rfc3339(),
                    ],
                )?;

                Ok(Ok(ServerRecord {
                    id: new.id,
                    port,
                    state: LifecycleState::Stopped,
                    start_date: None,
                    shutdown_date: None,
                    deletion_date: None,
                    can_be_deleted: new.can_be_deleted,
                    archive: None,
                    dns: new.dns,
                    created_at: now,
                }))
            })
            .await??;

        info!("Created record for '{}' on port {}", record.id, record.port);
        Ok(record)
    }

    async fn apply(&self, id: &ServerId, update: LifecycleUpdate) -> Result<()> {
        let key = id.to_string();
        let (archive_name, archive_blob) = match update.archive {
            Some(artifact) => (Some(artifact.name), Some(artifact.bytes)),
            None => (None, None),
        };

        let rows = self
            .with_transaction(move |tx| {
                tx.execute(
                    "UPDATE servers
                     SET state = ?1, start_date = ?2, shutdown_date = ?3, deletion_date = ?4,
                         archive_name = ?5, archive_blob = ?6
                     WHERE id = ?7",
                    rusqlite::params![
                        update.state.to_string(),
                        update.start_date.map(|d| d.to_rfc3339()),
                        update.shutdown_date.map(|d| d.to_rfc3339()),
                        update.deletion_date.map(|d| d.to_rfc3339()),
                        archive_name,
                        archive_blob,
                        &key,
                    ],
                )
            })
            .await?;

        if rows == 0 {
            return Err(Error::RecordNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &ServerId) -> Result<()> {
        let key = id.to_string();
        let rows = self
            .with_transaction(move |tx| {
                tx.execute("DELETE FROM servers WHERE id = ?1", rusqlite::params![&key])
            })
            .await?;

        if rows == 0 {
            return Err(Error::RecordNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn archive(&self, id: &ServerId) -> Result<Option<ArchiveArtifact>> {
        let key = id.to_string();
        let row = self
            .conn
            .call(
                move |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<Option<(Option<String>, Option<Vec<u8>>)>> {
                    Ok(conn
                        .query_row(
                            "SELECT archive_name, archive_blob FROM servers WHERE id = ?1",
                            rusqlite::params![&key],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?)
                },
            )
            .await?;

        match row {
            None => Err(Error::RecordNotFound(id.to_string())),
            Some((Some(name), Some(bytes))) => Ok(Some(ArchiveArtifact { name, bytes })),
            Some(_) => Ok(None),
        }
    }
}

fn lock_path_for(db_path: &Path) -> PathBuf {
    let mut name = db_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    db_path.with_file_name(name)
}

fn select_ports(conn: &rusqlite::Connection) -> rusqlite::Result<BTreeSet<u16>> {
    let mut stmt = conn.prepare("SELECT port FROM servers")?;
    let ports = stmt.query_map([], |row| row.get::<_, u16>(0))?;
    ports.collect()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_date(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            s.parse::<DateTime<Utc>>()
                .map_err(|e| conversion_error(idx, format!("invalid timestamp '{}': {}", s, e)))
        })
        .transpose()
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ServerRecord> {
    let id: String = row.get(0)?;
    let id = ServerId::new(id).map_err(|e| conversion_error(0, e.to_string()))?;
    let state: String = row.get(2)?;
    let state = state
        .parse::<LifecycleState>()
        .map_err(|e| conversion_error(2, e))?;

    let archive_name: Option<String> = row.get(7)?;
    let archive_size: Option<i64> = row.get(8)?;
    let archive = archive_name.map(|name| ArchiveRef {
        name,
        size: archive_size.unwrap_or(0).max(0) as u64,
    });

    let created_at: String = row.get(11)?;
    let created_at = parse_date(11, Some(created_at))?.unwrap_or_else(Utc::now);

    Ok(ServerRecord {
        id,
        port: row.get(1)?,
        state,
        start_date: parse_date(3, row.get(3)?)?,
        shutdown_date: parse_date(4, row.get(4)?)?,
        deletion_date: parse_date(5, row.get(5)?)?,
        can_be_deleted: row.get(6)?,
        archive,
        dns: DnsRecords {
            cname_record_id: row.get(9)?,
            srv_record_id: row.get(10)?,
        },
        created_at,
    })
}
