//! On-disk layout of the fleet.
//!
//! ```text
//! <servers_dir>/
//!   <id>/
//!     docker-compose.yml
//!     server-files/          persistent game data, mounted at /data
//!       .paused              pause marker written by the game server
//! <backups_dir>/
//!   <id>.zip
//! ```
//!
//! A server exists for orchestration purposes iff its working directory
//! exists. Every lifecycle operation checks that first.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";
pub const SERVER_FILES_DIR: &str = "server-files";
pub const PAUSE_MARKER: &str = ".paused";
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Directory names that live beside server directories and can never be ids.
const RESERVED_IDS: &[&str] = &["backups"];

/// Validated server identifier, safe to join onto a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerId(String);

impl ServerId {
    /// Validate an identifier.
    ///
    /// Rejects empty names, path separators, leading dots and anything other
    /// than ASCII alphanumerics, `-` and `_`. Unlike a sanitizer this never
    /// rewrites the input, so two distinct ids can't collide on disk.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let invalid = |reason: &str| Error::InvalidServerId {
            id: id.clone(),
            reason: reason.to_string(),
        };

        if id.is_empty() {
            return Err(invalid("cannot be empty"));
        }
        if id.len() > 64 {
            return Err(invalid("longer than 64 characters"));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(invalid("contains path separators"));
        }
        if id.starts_with('.') {
            return Err(invalid("cannot start with a dot"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("only letters, digits, '-' and '_' are allowed"));
        }
        if RESERVED_IDS.contains(&id.as_str()) {
            return Err(invalid("name is reserved"));
        }

        Ok(ServerId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ServerId::new(s)
    }
}

impl TryFrom<String> for ServerId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ServerId::new(value)
    }
}

impl From<ServerId> for String {
    fn from(id: ServerId) -> Self {
        id.0
    }
}

impl AsRef<str> for ServerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Filesystem gateway over the servers and backups directories.
#[derive(Debug, Clone)]
pub struct ServerDirs {
    servers_dir: PathBuf,
    backups_dir: PathBuf,
}

impl ServerDirs {
    pub fn new(servers_dir: impl Into<PathBuf>, backups_dir: impl Into<PathBuf>) -> Self {
        Self {
            servers_dir: servers_dir.into(),
            backups_dir: backups_dir.into(),
        }
    }

    pub fn servers_dir(&self) -> &Path {
        &self.servers_dir
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Working directory of a server (the compose project directory).
    pub fn server_dir(&self, id: &ServerId) -> PathBuf {
        self.servers_dir.join(id.as_str())
    }

    pub fn server_files_dir(&self, id: &ServerId) -> PathBuf {
        self.server_dir(id).join(SERVER_FILES_DIR)
    }

    pub fn compose_file(&self, id: &ServerId) -> PathBuf {
        self.server_dir(id).join(COMPOSE_FILE_NAME)
    }

    pub fn pause_marker(&self, id: &ServerId) -> PathBuf {
        self.server_files_dir(id).join(PAUSE_MARKER)
    }

    /// Deterministic archive path for a server, overwritten on every stop.
    pub fn backup_path(&self, id: &ServerId) -> PathBuf {
        self.backups_dir.join(archive_name(id))
    }

    pub fn exists(&self, id: &ServerId) -> bool {
        self.server_dir(id).is_dir()
    }

    /// Fail with [`Error::ServerNotFound`] unless the working directory exists.
    pub fn ensure_exists(&self, id: &ServerId) -> Result<PathBuf> {
        let dir = self.server_dir(id);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::ServerNotFound(id.to_string()))
        }
    }

    pub fn has_pause_marker(&self, id: &ServerId) -> bool {
        self.pause_marker(id).exists()
    }

    /// Recursively delete a server's working directory.
    ///
    /// With `force`, a directory that is already gone is not an error.
    pub fn remove_all(&self, id: &ServerId, force: bool) -> Result<()> {
        let dir = self.server_dir(id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(server = %id, "Removed {}", dir.display());
                Ok(())
            }
            Err(e) if force && e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Ids of every server directory, sorted.
    ///
    /// Entries that are not directories or whose names are not valid ids
    /// (the backups directory among them) are skipped.
    pub fn list(&self) -> Result<Vec<ServerId>> {
        let entries = match std::fs::read_dir(&self.servers_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| ServerId::new(name).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// `<id>.zip`
pub fn archive_name(id: &ServerId) -> String {
    format!("{}.{}", id, ARCHIVE_EXTENSION)
}
