// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(hermes::config::error),
        help("Check hermes.yaml and the HERMES_* environment variables")
    )]
    Config(String),

    #[error("Invalid server id '{id}': {reason}")]
    #[diagnostic(
        code(hermes::server::invalid_id),
        help("Server ids may only contain letters, digits, '-' and '_'")
    )]
    InvalidServerId { id: String, reason: String },

    #[error("Server not found: {0}")]
    #[diagnostic(
        code(hermes::server::not_found),
        help("List provisioned servers with `hermes list`")
    )]
    ServerNotFound(String),

    #[error("No record stored for server '{0}'")]
    #[diagnostic(code(hermes::store::record_not_found))]
    RecordNotFound(String),

    #[error("Server '{0}' already exists")]
    #[diagnostic(code(hermes::server::exists))]
    ServerExists(String),

    #[error("Container CLI error: {0}")]
    #[diagnostic(
        code(hermes::docker::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Docker(#[from] DockerError),

    #[error("Failed to parse {context}: {message}")]
    #[diagnostic(code(hermes::parse::error))]
    Parse { context: String, message: String },

    #[error("Failed to archive server '{id}': {message}")]
    #[diagnostic(
        code(hermes::archive::error),
        help("Check free disk space and permissions on the backups directory")
    )]
    Archive {
        id: String,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("No free port in range {min}..={max}")]
    #[diagnostic(
        code(hermes::port::exhausted),
        help("Widen the `ports` range in hermes.yaml or remove unused servers")
    )]
    PortsExhausted { min: u16, max: u16 },

    #[error("DNS cleanup failed for server '{id}': {message}")]
    #[diagnostic(code(hermes::dns::cleanup_failed))]
    Dns { id: String, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    #[diagnostic(
        code(hermes::database::error),
        help("See recovery suggestions based on the specific error type")
    )]
    Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of failures, used by callers that map errors onto
/// their own responses (HTTP status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    ProcessFailure,
    ParseFailure,
    ArchiveFailure,
    PersistenceFailure,
    PortsExhausted,
    InvalidInput,
    Filesystem,
    Dns,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::ProcessFailure => "process_failure",
            ErrorCategory::ParseFailure => "parse_failure",
            ErrorCategory::ArchiveFailure => "archive_failure",
            ErrorCategory::PersistenceFailure => "persistence_failure",
            ErrorCategory::PortsExhausted => "ports_exhausted",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Dns => "dns",
        };
        f.write_str(s)
    }
}

impl Error {
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn archive(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Archive {
            id: id.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn archive_io(id: impl Into<String>, message: impl Into<String>, err: io::Error) -> Self {
        Error::Archive {
            id: id.into(),
            message: message.into(),
            source: Some(err),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ServerNotFound(_) | Error::RecordNotFound(_) => ErrorCategory::NotFound,
            Error::Docker(_) => ErrorCategory::ProcessFailure,
            Error::Parse { .. } | Error::Json(_) | Error::Yaml(_) => ErrorCategory::ParseFailure,
            Error::Archive { .. } => ErrorCategory::ArchiveFailure,
            Error::Database(_) => ErrorCategory::PersistenceFailure,
            Error::PortsExhausted { .. } => ErrorCategory::PortsExhausted,
            Error::Config(_) | Error::InvalidServerId { .. } | Error::ServerExists(_) => {
                ErrorCategory::InvalidInput
            }
            Error::Io(_) => ErrorCategory::Filesystem,
            Error::Dns { .. } => ErrorCategory::Dns,
        }
    }

    /// True when the failure came from an operation being cancelled rather
    /// than from the external process itself.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Docker(DockerError::Cancelled { .. }))
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::ServerNotFound(id) => Some(format!(
                "No working directory exists for '{}'. Create it with: hermes create {}",
                id, id
            )),
            Error::RecordNotFound(id) => Some(format!(
                "The directory for '{}' exists but the database has no record of it. \
                 Remove the directory or recreate the server.",
                id
            )),
            Error::PortsExhausted { min, max } => Some(format!(
                "Every port between {} and {} is taken. Widen the `ports` range in hermes.yaml.",
                min, max
            )),
            Error::Config(msg) if msg.contains("Could not find") => None,
            Error::Config(_) => Some("Check hermes.yaml for typos and invalid values".to_string()),
            Error::Docker(DockerError::Timeout { .. }) => Some(
                "The container CLI did not answer in time. Raise `process_timeout` in hermes.yaml."
                    .to_string(),
            ),
            Error::Docker(DockerError::Cancelled { .. }) => None,
            Error::Docker(_) => Some("Check that Docker is running: docker ps".to_string()),
            Error::Archive { .. } => Some(
                "The container was stopped but the backup failed. The record still reports \
                 Running; rerun `hermes stop` once the cause is fixed."
                    .to_string(),
            ),
            Error::Database(e) => {
                // tokio_rusqlite wraps the underlying error opaquely, so match on text.
                let err_str = e.to_string();
                if err_str.contains("database is locked") || err_str.contains("SQLITE_BUSY") {
                    Some(
                        "Another hermes instance may be running. Wait for it to finish or \
                         remove a stale lock file next to the database."
                            .to_string(),
                    )
                } else if err_str.contains("database disk image is malformed")
                    || err_str.contains("SQLITE_CORRUPT")
                {
                    Some(
                        "Database corrupted. Back it up and try:\n  sqlite3 <db> '.recover' | sqlite3 <db>.recovered"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
