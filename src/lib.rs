#![allow(unused_assignments)]

//! # Hermes Fleet
//!
//! Lifecycle orchestration for a fleet of containerized game servers, each
//! one a single-service `docker compose` project in its own directory.
//!
//! ## Features
//!
//! - **Lifecycle**: start, stop (with backup), remove, and pass-through
//!   console commands
//! - **Queries**: container status with pause overlay, filtered logs,
//!   one-shot resource usage, player counts
//! - **Backups**: filtered zip of a server's files, stored with its record
//! - **Port Allocation**: lowest free port, reserved atomically with the record
//! - **Safety**: per-server mutual exclusion, timeouts and cancellation on
//!   every external process
//!
//! ## Quick Start
//!
//! ```no_run
//! use hermes_fleet::{Orchestrator, Parser, ServerId};
//!
//! # async fn example() -> Result<(), hermes_fleet::Error> {
//! let config = Parser::new().load_config("hermes.yaml")?;
//! let orchestrator = Orchestrator::builder().config(config).build().await?;
//!
//! let id = ServerId::new("survival")?;
//! orchestrator.start(&id).await?;
//! let status = orchestrator.status(&id).await?;
//! println!("{}: {}", id, status.state);
//! orchestrator.stop(&id).await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod compose;
pub mod config;
pub mod dns;
pub mod docker;
pub mod error;
pub mod orchestrator;
pub mod port;
pub mod state;
pub mod workspace;

// Re-export commonly used types
pub use archive::{ArchiveArtifact, Archiver};
pub use compose::{ComposeRuntime, ContainerRuntime, ContainerSnapshot, ContainerState, LogTail};
pub use config::{FleetConfig, Parser};
pub use error::{Error, ErrorCategory, Result};
pub use orchestrator::{CreateOptions, Orchestrator};
pub use state::{LifecycleState, ServerRecord, ServerStore, SqliteServerStore};
pub use workspace::{ServerDirs, ServerId};
