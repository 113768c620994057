//! Root configuration for `hermes.yaml`.

use super::duration::duration_str;
use crate::archive::DEFAULT_EXCLUDES;
use crate::compose::logs::DEFAULT_LOG_FILTERS;
use crate::compose::runtime::{DEFAULT_RCON_BINARY, DEFAULT_STATS_SETTLE};
use crate::compose::{definition::DEFAULT_SERVICE_NAME, ComposeVariant};
use crate::docker::client::DEFAULT_PROCESS_TIMEOUT;
use crate::port::PortRange;
use crate::state::DEFAULT_DELETION_TTL_HOURS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_FILE_NAMES: &[&str] = &["hermes.yaml", "hermes.yml"];

/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// One subdirectory per server.
    pub servers_dir: PathBuf,

    /// Where `<id>.zip` archives are written.
    pub backups_dir: PathBuf,

    /// SQLite database holding server records.
    pub database: PathBuf,

    /// Host ports handed out to new servers, inclusive.
    pub ports: PortRange,

    /// Hours after a stop before a deletable server may be reaped.
    pub deletion_ttl_hours: u32,

    /// Upper bound on any single container CLI call.
    #[serde(with = "duration_str")]
    pub process_timeout: Duration,

    #[serde(with = "duration_str")]
    pub stats_settle: Duration,

    pub docker_binary: String,

    pub compose: ComposeVariant,

    /// Compose service that console commands are sent to.
    pub rcon_service: String,

    pub rcon_binary: String,

    /// Regexes for log lines to drop.
    pub log_filters: Vec<String>,

    /// Gitignore-style patterns left out of backups.
    pub archive_excludes: Vec<String>,

    /// Environment written into each new server's compose file.
    pub server_environment: BTreeMap<String, String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            servers_dir: PathBuf::from("servers"),
            backups_dir: PathBuf::from("servers/backups"),
            database: PathBuf::from(".hermes/fleet.db"),
            ports: PortRange::DEFAULT,
            deletion_ttl_hours: DEFAULT_DELETION_TTL_HOURS,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            stats_settle: DEFAULT_STATS_SETTLE,
            docker_binary: "docker".to_string(),
            compose: ComposeVariant::Auto,
            rcon_service: DEFAULT_SERVICE_NAME.to_string(),
            rcon_binary: DEFAULT_RCON_BINARY.to_string(),
            log_filters: DEFAULT_LOG_FILTERS.iter().map(|s| s.to_string()).collect(),
            archive_excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            server_environment: default_server_environment(),
        }
    }
}

fn default_server_environment() -> BTreeMap<String, String> {
    [
        ("EULA", "true"),
        ("USE_AIKAR_FLAGS", "true"),
        ("MEMORY", "2G"),
        ("ENABLE_AUTOPAUSE", "true"),
        ("ALLOW_FLIGHT", "true"),
        ("SPAWN_PROTECTION", "0"),
        ("MOTD", "A Hermes Minecraft Server"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
