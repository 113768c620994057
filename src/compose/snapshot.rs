//! Typed views of `compose ps`, `docker stats` and `mc-monitor` output.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container state as reported by the engine, plus the locally derived
/// `Paused` overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Other(String),
}

impl From<String> for ContainerState {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Other(s),
        }
    }
}

impl From<ContainerState> for String {
    fn from(state: ContainerState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
            ContainerState::Other(s) => s,
        };
        f.write_str(s)
    }
}

/// One container from `compose ps --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Project", default)]
    pub project: String,
    #[serde(rename = "Service", default)]
    pub service: String,
    #[serde(rename = "State")]
    pub state: ContainerState,
    #[serde(rename = "ExitCode", default)]
    pub exit_code: i32,
}

impl ContainerSnapshot {
    /// The engine can't report the game server's own auto-pause, so a pause
    /// marker on disk overrides whatever state it gave us.
    pub fn with_pause_overlay(mut self, paused: bool) -> Self {
        if paused {
            self.state = ContainerState::Paused;
        }
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Parse `compose ps --format json` output and return the first container.
///
/// Compose v2 before 2.21 prints a JSON array, later releases print one
/// object per line; both are accepted.
pub fn parse_ps(stdout: &str) -> Result<ContainerSnapshot> {
    const CONTEXT: &str = "compose ps output";

    let trimmed = stdout.trim();
    let records: Vec<serde_json::Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| Error::parse(CONTEXT, e.to_string()))?
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str::<serde_json::Value>)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::parse(CONTEXT, e.to_string()))?
    };

    let first = records
        .into_iter()
        .next()
        .ok_or_else(|| Error::parse(CONTEXT, "no containers reported"))?;

    serde_json::from_value(first)
        .map_err(|e| Error::parse(CONTEXT, format!("malformed first record: {}", e)))
}

/// One-shot resource usage from `docker stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub container_id: String,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// As reported, e.g. `"1.2GiB / 7.7GiB"`
    pub memory_usage: String,
    pub network_io: String,
    pub block_io: String,
    pub pids: u32,
}

#[derive(Deserialize)]
struct RawStats {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "MemPerc")]
    mem_perc: String,
    #[serde(rename = "MemUsage")]
    mem_usage: String,
    #[serde(rename = "NetIO")]
    net_io: String,
    #[serde(rename = "BlockIO")]
    block_io: String,
    #[serde(rename = "PIDs")]
    pids: String,
}

/// Parse the single JSON record printed by
/// `docker stats --no-stream --format '{{ json . }}'`.
pub fn parse_stats(stdout: &str) -> Result<UsageSample> {
    const CONTEXT: &str = "docker stats output";

    let joined: String = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if joined.is_empty() {
        return Err(Error::parse(CONTEXT, "no stats record"));
    }

    let raw: RawStats =
        serde_json::from_str(&joined).map_err(|e| Error::parse(CONTEXT, e.to_string()))?;

    Ok(UsageSample {
        cpu_percent: parse_percent(CONTEXT, &raw.cpu_perc)?,
        memory_percent: parse_percent(CONTEXT, &raw.mem_perc)?,
        pids: raw
            .pids
            .trim()
            .parse()
            .map_err(|_| Error::parse(CONTEXT, format!("invalid PIDs value '{}'", raw.pids)))?,
        container_id: raw.id,
        name: raw.name,
        memory_usage: raw.mem_usage,
        network_io: raw.net_io,
        block_io: raw.block_io,
    })
}

fn parse_percent(context: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| Error::parse(context, format!("invalid percentage '{}'", value)))
}

/// Players reported by `mc-monitor status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    pub online: u32,
    pub max: u32,
}

/// Parse `mc-monitor status` output, e.g.
/// `localhost:25565 : version=1.20.4 online=2 max=20 motd='A Hermes Minecraft Server'`.
pub fn parse_players(stdout: &str) -> Result<PlayerCount> {
    const CONTEXT: &str = "mc-monitor status output";

    let field = |name: &str| -> Result<u32> {
        let prefix = format!("{}=", name);
        stdout
            .split_whitespace()
            .find_map(|token| token.strip_prefix(prefix.as_str()))
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| Error::parse(CONTEXT, format!("missing '{}' field", prefix)))
    };

    Ok(PlayerCount {
        online: field("online")?,
        max: field("max")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS_LINE: &str = r#"{"Command":"\"/start\"","CreatedAt":"2024-01-01 10:00:00 +0000 UTC","ExitCode":0,"Health":"healthy","ID":"4f1c2a","Image":"itzg/minecraft-server","Name":"alpha-minecraft-1","Project":"alpha","Service":"minecraft","State":"running","Status":"Up 2 minutes (healthy)"}"#;

    #[test]
    fn parses_ndjson_ps_output() {
        let snapshot = parse_ps(&format!("{}\n", PS_LINE)).unwrap();
        assert_eq!(snapshot.id, "4f1c2a");
        assert_eq!(snapshot.project, "alpha");
        assert_eq!(snapshot.service, "minecraft");
        assert_eq!(snapshot.state, ContainerState::Running);
        assert_eq!(snapshot.exit_code, 0);
        assert!(snapshot.is_running());
    }

    #[test]
    fn parses_array_ps_output() {
        let snapshot = parse_ps(&format!("[{}]", PS_LINE)).unwrap();
        assert_eq!(snapshot.id, "4f1c2a");
    }

    #[test]
    fn empty_ps_output_is_parse_failure() {
        assert!(matches!(parse_ps(""), Err(Error::Parse { .. })));
        assert!(matches!(parse_ps("[]"), Err(Error::Parse { .. })));
        assert!(matches!(parse_ps("\n\n"), Err(Error::Parse { .. })));
    }

    #[test]
    fn malformed_first_record_is_parse_failure() {
        assert!(matches!(parse_ps("[null]"), Err(Error::Parse { .. })));
        assert!(matches!(parse_ps(r#"{"Name":"x"}"#), Err(Error::Parse { .. })));
        assert!(matches!(parse_ps("not json"), Err(Error::Parse { .. })));
    }

    #[test]
    fn pause_overlay_overrides_engine_state() {
        let snapshot = parse_ps(PS_LINE).unwrap();
        let paused = snapshot.clone().with_pause_overlay(true);
        assert_eq!(paused.state, ContainerState::Paused);
        assert!(!paused.is_running());
        assert_eq!(snapshot.with_pause_overlay(false).state, ContainerState::Running);
    }

    #[test]
    fn unknown_states_are_preserved() {
        let state = ContainerState::from("Zombie".to_string());
        assert_eq!(state, ContainerState::Other("Zombie".into()));
        assert_eq!(state.to_string(), "Zombie");
        assert_eq!(ContainerState::from("Exited".to_string()), ContainerState::Exited);
    }

    #[test]
    fn parses_stats_record() {
        let out = r#"{"BlockIO":"1.2MB / 0B","CPUPerc":"12.50%","Container":"4f1c2a","ID":"4f1c2a9d","MemPerc":"25.03%","MemUsage":"1.9GiB / 7.7GiB","Name":"alpha-minecraft-1","NetIO":"3kB / 1kB","PIDs":"48"}"#;
        let sample = parse_stats(&format!("{}\n", out)).unwrap();
        assert_eq!(sample.container_id, "4f1c2a9d");
        assert!((sample.cpu_percent - 12.5).abs() < f64::EPSILON);
        assert!((sample.memory_percent - 25.03).abs() < 1e-9);
        assert_eq!(sample.memory_usage, "1.9GiB / 7.7GiB");
        assert_eq!(sample.pids, 48);
    }

    #[test]
    fn bad_stats_are_parse_failures() {
        assert!(matches!(parse_stats(""), Err(Error::Parse { .. })));
        assert!(matches!(parse_stats("{\"ID\":\"x\"}"), Err(Error::Parse { .. })));
        let out = r#"{"BlockIO":"--","CPUPerc":"--","ID":"x","MemPerc":"--","MemUsage":"--","NetIO":"--","PIDs":"--"}"#;
        assert!(matches!(parse_stats(out), Err(Error::Parse { .. })));
    }

    #[test]
    fn parses_player_count() {
        let out = "localhost:25565 : version=1.20.4 online=3 max=20 motd='A Hermes Minecraft Server'\n";
        assert_eq!(parse_players(out).unwrap(), PlayerCount { online: 3, max: 20 });
        assert!(matches!(
            parse_players("localhost:25565 : failed to connect"),
            Err(Error::Parse { .. })
        ));
    }
}
