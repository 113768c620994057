//! Typed `docker-compose.yml` for a single game server.
//!
//! The file is always produced by serializing these structs, never by string
//! concatenation, so operator-supplied values like a MOTD can't add keys.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_IMAGE: &str = "itzg/minecraft-server";
pub const DEFAULT_SERVICE_NAME: &str = "minecraft";
/// Port the game listens on inside the container.
pub const CONTAINER_PORT: u16 = 25565;
pub const DATA_VOLUME: &str = "./server-files:/data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    pub test: String,
    pub start_period: String,
    pub interval: String,
    pub retries: u32,
}

impl Default for Healthcheck {
    fn default() -> Self {
        Self {
            test: "mc-health".to_string(),
            start_period: "1m".to_string(),
            interval: "5s".to_string(),
            retries: 20,
        }
    }
}

impl ComposeDefinition {
    /// One game-server service publishing `host_port`, with its data volume
    /// mounted from `server-files/`.
    pub fn game_server(service_name: &str, host_port: u16) -> Self {
        let service = ComposeService {
            image: DEFAULT_IMAGE.to_string(),
            ports: vec![format!("{}:{}", host_port, CONTAINER_PORT)],
            volumes: vec![DATA_VOLUME.to_string()],
            environment: BTreeMap::new(),
            restart: Some("no".to_string()),
            healthcheck: Some(Healthcheck::default()),
        };
        let mut services = BTreeMap::new();
        services.insert(service_name.to_string(), service);
        Self {
            version: Some("3.9".to_string()),
            services,
        }
    }

    /// Merge environment variables into every service. Keys must be plain
    /// identifiers; values are stored verbatim.
    pub fn with_env<K, V, I>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let key = key.into();
            validate_env_key(&key)?;
            let value = value.into();
            for service in self.services.values_mut() {
                service.environment.insert(key.clone(), value.clone());
            }
        }
        Ok(self)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write to `path` through a sibling temp file so a crash never leaves a
    /// half-written definition behind.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        let tmp = path.with_extension("yml.tmp");
        std::fs::write(&tmp, yaml)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

pub(crate) fn validate_env_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid environment variable name '{}'",
            key
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_server_layout() {
        let def = ComposeDefinition::game_server("minecraft", 25570);
        let service = &def.services["minecraft"];
        assert_eq!(service.ports, vec!["25570:25565"]);
        assert_eq!(service.volumes, vec!["./server-files:/data"]);
        assert_eq!(service.restart.as_deref(), Some("no"));
        assert_eq!(service.healthcheck.as_ref().map(|h| h.retries), Some(20));
    }

    #[test]
    fn hostile_values_stay_inside_their_key() {
        let motd = "hi\"\n    privileged: true\nx: |\n  - evil";
        let def = ComposeDefinition::game_server("minecraft", 25565)
            .with_env([("MOTD", motd), ("EULA", "true")])
            .unwrap();

        let parsed = ComposeDefinition::from_yaml(&def.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, def);
        let service = &parsed.services["minecraft"];
        assert_eq!(service.environment["MOTD"], motd);
        assert_eq!(service.environment.len(), 2);
        assert_eq!(parsed.services.len(), 1);
    }

    #[test]
    fn bad_env_keys_are_rejected() {
        for key in ["", "1ABC", "A-B", "A B", "A=B"] {
            let result = ComposeDefinition::game_server("minecraft", 25565).with_env([(key, "x")]);
            assert!(matches!(result, Err(Error::Config(_))), "{key:?}");
        }
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(&path, "garbage").unwrap();

        let def = ComposeDefinition::game_server("minecraft", 25566);
        def.write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(ComposeDefinition::from_yaml(&content).unwrap(), def);
        assert!(!dir.path().join("docker-compose.yml.tmp").exists());
    }
}
