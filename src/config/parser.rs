use super::types::CONFIG_FILE_NAMES;
use super::FleetConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_SERVERS_DIR: &str = "HERMES_SERVERS_DIR";
pub const ENV_BACKUPS_DIR: &str = "HERMES_BACKUPS_DIR";
pub const ENV_DATABASE: &str = "HERMES_DATABASE";

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Find config file starting from current directory
    pub fn find_config_file(&self) -> Result<PathBuf> {
        let current_dir = std::env::current_dir()?;
        Self::find_config_in_dir(&current_dir)
    }

    pub fn find_config_in_dir(dir: &Path) -> Result<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        if let Some(parent) = dir.parent() {
            return Self::find_config_in_dir(parent);
        }

        Err(Error::Config(
            "Could not find hermes.yaml in current directory or any parent".to_string(),
        ))
    }

    /// Load config from file path. Relative paths inside the file are
    /// resolved against the file's directory.
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<FleetConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut config = self.parse_config(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn parse_config(&self, content: &str) -> Result<FleetConfig> {
        if content.trim().is_empty() {
            return Ok(FleetConfig::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML config: {}", e)))
    }

    /// Full resolution used by the CLI: explicit path, else the nearest
    /// `hermes.yaml`, else defaults relative to `cwd`. Environment overrides
    /// are applied last and the result is validated.
    pub fn resolve(&self, explicit: Option<&Path>, cwd: &Path) -> Result<FleetConfig> {
        let mut config = match explicit {
            Some(path) => self.load_config(path)?,
            None => match Self::find_config_in_dir(cwd) {
                Ok(path) => self.load_config(path)?,
                Err(_) => {
                    debug!("No hermes.yaml found, using defaults");
                    let mut config = FleetConfig::default();
                    config.resolve_relative_to(cwd);
                    config
                }
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok(), cwd);
        config.validate()?;
        Ok(config)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetConfig {
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.servers_dir, &mut self.backups_dir, &mut self.database] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// `HERMES_SERVERS_DIR`, `HERMES_BACKUPS_DIR` and `HERMES_DATABASE` win
    /// over the file. Relative values are taken from `cwd`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F, cwd: &Path)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets = [
            (ENV_SERVERS_DIR, &mut self.servers_dir),
            (ENV_BACKUPS_DIR, &mut self.backups_dir),
            (ENV_DATABASE, &mut self.database),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                debug!(key, value = %value, "Config override from environment");
                *target = cwd.join(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposeVariant;
    use crate::port::PortRange;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = Parser::new().parse_config("").unwrap();
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
servers_dir: /srv/mc
ports:
  min: 30000
  max: 30010
process_timeout: 45s
compose: v1
server_environment:
  EULA: "true"
  MEMORY: 4G
"#;
        let config = Parser::new().parse_config(yaml).unwrap();
        assert_eq!(config.servers_dir, PathBuf::from("/srv/mc"));
        assert_eq!(config.ports, PortRange { min: 30000, max: 30010 });
        assert_eq!(config.process_timeout, Duration::from_secs(45));
        assert_eq!(config.compose, ComposeVariant::V1);
        assert_eq!(config.server_environment["MEMORY"], "4G");
        assert_eq!(config.server_environment.len(), 2);
        assert_eq!(config.deletion_ttl_hours, 168);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Parser::new().parse_config("server_dir: x\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        assert!(Parser::new().parse_config("stats_settle: soon\n").is_err());
    }

    #[test]
    fn test_find_config_walks_up() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join("hermes.yml"), "").unwrap();

        let found = Parser::find_config_in_dir(&nested).unwrap();
        assert_eq!(found, root.path().join("hermes.yml"));
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("hermes.yaml");
        std::fs::write(&path, "servers_dir: worlds\ndatabase: /var/lib/hermes.db\n").unwrap();

        let config = Parser::new().load_config(&path).unwrap();
        assert_eq!(config.servers_dir, root.path().join("worlds"));
        assert_eq!(config.backups_dir, root.path().join("servers/backups"));
        assert_eq!(config.database, PathBuf::from("/var/lib/hermes.db"));
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> =
            [(ENV_SERVERS_DIR, "/data/servers"), (ENV_DATABASE, "")].into();
        let mut config = FleetConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()), Path::new("/work"));

        assert_eq!(config.servers_dir, PathBuf::from("/data/servers"));
        assert_eq!(config.database, PathBuf::from(".hermes/fleet.db"));
    }
}
