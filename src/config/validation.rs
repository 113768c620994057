use super::FleetConfig;
use crate::compose::definition::validate_env_key;
use crate::compose::LogFilter;
use crate::error::{Error, Result};
use crate::port::PortRange;
use ignore::gitignore::GitignoreBuilder;
use std::time::Duration;

impl FleetConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        PortRange::new(self.ports.min, self.ports.max)?;

        if self.process_timeout == Duration::ZERO {
            return Err(Error::Config(
                "process_timeout must be greater than zero".to_string(),
            ));
        }

        if self.docker_binary.trim().is_empty() {
            return Err(Error::Config("docker_binary must not be empty".to_string()));
        }

        if self.rcon_service.trim().is_empty() {
            return Err(Error::Config("rcon_service must not be empty".to_string()));
        }

        if self.servers_dir == self.database || self.backups_dir == self.database {
            return Err(Error::Config(format!(
                "database path '{}' collides with a data directory",
                self.database.display()
            )));
        }

        LogFilter::new(self.log_filters.as_slice())?;

        let mut excludes = GitignoreBuilder::new(&self.servers_dir);
        for pattern in &self.archive_excludes {
            excludes.add_line(None, pattern).map_err(|e| {
                Error::Config(format!("Invalid archive exclude '{}': {}", pattern, e))
            })?;
        }

        for key in self.server_environment.keys() {
            validate_env_key(key)?;
        }

        Ok(())
    }
}
