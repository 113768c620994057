use crate::docker::DockerClient;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which compose CLI to drive, as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeVariant {
    /// Probe `docker compose` first, then `docker-compose`.
    #[default]
    Auto,
    V2,
    V1,
}

impl FromStr for ComposeVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ComposeVariant::Auto),
            "v2" => Ok(ComposeVariant::V2),
            "v1" => Ok(ComposeVariant::V1),
            other => Err(format!("unknown compose variant '{}'", other)),
        }
    }
}

impl fmt::Display for ComposeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComposeVariant::Auto => "auto",
            ComposeVariant::V2 => "v2",
            ComposeVariant::V1 => "v1",
        })
    }
}

/// Resolved compose command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    /// `<docker> compose ...`
    V2,
    /// `docker-compose ...`
    V1,
}

impl ComposeCommand {
    /// Probe the plugin form first, then the standalone binary.
    pub async fn detect(client: &DockerClient) -> Result<Self> {
        if let Ok(output) = client.run(&["compose", "version"]).await {
            if output.status.success() {
                return Ok(ComposeCommand::V2);
            }
        }

        if let Ok(output) = client
            .run_program("docker-compose", &["--version"], None)
            .await
        {
            if output.status.success() {
                return Ok(ComposeCommand::V1);
            }
        }

        Err(Error::Config(format!(
            "Neither '{} compose' (v2) nor 'docker-compose' (v1) found. Please install Docker Compose.",
            client.binary()
        )))
    }

    pub async fn resolve(variant: ComposeVariant, client: &DockerClient) -> Result<Self> {
        match variant {
            ComposeVariant::V2 => Ok(ComposeCommand::V2),
            ComposeVariant::V1 => Ok(ComposeCommand::V1),
            ComposeVariant::Auto => Self::detect(client).await,
        }
    }

    /// Program to spawn and the arguments that precede the subcommand.
    pub fn program_and_prefix<'a>(&self, docker_binary: &'a str) -> (&'a str, &'static [&'static str]) {
        match self {
            ComposeCommand::V2 => (docker_binary, &["compose"]),
            ComposeCommand::V1 => ("docker-compose", &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_and_displays() {
        assert_eq!("V2".parse::<ComposeVariant>(), Ok(ComposeVariant::V2));
        assert_eq!("auto".parse::<ComposeVariant>(), Ok(ComposeVariant::Auto));
        assert!("v3".parse::<ComposeVariant>().is_err());
        assert_eq!(ComposeVariant::V1.to_string(), "v1");
    }

    #[test]
    fn v2_uses_configured_engine_binary() {
        assert_eq!(
            ComposeCommand::V2.program_and_prefix("/usr/local/bin/docker"),
            ("/usr/local/bin/docker", &["compose"][..])
        );
        assert_eq!(
            ComposeCommand::V1.program_and_prefix("docker"),
            ("docker-compose", &[][..])
        );
    }

    #[tokio::test]
    async fn explicit_variant_skips_detection() {
        let client = DockerClient::new().with_binary("/nonexistent/hermes-docker");
        let cmd = ComposeCommand::resolve(ComposeVariant::V2, &client)
            .await
            .unwrap();
        assert_eq!(cmd, ComposeCommand::V2);
    }
}
