use clap::{Parser, Subcommand};
use clap_complete::Shell;
use hermes_fleet::LogTail;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hermes")]
#[command(about = "Hermes - Run a fleet of Minecraft servers with docker compose")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to the nearest hermes.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print command results, no progress messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a server
    Start {
        /// Server id
        id: String,
    },
    /// Stop a server and store a backup of its files
    Stop {
        /// Server id
        id: String,
    },
    /// Stop a server and delete its files and record
    Remove {
        /// Server id
        id: String,
        /// Don't fail if the server files are already gone
        #[arg(short, long)]
        force: bool,
    },
    /// Send a console command over RCON
    Command {
        /// Server id
        id: String,
        /// Command text, forwarded as is
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Show recent container logs
    Logs {
        /// Server id
        id: String,
        /// Number of lines, or "all" (at most 150 either way)
        #[arg(short = 'n', long, default_value = "all")]
        tail: LogTail,
    },
    /// Show container status
    Status {
        /// Server id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one resource usage sample
    Usage {
        /// Server id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how many players are online
    Players {
        /// Server id
        id: String,
    },
    /// List server records
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Provision a new server directory and record
    Create {
        /// Server id
        id: String,
        /// Never schedule this server for deletion
        #[arg(long)]
        keep: bool,
        /// Start the server after creating it
        #[arg(long)]
        start: bool,
    },
    /// Write the backup taken at the last stop to a file
    Backup {
        /// Server id
        id: String,
        /// Output path (defaults to <id>.zip in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show allocated ports and the next free one
    Ports,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
