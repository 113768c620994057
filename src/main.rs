mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use hermes_fleet::{Error as HermesError, Orchestrator, Parser as ConfigParser, ServerId};
use output::{CliOutput, QuietOutput, UserOutput};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(hermes_error) = e.downcast_ref::<HermesError>() {
            eprintln!("Error: {}", hermes_error);
            if let Some(suggestion) = hermes_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    // ── Commands that need no config ────────────────────────────────
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    let out: &dyn UserOutput = if cli.quiet { &QuietOutput } else { &CliOutput };

    // ── Load config ─────────────────────────────────────────────────
    let cwd = std::env::current_dir()?;
    let config = ConfigParser::new().resolve(cli.config.as_deref(), &cwd)?;

    // Ctrl-C cancels whatever external process is in flight.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling in-flight operations");
                cancel.cancel();
            }
        });
    }

    let orchestrator = Orchestrator::builder()
        .config(config)
        .cancellation_token(cancel)
        .build()
        .await?;

    match cli.command {
        Commands::Start { id } => {
            commands::run_start(&orchestrator, &ServerId::new(id)?, out).await?;
        }
        Commands::Stop { id } => {
            commands::run_stop(&orchestrator, &ServerId::new(id)?, out).await?;
        }
        Commands::Remove { id, force } => {
            commands::run_remove(&orchestrator, &ServerId::new(id)?, force, out).await?;
        }
        Commands::Command { id, text } => {
            commands::run_command(&orchestrator, &ServerId::new(id)?, &text, out).await?;
        }
        Commands::Logs { id, tail } => {
            commands::run_logs(&orchestrator, &ServerId::new(id)?, tail, out).await?;
        }
        Commands::Status { id, json } => {
            commands::run_status(&orchestrator, &ServerId::new(id)?, json, out).await?;
        }
        Commands::Usage { id, json } => {
            commands::run_usage(&orchestrator, &ServerId::new(id)?, json, out).await?;
        }
        Commands::Players { id } => {
            commands::run_players(&orchestrator, &ServerId::new(id)?, out).await?;
        }
        Commands::List { json } => {
            commands::run_list(&orchestrator, json, out).await?;
        }
        Commands::Create { id, keep, start } => {
            commands::run_create(&orchestrator, &ServerId::new(id)?, keep, start, out).await?;
        }
        Commands::Backup { id, output } => {
            commands::run_backup(&orchestrator, &ServerId::new(id)?, output, out).await?;
        }
        Commands::Ports => {
            commands::run_ports(&orchestrator, out).await?;
        }
        Commands::Completions { .. } => {
            unreachable!("handled before config loading");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
