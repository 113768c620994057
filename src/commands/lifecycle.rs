use crate::output::UserOutput;
use hermes_fleet::{CreateOptions, Orchestrator, ServerId};

pub async fn run_start(
    orchestrator: &Orchestrator,
    id: &ServerId,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    out.progress(&format!("Starting {}...", id));
    match orchestrator.start(id).await {
        Ok(()) => {
            out.finish_progress(" done");
            Ok(())
        }
        Err(e) => {
            out.finish_progress(" failed");
            Err(e.into())
        }
    }
}

pub async fn run_stop(
    orchestrator: &Orchestrator,
    id: &ServerId,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    out.progress(&format!("Stopping {}...", id));
    if let Err(e) = orchestrator.stop(id).await {
        out.finish_progress(" failed");
        return Err(e.into());
    }
    out.finish_progress(" done");

    let record = orchestrator.record(id).await?;
    if let Some(archive) = &record.archive {
        out.status(&format!("  Backup: {} ({} bytes)", archive.name, archive.size));
    }
    match record.deletion_date {
        Some(when) => out.status(&format!("  Scheduled for deletion at {}", when.to_rfc3339())),
        None => out.status("  Kept indefinitely"),
    }
    Ok(())
}

pub async fn run_remove(
    orchestrator: &Orchestrator,
    id: &ServerId,
    force: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    out.status(&format!("Removing {}...", id));
    orchestrator.remove(id, force).await?;
    out.success(&format!("Server {} removed", id));
    Ok(())
}

pub async fn run_create(
    orchestrator: &Orchestrator,
    id: &ServerId,
    keep: bool,
    start: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let options = CreateOptions {
        keep,
        start,
        ..Default::default()
    };
    let record = orchestrator.create(id, options).await?;
    out.success(&format!(
        "Created {} on port {} ({})",
        record.id, record.port, record.state
    ));
    out.status(&format!(
        "  Directory: {}",
        orchestrator.dirs().server_dir(id).display()
    ));
    Ok(())
}
