use crate::output::UserOutput;
use hermes_fleet::{Orchestrator, ServerId};
use std::path::PathBuf;

pub async fn run_backup(
    orchestrator: &Orchestrator,
    id: &ServerId,
    output: Option<PathBuf>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let artifact = orchestrator.backup(id).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(&artifact.name));
    tokio::fs::write(&path, &artifact.bytes).await?;
    out.success(&format!(
        "Wrote {} ({} bytes) to {}",
        artifact.name,
        artifact.size(),
        path.display()
    ));
    Ok(())
}
