use crate::output::UserOutput;
use hermes_fleet::{LogTail, Orchestrator, ServerId};

pub async fn run_logs(
    orchestrator: &Orchestrator,
    id: &ServerId,
    tail: LogTail,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let lines = orchestrator.logs(id, tail).await?;
    if lines.is_empty() {
        out.status(&format!("No log output for {}", id));
    }
    for line in lines {
        out.data(&line);
    }
    Ok(())
}
