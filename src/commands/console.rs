use crate::output::UserOutput;
use hermes_fleet::{Orchestrator, ServerId};

pub async fn run_command(
    orchestrator: &Orchestrator,
    id: &ServerId,
    text: &[String],
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let command = text.join(" ");
    for line in orchestrator.command(id, &command).await? {
        out.data(&line);
    }
    Ok(())
}
