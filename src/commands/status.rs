use crate::output::UserOutput;
use hermes_fleet::{ContainerState, Orchestrator, ServerId};

pub async fn run_status(
    orchestrator: &Orchestrator,
    id: &ServerId,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let snapshot = orchestrator.status(id).await?;

    if json {
        out.data(&serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let icon = match snapshot.state {
        ContainerState::Running => "+",
        ContainerState::Paused => "-",
        ContainerState::Created | ContainerState::Restarting => ".",
        ContainerState::Exited | ContainerState::Removing => "o",
        ContainerState::Dead | ContainerState::Other(_) => "x",
    };
    out.data(&format!("{} {:<24} {}", icon, id, snapshot.state));
    out.data(&format!("  container  {}", snapshot.id));
    out.data(&format!("  project    {}", snapshot.project));
    if snapshot.exit_code != 0 {
        out.data(&format!("  exit code  {}", snapshot.exit_code));
    }
    Ok(())
}

pub async fn run_usage(
    orchestrator: &Orchestrator,
    id: &ServerId,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let sample = orchestrator.usage(id).await?;

    if json {
        out.data(&serde_json::to_string_pretty(&sample)?);
        return Ok(());
    }

    out.data(&format!("{} ({})", id, sample.name));
    out.data(&format!("  cpu        {:.2}%", sample.cpu_percent));
    out.data(&format!(
        "  memory     {:.2}% ({})",
        sample.memory_percent, sample.memory_usage
    ));
    out.data(&format!("  net i/o    {}", sample.network_io));
    out.data(&format!("  block i/o  {}", sample.block_io));
    out.data(&format!("  pids       {}", sample.pids));
    Ok(())
}

pub async fn run_players(
    orchestrator: &Orchestrator,
    id: &ServerId,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let players = orchestrator.players(id).await?;
    out.data(&format!("{}/{} players online", players.online, players.max));
    Ok(())
}
