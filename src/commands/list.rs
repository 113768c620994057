use crate::output::UserOutput;
use hermes_fleet::{port::allocate, LifecycleState, Orchestrator};

pub async fn run_list(
    orchestrator: &Orchestrator,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let records = orchestrator.records().await?;

    if json {
        out.data(&serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let orphans: Vec<_> = orchestrator
        .dirs()
        .list()?
        .into_iter()
        .filter(|id| !records.iter().any(|r| &r.id == id))
        .collect();

    if records.is_empty() && orphans.is_empty() {
        out.status("No servers provisioned");
        return Ok(());
    }

    out.data(&format!(
        "{:<24} {:>6}  {:<8} {:<26} {}",
        "ID", "PORT", "STATE", "SINCE", "BACKUP"
    ));
    for record in records {
        let since = match record.state {
            LifecycleState::Running => record.start_date,
            LifecycleState::Stopped => record.shutdown_date,
        }
        .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string());
        let backup = record
            .archive
            .as_ref()
            .map(|a| format!("{} bytes", a.size))
            .unwrap_or_else(|| "-".to_string());
        out.data(&format!(
            "{:<24} {:>6}  {:<8} {:<26} {}",
            record.id.as_str(),
            record.port,
            record.state.to_string(),
            since,
            backup
        ));
        if !orchestrator.dirs().exists(&record.id) {
            out.warning(&format!("  {} has a record but no server directory", record.id));
        }
    }
    for id in orphans {
        out.warning(&format!("{} has a server directory but no record", id));
    }
    Ok(())
}

pub async fn run_ports(orchestrator: &Orchestrator, out: &dyn UserOutput) -> anyhow::Result<()> {
    let used = orchestrator.used_ports().await?;
    let range = orchestrator.port_range();

    out.data(&format!("Range: {} ({} ports)", range, range.len()));
    let listed: Vec<String> = used.iter().map(u16::to_string).collect();
    out.data(&format!(
        "In use: {}",
        if listed.is_empty() {
            "none".to_string()
        } else {
            listed.join(", ")
        }
    ));
    match allocate(&used, range) {
        Ok(port) => out.data(&format!("Next free: {}", port)),
        Err(e) => out.warning(&e.to_string()),
    }
    Ok(())
}
