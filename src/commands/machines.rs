// ABOUTME: Machine inspection and cleanup commands.
// ABOUTME: Thin wrappers over the fleet client for list and destroy.

use flotilla::config::Config;
use flotilla::error::Result;
use flotilla::fleet::{FleetApi, HttpFleet};
use flotilla::output::Output;
use flotilla::types::{AppName, GENERATION_TAG_KEY, MachineId};

pub async fn list(config: Config, app: Option<String>, output: Output) -> Result<()> {
    let app = match &app {
        Some(name) => AppName::new(name)?,
        None => config.app.clone(),
    };
    let fleet = HttpFleet::new(&config.fleet_url);

    let machines = fleet.list_machines(&app).await?;
    if machines.is_empty() {
        output.line(&format!("App {app} has no machines"));
        return Ok(());
    }

    for machine in machines {
        let health = machine.top_level_checks();
        let tag = machine
            .config
            .metadata
            .get(GENERATION_TAG_KEY)
            .map(String::as_str)
            .unwrap_or("-");
        output.line(&format!(
            "{:<16} {:<10} {:<12} gen {}",
            machine.formatted_id(),
            machine.state,
            if health.total == 0 {
                "unchecked".to_string()
            } else {
                format!("{}/{} passing", health.passing, health.total)
            },
            tag,
        ));
    }

    Ok(())
}

pub async fn destroy(config: Config, id: String, force: bool, output: Output) -> Result<()> {
    let fleet = HttpFleet::new(&config.fleet_url);
    let id = MachineId::new(id);

    fleet.destroy(&id, force).await?;
    output.line(&format!("Machine {id} destroyed"));

    Ok(())
}
