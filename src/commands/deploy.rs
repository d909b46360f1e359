// ABOUTME: Deploy command implementation.
// ABOUTME: Fetches the blue generation, runs the orchestrator, rolls back on failure.

use std::sync::Arc;
use std::time::Duration;

use flotilla::config::Config;
use flotilla::deploy::{BlueGreen, DeployOptions, MachineUpdateEntry};
use flotilla::error::Result;
use flotilla::fleet::{FleetApi, HttpFleet};
use flotilla::output::Output;
use flotilla::types::AppName;

/// CLI overrides for a deployment.
pub struct DeployArgs {
    pub app: Option<String>,
    pub image: Option<String>,
    pub timeout: Option<u64>,
    pub stop_signal: Option<String>,
    pub fleet_url: Option<String>,
}

pub async fn deploy(config: Config, args: DeployArgs, output: Output) -> Result<()> {
    let app = match &args.app {
        Some(name) => AppName::new(name)?,
        None => config.app.clone(),
    };
    let fleet_url = args.fleet_url.as_deref().unwrap_or(&config.fleet_url);
    let fleet = Arc::new(HttpFleet::new(fleet_url));

    let machines = fleet.list_machines(&app).await?;
    if machines.is_empty() {
        output.line(&format!("App {app} has no machines; nothing to deploy"));
        return Ok(());
    }

    let blue: Vec<MachineUpdateEntry> = machines
        .into_iter()
        .map(|machine| {
            let mut entry = MachineUpdateEntry::for_redeploy(machine);
            if let Some(image) = &args.image {
                entry.launch_spec.config.image = image.clone();
            }
            entry
        })
        .collect();

    let options = DeployOptions {
        timeout: args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(config.wait_timeout),
        stop_signal: args.stop_signal.unwrap_or_else(|| config.stop_signal.clone()),
    };

    let platform = (*fleet).clone();
    let mut deployment = BlueGreen::new(fleet, platform, app, blue, output, options);
    let _ctrlc = deployment.abort_channel().hook_ctrl_c();

    match deployment.deploy().await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::warn!(error = %err, "deployment failed, rolling back");
            deployment.rollback(&err).await?;
            Err(err.into())
        }
    }
}
