// ABOUTME: Entry point for the flotilla CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, MachinesCommands};
use flotilla::config::Config;
use flotilla::deploy::DeployErrorKind;
use flotilla::error::{Error, Result};
use flotilla::output::{ColorScheme, Output};
use std::env;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        handle_error(e);
    }
}

/// Handle errors with programmatic error types and helpful hints.
fn handle_error(e: Error) -> ! {
    match &e {
        Error::Deploy(deploy_err) => {
            if deploy_err.is_aborted() {
                eprintln!("Error: {e}");
                std::process::exit(130);
            }
            match deploy_err.kind() {
                DeployErrorKind::OrgLimit => {
                    eprintln!("Error: {e}");
                    eprintln!("       Tip: Ask your org admin to enable blue-green deployments");
                    std::process::exit(2);
                }
                DeployErrorKind::ValidationError => {
                    eprintln!("Error: {e}");
                    eprintln!("       Tip: Define at least one check on a service");
                    std::process::exit(3);
                }
                DeployErrorKind::WaitTimeout
                | DeployErrorKind::WaitForStartedState
                | DeployErrorKind::WaitForHealthy => {
                    eprintln!("Error: {e}");
                    eprintln!("       Tip: Increase --timeout or wait_timeout in flotilla.yml");
                    std::process::exit(4);
                }
                _ => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Error::ConfigNotFound(path) => {
            eprintln!("Error: Configuration file not found in {}", path.display());
            eprintln!("       Tip: Create flotilla.yml with at least an `app:` entry");
            std::process::exit(6);
        }
        _ => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn output_for(config: &Config) -> Output {
    let colors = ColorScheme::new(!config.no_color && std::io::stderr().is_terminal());
    Output::stderr(colors)
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy {
            app,
            image,
            timeout,
            stop_signal,
            fleet_url,
        } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            let output = output_for(&config);

            commands::deploy(
                config,
                commands::DeployArgs {
                    app,
                    image,
                    timeout,
                    stop_signal,
                    fleet_url,
                },
                output,
            )
            .await
        }
        Commands::Machines { command } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            let output = output_for(&config);

            match command {
                MachinesCommands::List { app } => {
                    commands::machines_list(config, app, output).await
                }
                MachinesCommands::Destroy { id, force } => {
                    commands::machines_destroy(config, id, force, output).await
                }
            }
        }
    }
}
