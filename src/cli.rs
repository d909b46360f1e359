// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flotilla")]
#[command(about = "Zero-downtime blue-green deployments for machine fleets")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace an app's machines with a new generation
    Deploy {
        /// App to deploy (defaults to the config file's app)
        #[arg(long)]
        app: Option<String>,

        /// New image for every machine
        #[arg(long)]
        image: Option<String>,

        /// Per-wait deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Signal sent to blue machines in the stop phase
        #[arg(long)]
        stop_signal: Option<String>,

        /// Fleet API base URL
        #[arg(long)]
        fleet_url: Option<String>,
    },

    /// Inspect and manage individual machines
    Machines {
        #[command(subcommand)]
        command: MachinesCommands,
    },
}

#[derive(Subcommand)]
pub enum MachinesCommands {
    /// List an app's machines
    List {
        /// App to list (defaults to the config file's app)
        #[arg(long)]
        app: Option<String>,
    },

    /// Destroy a machine
    Destroy {
        /// Machine id
        id: String,

        /// Skip graceful shutdown
        #[arg(long)]
        force: bool,
    },
}
