// ABOUTME: Command handlers for the flotilla binary.
// ABOUTME: Each submodule implements one CLI subcommand.

mod deploy;
mod machines;

pub use deploy::{DeployArgs, deploy};
pub use machines::{destroy as machines_destroy, list as machines_list};
