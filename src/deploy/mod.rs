// ABOUTME: Blue-green deployment orchestration.
// ABOUTME: Exports the deployment object, abort channel, and error types.

mod abort;
mod bluegreen;
mod checks;
mod error;
mod tracker;
mod zombies;

pub use abort::{AbortChannel, CtrlCHook};
pub use bluegreen::{BlueGreen, DeployOptions, MachineUpdateEntry};
pub use error::{DeployError, DeployErrorKind};
pub use tracker::{StatusCell, StatusRenderer, Tracker};
