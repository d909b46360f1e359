// ABOUTME: Fleet and platform API traits: the seams the orchestrator works against.
// ABOUTME: Narrow per-machine operations; implementations decide the transport.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use super::error::FleetError;
use crate::types::{AppName, LaunchSpec, Machine, MachineId};

/// Target state for a fleet-side wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Start,
    Stop,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredState::Start => "started",
            DesiredState::Stop => "stopped",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the fleet exposes on individual machines.
///
/// Launching implicitly acquires a lease on the new machine; callers hold it
/// until the deployment ends and release it explicitly.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Create and boot a machine from the given spec.
    async fn launch(&self, spec: &LaunchSpec) -> Result<Machine, FleetError>;

    /// Fetch a machine's current state and check statuses.
    async fn get(&self, id: &MachineId) -> Result<Machine, FleetError>;

    /// List every machine belonging to an app.
    async fn list_machines(&self, app: &AppName) -> Result<Vec<Machine>, FleetError>;

    /// Restore a machine to the edge proxy's routing table.
    async fn uncordon(&self, id: &MachineId, reason: &str) -> Result<(), FleetError>;

    /// Remove a machine from the edge proxy's routing table without
    /// changing its runtime state.
    async fn cordon(&self, id: &MachineId) -> Result<(), FleetError>;

    /// Deliver the named signal to a machine's workload.
    async fn stop(&self, id: &MachineId, signal: &str) -> Result<(), FleetError>;

    /// Tear a machine down. With `force`, the fleet skips graceful shutdown.
    async fn destroy(&self, id: &MachineId, force: bool) -> Result<(), FleetError>;

    /// Block until the machine reaches the desired state or the timeout
    /// elapses.
    async fn wait_for_state(
        &self,
        id: &MachineId,
        desired: DesiredState,
        timeout: Duration,
    ) -> Result<(), FleetError>;

    /// Release the exclusive lease acquired at launch.
    async fn release_lease(&self, id: &MachineId) -> Result<(), FleetError>;
}

/// The platform control plane's policy surface.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Whether this app's org is permitted to run a blue-green deployment.
    async fn can_perform_bluegreen_deployment(&self, app: &AppName) -> Result<bool, FleetError>;
}
