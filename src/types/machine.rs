// ABOUTME: Machine resource as reported by the fleet API.
// ABOUTME: Carries identity, lifecycle state, config, and check statuses.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::check::{CheckState, CheckStatus, HealthStatus};
use super::id::{LeaseId, MachineId};
use super::spec::MachineConfig;

/// Lifecycle state of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Created,
    Starting,
    Started,
    Stopping,
    Stopped,
    Destroying,
    Destroyed,
}

impl MachineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineState::Created => "created",
            MachineState::Starting => "starting",
            MachineState::Started => "started",
            MachineState::Stopping => "stopping",
            MachineState::Stopped => "stopped",
            MachineState::Destroying => "destroying",
            MachineState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A machine as the fleet reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,

    #[serde(default)]
    pub name: String,

    pub state: MachineState,

    #[serde(default)]
    pub config: MachineConfig,

    /// Top-level check statuses. Service-level checks are not reported here;
    /// the health-wait phase only ever sees this aggregate.
    #[serde(default)]
    pub checks: Vec<CheckStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_nonce: Option<LeaseId>,
}

impl Machine {
    /// Display form used in status tables and progress lines.
    pub fn formatted_id(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{} ({})", self.id, self.name)
        }
    }

    /// Aggregate the reported top-level checks into a passing/total pair.
    pub fn top_level_checks(&self) -> HealthStatus {
        let passing = self
            .checks
            .iter()
            .filter(|c| c.status == CheckState::Passing)
            .count() as u32;

        HealthStatus {
            passing,
            total: self.checks.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_with_checks(statuses: &[CheckState]) -> Machine {
        Machine {
            id: MachineId::new("e28650dd"),
            name: "worker-1".to_string(),
            state: MachineState::Started,
            config: MachineConfig::default(),
            checks: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| CheckStatus {
                    name: format!("check-{i}"),
                    status: *s,
                    output: None,
                })
                .collect(),
            lease_nonce: None,
        }
    }

    #[test]
    fn top_level_checks_counts_passing_only() {
        let m = machine_with_checks(&[
            CheckState::Passing,
            CheckState::Critical,
            CheckState::Passing,
        ]);
        assert_eq!(m.top_level_checks(), HealthStatus { passing: 2, total: 3 });
    }

    #[test]
    fn formatted_id_includes_name_when_present() {
        let mut m = machine_with_checks(&[]);
        assert_eq!(m.formatted_id(), "e28650dd (worker-1)");
        m.name.clear();
        assert_eq!(m.formatted_id(), "e28650dd");
    }

    #[test]
    fn state_parses_from_wire_form() {
        let state: MachineState = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(state, MachineState::Stopped);
        assert_eq!(state.to_string(), "stopped");
    }
}
