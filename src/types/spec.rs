// ABOUTME: Launch specification types: the desired config for a machine.
// ABOUTME: What the fleet's launch endpoint consumes, service defs included.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::check::MachineCheck;
use super::id::MachineId;

/// Poll cadence floor when a check omits its interval.
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);
/// Settle time floor when a check omits its grace period.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// A network service exposed by a machine, with its service-level checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub protocol: String,
    pub internal_port: u16,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<MachineCheck>,
}

/// Full desired configuration of a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceConfig>,

    /// Top-level checks, keyed by name. The health-wait phase only observes
    /// these; service checks must be promoted before launch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, MachineCheck>,
}

impl MachineConfig {
    /// Smallest configured check interval and grace period, falling back to
    /// the defaults for checks that leave them unset.
    ///
    /// The health poller sleeps the grace period once, then polls at the
    /// interval, so the minimums across checks bound how stale a verdict
    /// can be.
    pub fn min_check_cadence(&self) -> (Duration, Duration) {
        let mut interval = DEFAULT_CHECK_INTERVAL;
        let mut grace = DEFAULT_GRACE_PERIOD;

        for check in self.checks.values() {
            if let Some(i) = check.interval {
                interval = interval.min(i);
            }
            if let Some(g) = check.grace_period {
                grace = grace.min(g);
            }
        }

        (interval, grace)
    }
}

/// Input to the fleet's launch endpoint: the replacement for one machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Identity of the machine this spec replaces, when updating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MachineId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Entry needs no replacement; the existing machine is left untouched.
    #[serde(default)]
    pub skip_launch: bool,

    /// Launch without registering the machine with the edge proxy. Every
    /// green machine is created this way; traffic arrives only after an
    /// explicit uncordon.
    #[serde(default)]
    pub skip_service_registration: bool,

    #[serde(default)]
    pub config: MachineConfig,
}
