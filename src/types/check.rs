// ABOUTME: Health check definitions and reported check statuses.
// ABOUTME: Distinguishes configured checks from the fleet's runtime verdicts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A machine-level health check definition.
///
/// Checks attached to a service may leave `port` and `kind` unset, in which
/// case they inherit the service's internal port and protocol when promoted
/// to a top-level check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, with = "humantime_serde::option")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,

    #[serde(default, with = "humantime_serde::option")]
    pub grace_period: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_skip_tls_verify: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_headers: Option<BTreeMap<String, String>>,
}

/// Runtime verdict of a single check, as reported by the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Passing,
    Warning,
    Critical,
}

/// One check's reported status on a machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStatus {
    pub name: String,
    pub status: CheckState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Aggregate of a machine's top-level checks.
///
/// `total == 0` means the fleet has not sampled the machine yet; callers
/// must not treat it as healthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub passing: u32,
    pub total: u32,
}

impl HealthStatus {
    /// True once every check has been sampled and passes.
    pub fn all_passing(&self) -> bool {
        self.total != 0 && self.passing == self.total
    }
}
