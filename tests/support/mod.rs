// ABOUTME: Shared test fixtures: an in-memory fleet and entry builders.
// ABOUTME: The mock records every call so tests can assert phase ordering.

// each test binary uses a different subset of these fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use flotilla::deploy::{BlueGreen, DeployOptions, MachineUpdateEntry};
use flotilla::fleet::{DesiredState, FleetApi, FleetError, PlatformApi};
use flotilla::output::{ColorScheme, Output};
use flotilla::types::{
    AppName, CheckState, CheckStatus, GENERATION_TAG_KEY, LaunchSpec, LeaseId, Machine,
    MachineCheck, MachineConfig, MachineId, MachineState,
};

/// In-memory fleet. Launched green machines get ids `grn-1`, `grn-2`, ...
/// in launch order.
#[derive(Default)]
pub struct MockFleet {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    launched: Vec<(MachineId, LaunchSpec)>,
    calls: Vec<String>,
    destroyed: Vec<String>,
    uncordoned: Vec<String>,
    cordoned: Vec<String>,
    stopped: Vec<String>,
    released: Vec<String>,
    /// Per-id destroy behavior: positive = fail that many times then
    /// succeed, negative = fail forever.
    destroy_failures: BTreeMap<String, i32>,
    wait_stop_failures: BTreeSet<String>,
    never_healthy: BTreeSet<String>,
    hang_start_waits: bool,
}

impl MockFleet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_destroy(&self, id: &str, times: i32) {
        self.inner
            .lock()
            .destroy_failures
            .insert(id.to_string(), times);
    }

    pub fn fail_wait_stop(&self, id: &str) {
        self.inner.lock().wait_stop_failures.insert(id.to_string());
    }

    pub fn never_healthy(&self, id: &str) {
        self.inner.lock().never_healthy.insert(id.to_string());
    }

    pub fn hang_start_waits(&self) {
        self.inner.lock().hang_start_waits = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.inner.lock().destroyed.clone()
    }

    pub fn uncordoned(&self) -> Vec<String> {
        self.inner.lock().uncordoned.clone()
    }

    pub fn cordoned(&self) -> Vec<String> {
        self.inner.lock().cordoned.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.inner.lock().stopped.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.inner.lock().released.clone()
    }

    pub fn launched_specs(&self) -> Vec<LaunchSpec> {
        self.inner
            .lock()
            .launched
            .iter()
            .map(|(_, spec)| spec.clone())
            .collect()
    }
}

fn remote_error(message: &str) -> FleetError {
    FleetError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[async_trait]
impl FleetApi for MockFleet {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Machine, FleetError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = MachineId::new(format!("grn-{}", inner.next_id));
        inner.calls.push(format!("launch {id}"));
        inner.launched.push((id.clone(), spec.clone()));

        Ok(Machine {
            id: id.clone(),
            name: String::new(),
            state: MachineState::Created,
            config: spec.config.clone(),
            checks: Vec::new(),
            lease_nonce: Some(LeaseId::new(format!("lease-{id}"))),
        })
    }

    async fn get(&self, id: &MachineId) -> Result<Machine, FleetError> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("get {id}"));

        let config = inner
            .launched
            .iter()
            .find(|(launched_id, _)| launched_id == id)
            .map(|(_, spec)| spec.config.clone())
            .unwrap_or_default();

        let verdict = if inner.never_healthy.contains(id.as_str()) {
            CheckState::Critical
        } else {
            CheckState::Passing
        };
        let checks = config
            .checks
            .keys()
            .map(|name| CheckStatus {
                name: name.clone(),
                status: verdict,
                output: None,
            })
            .collect();

        Ok(Machine {
            id: id.clone(),
            name: String::new(),
            state: MachineState::Started,
            config,
            checks,
            lease_nonce: None,
        })
    }

    async fn list_machines(&self, _app: &AppName) -> Result<Vec<Machine>, FleetError> {
        Ok(Vec::new())
    }

    async fn uncordon(&self, id: &MachineId, _reason: &str) -> Result<(), FleetError> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("uncordon {id}"));
        inner.uncordoned.push(id.to_string());
        Ok(())
    }

    async fn cordon(&self, id: &MachineId) -> Result<(), FleetError> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("cordon {id}"));
        inner.cordoned.push(id.to_string());
        Ok(())
    }

    async fn stop(&self, id: &MachineId, _signal: &str) -> Result<(), FleetError> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("stop {id}"));
        inner.stopped.push(id.to_string());
        Ok(())
    }

    async fn destroy(&self, id: &MachineId, force: bool) -> Result<(), FleetError> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("destroy {id} force={force}"));

        if let Some(remaining) = inner.destroy_failures.get_mut(id.as_str()) {
            if *remaining != 0 {
                if *remaining > 0 {
                    *remaining -= 1;
                }
                return Err(remote_error("machine is locked"));
            }
        }

        inner.destroyed.push(id.to_string());
        Ok(())
    }

    async fn wait_for_state(
        &self,
        id: &MachineId,
        desired: DesiredState,
        _timeout: Duration,
    ) -> Result<(), FleetError> {
        let hang = {
            let mut inner = self.inner.lock();
            inner.calls.push(format!("wait_{desired} {id}"));

            match desired {
                DesiredState::Start => inner.hang_start_waits,
                DesiredState::Stop => {
                    if inner.wait_stop_failures.contains(id.as_str()) {
                        return Err(remote_error("machine refuses to stop"));
                    }
                    false
                }
            }
        };

        if hang {
            // effectively forever; tests abort long before this fires
            tokio::time::sleep(Duration::from_secs(10_000_000)).await;
        }
        Ok(())
    }

    async fn release_lease(&self, id: &MachineId) -> Result<(), FleetError> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("release_lease {id}"));
        inner.released.push(id.to_string());
        Ok(())
    }
}

pub struct MockPlatform {
    pub allowed: bool,
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn can_perform_bluegreen_deployment(&self, _app: &AppName) -> Result<bool, FleetError> {
        Ok(self.allowed)
    }
}

/// A machine whose config carries one top-level check, optionally tagged.
pub fn machine(id: &str, tag: Option<&str>) -> Machine {
    let mut config = MachineConfig {
        image: "registry.example.net/app:v2".to_string(),
        ..Default::default()
    };
    config.checks.insert(
        "bluegreen_tcp".to_string(),
        MachineCheck {
            port: Some(80),
            kind: Some("tcp".to_string()),
            interval: Some(Duration::from_secs(1)),
            grace_period: Some(Duration::from_secs(1)),
            ..Default::default()
        },
    );
    if let Some(tag) = tag {
        config
            .metadata
            .insert(GENERATION_TAG_KEY.to_string(), tag.to_string());
    }

    Machine {
        id: MachineId::new(id),
        name: String::new(),
        state: MachineState::Started,
        config,
        checks: Vec::new(),
        lease_nonce: None,
    }
}

/// A machine with no services and no checks configured.
pub fn machine_without_checks(id: &str) -> Machine {
    let mut m = machine(id, None);
    m.config.checks.clear();
    m
}

pub fn entry(machine: Machine) -> MachineUpdateEntry {
    MachineUpdateEntry::for_redeploy(machine)
}

/// Output that swallows everything; rendering is exercised elsewhere.
pub fn quiet_output() -> Output {
    Output::with_writer(Box::new(io::sink()), ColorScheme::new(false))
}

pub fn deployment(
    fleet: Arc<MockFleet>,
    blue: Vec<MachineUpdateEntry>,
) -> BlueGreen<MockFleet, MockPlatform> {
    deployment_with_policy(fleet, blue, true)
}

pub fn deployment_with_policy(
    fleet: Arc<MockFleet>,
    blue: Vec<MachineUpdateEntry>,
    allowed: bool,
) -> BlueGreen<MockFleet, MockPlatform> {
    BlueGreen::new(
        fleet,
        MockPlatform { allowed },
        AppName::new("my-app").expect("valid app name"),
        blue,
        quiet_output(),
        DeployOptions {
            timeout: Duration::from_secs(60),
            stop_signal: "SIGINT".to_string(),
        },
    )
}

/// Index of the first call starting with `prefix`.
pub fn first_call(calls: &[String], prefix: &str) -> Option<usize> {
    calls.iter().position(|c| c.starts_with(prefix))
}

/// Index of the last call starting with `prefix`.
pub fn last_call(calls: &[String], prefix: &str) -> Option<usize> {
    calls.iter().rposition(|c| c.starts_with(prefix))
}
