// ABOUTME: The blue-green orchestrator: phases, abort handling, rollback.
// ABOUTME: Brings up a green generation, swaps traffic, retires blue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};

use crate::fleet::{DesiredState, FleetApi, FleetError, PlatformApi};
use crate::output::Output;
use crate::types::{
    AppName, GenerationTag, HealthStatus, LaunchSpec, Machine, MachineId, MachineState,
};

use super::abort::AbortChannel;
use super::checks;
use super::error::{DeployError, DeployErrorKind};
use super::tracker::{StatusRenderer, Tracker};
use super::zombies;

/// Cadence of the foreground render loop in the wait phases.
const RENDER_INTERVAL: Duration = Duration::from_millis(90);
/// Pause between creating greens and polling their state; lets the fleet's
/// bookkeeping catch up before we hammer the wait endpoint.
const CREATE_SETTLE: Duration = Duration::from_millis(300);
/// How long the edge proxy gets to observe a routing change before the next
/// phase acts on it.
const PROXY_GRACE: Duration = Duration::from_secs(10);

/// One machine scheduled for replacement: the existing blue machine plus
/// the launch spec of its successor.
#[derive(Debug, Clone)]
pub struct MachineUpdateEntry {
    pub machine: Machine,
    pub launch_spec: LaunchSpec,
}

impl MachineUpdateEntry {
    /// Entry that relaunches a machine with its current config.
    pub fn for_redeploy(machine: Machine) -> Self {
        let launch_spec = LaunchSpec {
            id: Some(machine.id.clone()),
            config: machine.config.clone(),
            ..Default::default()
        };
        Self {
            machine,
            launch_spec,
        }
    }

    fn formatted_id(&self) -> String {
        self.machine.formatted_id()
    }
}

/// Tunables recognized on a deployment.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Per-wait deadline; applies independently to the start-wait and the
    /// health-wait.
    pub timeout: Duration,
    /// Signal delivered to blue machines in the stop phase.
    pub stop_signal: String,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            stop_signal: "SIGINT".to_string(),
        }
    }
}

/// A single blue-green deployment in flight.
///
/// Holds both generations, the abort channel, and the status tables'
/// output sink. Construct one per deployment and discard it afterwards;
/// nothing here survives a process restart.
pub struct BlueGreen<F, P> {
    fleet: Arc<F>,
    platform: P,
    app: AppName,
    blue: Vec<MachineUpdateEntry>,
    green: Vec<MachineUpdateEntry>,
    output: Output,
    timeout: Duration,
    stop_signal: String,
    abort: AbortChannel,
    hanging_blue: Vec<MachineId>,
    timestamp: GenerationTag,
}

impl<F, P> BlueGreen<F, P>
where
    F: FleetApi + 'static,
    P: PlatformApi,
{
    pub fn new(
        fleet: Arc<F>,
        platform: P,
        app: AppName,
        blue: Vec<MachineUpdateEntry>,
        output: Output,
        options: DeployOptions,
    ) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Self {
            fleet,
            platform,
            app,
            blue,
            green: Vec::new(),
            output,
            timeout: options.timeout,
            stop_signal: options.stop_signal,
            abort: AbortChannel::new(),
            hanging_blue: Vec::new(),
            timestamp: GenerationTag::from(now),
        }
    }

    /// Handle for wiring cancellation (Ctrl+C, tests) into this deployment.
    pub fn abort_channel(&self) -> AbortChannel {
        self.abort.clone()
    }

    pub fn timestamp(&self) -> GenerationTag {
        self.timestamp
    }

    pub fn blue_machines(&self) -> &[MachineUpdateEntry] {
        &self.blue
    }

    pub fn green_machines(&self) -> &[MachineUpdateEntry] {
        &self.green
    }

    /// Blue machines whose destroy failed; they need manual cleanup.
    pub fn hanging_blue_machines(&self) -> &[MachineId] {
        &self.hanging_blue
    }

    /// Run the full deployment. Returns on the first fatal phase error;
    /// callers decide whether to [`BlueGreen::rollback`].
    pub async fn deploy(&mut self) -> Result<(), DeployError> {
        let result = self.run_phases().await;
        self.release_green_leases().await;
        result
    }

    async fn run_phases(&mut self) -> Result<(), DeployError> {
        if self.abort.is_aborted() {
            return Err(DeployError::Aborted);
        }

        if !self
            .platform
            .can_perform_bluegreen_deployment(&self.app)
            .await?
        {
            return Err(DeployError::OrgLimit);
        }

        self.output.heading("Cleanup previous deployment");
        self.delete_zombies_from_previous_deployment().await?;

        checks::propagate_service_checks(&mut self.blue);
        self.validate_checks()?;

        self.output.heading("Creating green machines");
        self.create_green_machines()
            .await
            .map_err(|e| DeployError::CreateGreenMachines(Box::new(e)))?;

        if self.abort.is_aborted() {
            return Err(DeployError::Aborted);
        }

        sleep(CREATE_SETTLE).await;

        self.output.heading("Waiting for all green machines to start");
        self.wait_for_green_machines_started()
            .await
            .map_err(|e| DeployError::WaitForStartedState(Box::new(e)))?;

        if self.abort.is_aborted() {
            return Err(DeployError::Aborted);
        }

        self.output
            .heading("Waiting for all green machines to be healthy");
        self.wait_for_green_machines_healthy()
            .await
            .map_err(|e| DeployError::WaitForHealthy(Box::new(e)))?;

        if self.abort.is_aborted() {
            return Err(DeployError::Aborted);
        }

        self.output.heading("Marking green machines as ready");
        self.mark_green_machines_ready()
            .await
            .map_err(|e| DeployError::MarkReadyForTraffic(Box::new(e)))?;

        if self.abort.is_aborted() {
            return Err(DeployError::Aborted);
        }

        // Let the edge proxy pick up the freshly uncordoned greens before
        // taking routes away from blue.
        self.output
            .heading("Waiting before cordoning all blue machines");
        if self.abort.sleep_abortable(PROXY_GRACE).await {
            return Err(DeployError::Aborted);
        }

        self.cordon_blue_machines()
            .await
            .map_err(|e| DeployError::CordonBlueMachines(Box::new(e)))?;

        if self.abort.is_aborted() {
            return Err(DeployError::Aborted);
        }

        // And let it drain the now-cordoned blues from its routing table.
        self.output
            .heading("Waiting before stopping all blue machines");
        if self.abort.sleep_abortable(PROXY_GRACE).await {
            return Err(DeployError::Aborted);
        }

        self.output.heading("Stopping all blue machines");
        self.stop_blue_machines()
            .await
            .map_err(|e| DeployError::StopBlueMachines(Box::new(e)))?;

        self.output.heading("Waiting for all blue machines to stop");
        if let Err(err) = self.wait_for_blue_machines_stopped().await {
            match err {
                DeployError::StopIncomplete { errors } => {
                    // Not fatal: force-destroy follows either way.
                    self.output.heading("Failed to stop some machines:");
                    for error in &errors {
                        self.output.line(&format!("  {error}"));
                    }
                    tracing::warn!(
                        failures = errors.len(),
                        "destroying blue machines despite stop failures"
                    );
                }
                other => return Err(DeployError::WaitForStoppedState(Box::new(other))),
            }
        }

        self.output.heading("Destroying all blue machines");
        self.destroy_blue_machines()
            .await
            .map_err(|e| DeployError::DestroyBlueMachines(Box::new(e)))?;

        self.output.heading("Deployment complete");
        Ok(())
    }

    /// Undo a failed deployment.
    ///
    /// If the destroy phase failed, blue is already stopped and nothing can
    /// be revived; report the hanging machines for manual cleanup. In every
    /// other case traffic never moved, so removing the greens restores the
    /// prior state.
    pub async fn rollback(&self, err: &DeployError) -> Result<(), DeployError> {
        if err.kind() == DeployErrorKind::DestroyBlueMachines {
            let ids: Vec<String> = self.hanging_blue.iter().map(|id| id.to_string()).collect();
            self.output
                .heading(&format!("Failed to destroy blue machines ({})", ids.join(",")));
            self.output
                .line("Remove them manually with `flotilla machines destroy --force <id>`");
            return Ok(());
        }

        for entry in &self.green {
            if entry.launch_spec.skip_launch {
                continue;
            }
            self.fleet.destroy(&entry.machine.id, true).await?;
        }

        Ok(())
    }

    /// Destroy machines left behind by a previous deployment that created
    /// its greens but never cleaned up, then drop them from the blue list.
    async fn delete_zombies_from_previous_deployment(&mut self) -> Result<(), DeployError> {
        let tags = zombies::normalize_tags(&mut self.blue)?;

        if tags.len() <= 1 {
            self.output
                .line("  No hanging machines from a failed previous deployment");
            return Ok(());
        }

        let zombie_tags = zombies::zombie_tags(&tags);
        let colors = self.output.colors();

        for entry in &self.blue {
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            let tag = GenerationTag::from_metadata(&entry.launch_spec.config.metadata)?;
            if !zombie_tags.contains(&tag) {
                continue;
            }

            zombies::destroy_with_retry(self.fleet.as_ref(), &entry.machine.id).await?;
            self.output.line(&format!(
                "  Zombie machine {} destroyed [{}]",
                colors.bold(&entry.formatted_id()),
                tag
            ));
        }

        self.blue.retain(|entry| {
            GenerationTag::from_metadata(&entry.launch_spec.config.metadata)
                .map(|tag| !zombie_tags.contains(&tag))
                .unwrap_or(true)
        });

        Ok(())
    }

    /// Every machine must end up with at least one top-level check, or the
    /// health-wait phase would have nothing to verify.
    fn validate_checks(&self) -> Result<(), DeployError> {
        let mut with_checks = 0;

        for entry in &self.blue {
            if entry.launch_spec.config.checks.is_empty() {
                self.output.line(&format!(
                    "  [WARN] Machine {} has no health checks; its health will not be verified",
                    entry.formatted_id()
                ));
                continue;
            }
            with_checks += 1;
        }

        if with_checks == 0 && !self.blue.is_empty() {
            self.output
                .line("At least one health check is required for blue-green deployments");
            return Err(DeployError::Validation);
        }

        Ok(())
    }

    /// Launch the green generation, one machine per blue entry.
    ///
    /// Sequential on purpose: the fleet is the bottleneck, and ordered
    /// launches keep the log readable. Greens launch unregistered and
    /// stamped with this deployment's generation tag. `skip_launch` entries
    /// join the green list as-is; their machine already runs the desired
    /// config.
    async fn create_green_machines(&mut self) -> Result<(), DeployError> {
        let colors = self.output.colors();

        for entry in &self.blue {
            if entry.launch_spec.skip_launch {
                self.green.push(entry.clone());
                continue;
            }

            let mut spec = entry.launch_spec.clone();
            spec.skip_service_registration = true;
            self.timestamp.store(&mut spec.config.metadata);

            let machine = self.fleet.launch(&spec).await?;
            self.output.line(&format!(
                "  Created machine {}",
                colors.bold(&machine.formatted_id())
            ));

            self.green.push(MachineUpdateEntry {
                machine,
                launch_spec: spec,
            });
        }

        Ok(())
    }

    async fn wait_for_green_machines_started(&self) -> Result<(), DeployError> {
        let tracker: Tracker<MachineState> = Tracker::new();
        for entry in &self.green {
            let state = if entry.launch_spec.skip_launch {
                MachineState::Started
            } else {
                MachineState::Created
            };
            tracker.set(entry.formatted_id(), state);
        }

        let waiters: Vec<&MachineUpdateEntry> = self
            .green
            .iter()
            .filter(|e| !e.launch_spec.skip_launch)
            .collect();
        let (err_tx, mut err_rx) = mpsc::channel::<FleetError>(waiters.len().max(1));

        for entry in waiters {
            let fleet = Arc::clone(&self.fleet);
            let id = entry.machine.id.clone();
            let fid = entry.formatted_id();
            let tracker = tracker.clone();
            let err_tx = err_tx.clone();
            let timeout = self.timeout;

            tokio::spawn(async move {
                match fleet.wait_for_state(&id, DesiredState::Start, timeout).await {
                    Ok(()) => tracker.set(fid, MachineState::Started),
                    Err(err) => {
                        let _ = err_tx.send(err).await;
                    }
                }
            });
        }
        drop(err_tx);

        let mut renderer = StatusRenderer::new(tracker.clone(), &self.output);
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);
        let mut tick = tokio::time::interval(RENDER_INTERVAL);

        loop {
            if tracker.all(|state| *state == MachineState::Started) {
                return Ok(());
            }
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            tokio::select! {
                _ = &mut deadline => return Err(DeployError::WaitTimeout),
                _ = self.abort.aborted() => {}
                Some(err) = err_rx.recv() => return Err(err.into()),
                _ = tick.tick() => renderer.render(),
            }
        }
    }

    async fn wait_for_green_machines_healthy(&self) -> Result<(), DeployError> {
        // Machines without checks run background work; a started state is
        // all the verification they get, so they contribute no table entry.
        let pollers: Vec<&MachineUpdateEntry> = self
            .green
            .iter()
            .filter(|e| !e.launch_spec.skip_launch && !e.launch_spec.config.checks.is_empty())
            .collect();

        let tracker: Tracker<HealthStatus> = Tracker::new();
        for entry in &pollers {
            tracker.set(entry.formatted_id(), HealthStatus::default());
        }

        let (err_tx, mut err_rx) = mpsc::channel::<FleetError>(pollers.len().max(1));

        for entry in pollers {
            let fleet = Arc::clone(&self.fleet);
            let id = entry.machine.id.clone();
            let fid = entry.formatted_id();
            let tracker = tracker.clone();
            let err_tx = err_tx.clone();
            let timeout = self.timeout;
            let (interval, grace) = entry.launch_spec.config.min_check_cadence();

            tokio::spawn(async move {
                sleep(grace).await;
                let deadline = Instant::now() + timeout;

                loop {
                    if Instant::now() >= deadline {
                        let _ = err_tx
                            .send(FleetError::WaitTimeout {
                                id: id.clone(),
                                state: "healthy".to_string(),
                            })
                            .await;
                        return;
                    }

                    match fleet.get(&id).await {
                        Ok(machine) => {
                            let status = machine.top_level_checks();
                            tracker.set(fid.as_str(), status);
                            if status.all_passing() {
                                return;
                            }
                        }
                        Err(err) => {
                            let _ = err_tx.send(err).await;
                            return;
                        }
                    }

                    sleep(interval).await;
                }
            });
        }
        drop(err_tx);

        let mut renderer = StatusRenderer::new(tracker.clone(), &self.output);
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);
        let mut tick = tokio::time::interval(RENDER_INTERVAL);

        loop {
            if tracker.all(HealthStatus::all_passing) {
                return Ok(());
            }
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            tokio::select! {
                _ = &mut deadline => return Err(DeployError::WaitTimeout),
                _ = self.abort.aborted() => {}
                Some(err) = err_rx.recv() => return Err(err.into()),
                _ = tick.tick() => renderer.render(),
            }
        }
    }

    /// Uncordon the whole green generation. First failure is fatal: a
    /// partially uncordoned generation must not proceed to blue teardown.
    async fn mark_green_machines_ready(&self) -> Result<(), DeployError> {
        let colors = self.output.colors();

        for entry in &self.green {
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            self.fleet.uncordon(&entry.machine.id, "").await?;
            self.output.line(&format!(
                "  Machine {} now ready",
                colors.bold(&entry.formatted_id())
            ));
        }

        Ok(())
    }

    /// Best-effort cordon of the blue generation. Failures are reported and
    /// swallowed; the stop that follows makes the routing entry moot.
    async fn cordon_blue_machines(&self) -> Result<(), DeployError> {
        let colors = self.output.colors();

        for entry in &self.blue {
            if entry.launch_spec.skip_launch {
                continue;
            }
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            let fid = entry.formatted_id();
            match self.fleet.cordon(&entry.machine.id).await {
                Ok(()) => {
                    self.output
                        .line(&format!("  Machine {} cordoned", colors.bold(&fid)));
                }
                Err(err) => {
                    tracing::warn!(machine = %entry.machine.id, error = %err, "cordon failed");
                    self.output.line(&format!(
                        "  Failed to cordon machine {}: {err}",
                        colors.bold(&fid)
                    ));
                }
            }
        }

        Ok(())
    }

    /// Signal the blue generation to shut down gracefully. Failures are
    /// reported and swallowed; the force-destroy that follows is the
    /// backstop.
    async fn stop_blue_machines(&self) -> Result<(), DeployError> {
        let colors = self.output.colors();

        for entry in &self.blue {
            if entry.launch_spec.skip_launch {
                continue;
            }
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            if let Err(err) = self.fleet.stop(&entry.machine.id, &self.stop_signal).await {
                tracing::warn!(machine = %entry.machine.id, error = %err, "stop failed");
                self.output.line(&format!(
                    "  Failed to stop machine {}: {err}",
                    colors.bold(&entry.formatted_id())
                ));
            }
        }

        Ok(())
    }

    /// Wait for every blue machine to reach `stopped`, accumulating
    /// per-machine failures instead of failing fast: whatever refuses to
    /// stop gets force-destroyed next anyway.
    async fn wait_for_blue_machines_stopped(&self) -> Result<(), DeployError> {
        let targets: Vec<&MachineUpdateEntry> = self
            .blue
            .iter()
            .filter(|e| !e.launch_spec.skip_launch)
            .collect();

        let tracker: Tracker<MachineState> = Tracker::new();
        for entry in &targets {
            tracker.set(entry.formatted_id(), entry.machine.state);
        }

        let total = targets.len();
        let done = Arc::new(AtomicUsize::new(0));
        let (err_tx, mut err_rx) = mpsc::channel::<String>(total.max(1));

        for entry in targets {
            let fleet = Arc::clone(&self.fleet);
            let id = entry.machine.id.clone();
            let fid = entry.formatted_id();
            let tracker = tracker.clone();
            let err_tx = err_tx.clone();
            let done = Arc::clone(&done);
            let timeout = self.timeout;

            tokio::spawn(async move {
                match fleet.wait_for_state(&id, DesiredState::Stop, timeout).await {
                    Ok(()) => tracker.set(fid.as_str(), MachineState::Stopped),
                    Err(err) => {
                        let _ = err_tx
                            .send(format!("failed to stop machine {fid}: {err}"))
                            .await;
                    }
                }
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(err_tx);

        let mut errors = Vec::new();
        let mut renderer = StatusRenderer::new(tracker.clone(), &self.output);
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);
        let mut tick = tokio::time::interval(RENDER_INTERVAL);

        loop {
            if done.load(Ordering::SeqCst) == total {
                if errors.is_empty() {
                    return Ok(());
                }
                return Err(DeployError::StopIncomplete { errors });
            }
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            tokio::select! {
                _ = &mut deadline => return Err(DeployError::WaitTimeout),
                _ = self.abort.aborted() => {}
                Some(message) = err_rx.recv() => errors.push(message),
                _ = tick.tick() => renderer.render(),
            }
        }
    }

    /// Force-destroy the blue generation. Machines that refuse are recorded
    /// as hanging and reported; the phase fails if any accumulated.
    async fn destroy_blue_machines(&mut self) -> Result<(), DeployError> {
        let colors = self.output.colors();
        let mut failed = 0;

        for entry in &self.blue {
            if entry.launch_spec.skip_launch {
                continue;
            }
            if self.abort.is_aborted() {
                return Err(DeployError::Aborted);
            }

            match self.fleet.destroy(&entry.machine.id, true).await {
                Ok(()) => {
                    self.output.line(&format!(
                        "  Machine {} destroyed",
                        colors.bold(&entry.formatted_id())
                    ));
                }
                Err(err) => {
                    tracing::warn!(machine = %entry.machine.id, error = %err, "destroy failed");
                    self.hanging_blue.push(entry.machine.id.clone());
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(DeployError::DestroyIncomplete { count: failed });
        }
        Ok(())
    }

    /// Leases acquired at green launch are held for the whole deployment;
    /// give them back no matter how the run ended.
    async fn release_green_leases(&self) {
        for entry in &self.green {
            if entry.launch_spec.skip_launch {
                continue;
            }
            if let Err(err) = self.fleet.release_lease(&entry.machine.id).await {
                tracing::warn!(machine = %entry.machine.id, error = %err, "lease release failed");
            }
        }
    }
}
