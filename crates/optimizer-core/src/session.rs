//! The session controller: one operator's selections, variables, and run.
//!
//! [`SessionController`] serialises every state transition through a
//! single async mutex. After each mutation it republishes a fresh
//! [`SessionSnapshot`] (gates recomputed from scratch) on a `watch`
//! channel and streams fine-grained [`SessionEvent`]s on a `broadcast`
//! channel.
//!
//! A started run is driven by a spawned task that sleeps for the tick
//! interval, polls the backend's [`ProgressSource`], and applies the
//! result under the lock. The driver re-checks its stop signal after
//! taking the lock, so nothing is applied once a run has been cancelled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use optimizer_types::{
    BoundField, FileHandle, RunConfiguration, RunId, RunStatus, SessionEvent, SessionSnapshot,
    Simulator, VariableSet, VariableSetError, VariableSetKind,
};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ProgressSource, RunRequest, SimulatorBackend, SyntheticBackend};
use crate::config::{OptimizerConfig, RunnerConfig};
use crate::control::{RunHandle, StopSignal};
use crate::gate::{self, GateViolation, RunGateInputs};
use crate::loader::{ConfigurationLoader, LoadError, LoadedVariables, SyntheticSource};
use crate::runner::{RunError, SimulationRunner, TickOutcome};

/// Capacity of the session event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Errors that can occur while assembling a controller from configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The synthetic variable lists are ill-formed.
    #[error("invalid synthetic variables: {source}")]
    Variables {
        /// The underlying load error.
        #[from]
        source: LoadError,
    },

    /// The synthetic backend settings are unusable.
    #[error("invalid synthetic backend: {source}")]
    Backend {
        /// The underlying backend error.
        #[from]
        source: BackendError,
    },

    /// The runner settings are unusable.
    #[error("invalid runner configuration: {message}")]
    Runner {
        /// Description of the problem.
        message: String,
    },
}

/// Mutable session state, only ever touched under the lock.
#[derive(Debug)]
struct Session {
    selection: RunConfiguration,
    configured: bool,
    design: VariableSet,
    test: VariableSet,
    runner: SimulationRunner,
}

impl Session {
    fn run_gate(&self) -> RunGateInputs<'_> {
        RunGateInputs {
            configured: self.configured,
            run_in_progress: self.runner.is_running(),
            design: &self.design,
            test: &self.test,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            configured: self.configured,
            circuit_file: self.selection.circuit_file.clone(),
            preconfig_file: self.selection.preconfig_file.clone(),
            simulator: self.selection.simulator,
            design_variables: self.design.clone(),
            test_variables: self.test.clone(),
            can_load: gate::can_load(&self.selection),
            can_run: gate::can_run(&self.run_gate()),
            run: self.runner.snapshot(),
        }
    }

    const fn variables_mut(&mut self, kind: VariableSetKind) -> &mut VariableSet {
        match kind {
            VariableSetKind::Design => &mut self.design,
            VariableSetKind::Test => &mut self.test,
        }
    }
}

/// State shared between the controller and its run drivers.
#[derive(Debug)]
struct Shared {
    state: Mutex<Session>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn publish(&self, session: &Session) {
        self.snapshots.send_replace(session.snapshot());
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Emit the log lines appended since `log_before` and a status event
    /// if the status moved away from `status_before`.
    fn emit_run_changes(&self, session: &Session, log_before: usize, status_before: RunStatus) {
        let run = session.runner.run();
        let Some(run_id) = run.id else {
            return;
        };
        for entry in run.log.iter().skip(log_before) {
            self.emit(SessionEvent::Log {
                run_id,
                entry: entry.clone(),
            });
        }
        if run.status != status_before {
            self.emit(SessionEvent::Status {
                run_id,
                status: run.status,
            });
        }
    }

    /// Cancel the active run, if any, and announce it.
    fn cancel_locked(&self, session: &mut Session) -> bool {
        let log_before = session.runner.run().log.len();
        if !session.runner.cancel(Utc::now()) {
            return false;
        }
        self.emit_run_changes(session, log_before, RunStatus::Running);
        self.emit(SessionEvent::info(
            "Simulation Cancelled",
            "The simulation run was cancelled.",
        ));
        true
    }

    /// Replace the loaded variables, cancelling any active run first.
    fn install_locked(&self, session: &mut Session, variables: LoadedVariables) {
        if self.cancel_locked(session) {
            info!("Active run cancelled by configuration load");
        }
        session.runner.reset();
        session.design = variables.design;
        session.test = variables.test;
        session.configured = true;
        self.publish(session);
    }
}

/// The single-operator control surface.
///
/// Dropping the controller cancels any active run.
pub struct SessionController {
    shared: Arc<Shared>,
    loader: ConfigurationLoader,
    backend: Arc<dyn SimulatorBackend>,
    tick_interval: Duration,
    shutdown: Arc<StopSignal>,
}

impl SessionController {
    /// Create a controller from its parts.
    pub fn new(
        loader: ConfigurationLoader,
        backend: Arc<dyn SimulatorBackend>,
        runner: &RunnerConfig,
    ) -> Self {
        let session = Session {
            selection: RunConfiguration::default(),
            configured: false,
            design: VariableSet::empty(),
            test: VariableSet::empty(),
            runner: SimulationRunner::new(runner.max_ticks),
        };
        let (snapshots, _) = watch::channel(session.snapshot());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(session),
                snapshots,
                events,
            }),
            loader,
            backend,
            tick_interval: Duration::from_millis(runner.tick_interval_ms),
            shutdown: Arc::new(StopSignal::new()),
        }
    }

    /// Create a controller backed by the synthetic source and backend.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the `synthetic` section is unusable or
    /// `runner.tick_interval_ms` is zero.
    pub fn from_config(config: &OptimizerConfig) -> Result<Self, SetupError> {
        if config.runner.tick_interval_ms == 0 {
            return Err(SetupError::Runner {
                message: "tick_interval_ms must be at least 1".to_owned(),
            });
        }
        let source = SyntheticSource::from_config(&config.synthetic)?;
        let backend = SyntheticBackend::new(&config.synthetic)?;
        Ok(Self::new(
            ConfigurationLoader::synthetic(source),
            Arc::new(backend),
            &config.runner,
        ))
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// The latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Subscribe to session events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Select or clear the circuit file.
    pub async fn select_circuit_file(&self, file: Option<FileHandle>) -> SessionSnapshot {
        self.update_selection(|selection| selection.circuit_file = file)
            .await
    }

    /// Select or clear the preconfiguration file.
    pub async fn select_preconfig_file(&self, file: Option<FileHandle>) -> SessionSnapshot {
        self.update_selection(|selection| selection.preconfig_file = file)
            .await
    }

    /// Select or clear the simulator.
    pub async fn select_simulator(&self, simulator: Option<Simulator>) -> SessionSnapshot {
        self.update_selection(|selection| selection.simulator = simulator)
            .await
    }

    async fn update_selection(
        &self,
        apply: impl FnOnce(&mut RunConfiguration),
    ) -> SessionSnapshot {
        let mut session = self.shared.state.lock().await;
        apply(&mut session.selection);
        debug!(selection = ?session.selection, "Selection updated");
        self.shared.publish(&session);
        session.snapshot()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load variables for the current selection.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::GateNotSatisfied`] if a circuit file or the
    /// simulator is missing, or any error from the variable source. The
    /// session is unchanged on error.
    pub async fn load_configuration(&self) -> Result<SessionSnapshot, LoadError> {
        let mut session = self.shared.state.lock().await;
        let variables = match self.loader.load(&session.selection) {
            Ok(variables) => variables,
            Err(e) => {
                let notice = match &e {
                    LoadError::GateNotSatisfied { .. } => SessionEvent::error(
                        "Missing Inputs",
                        "Please select a simulator and upload a circuit file.",
                    ),
                    other => SessionEvent::error("Load Failed", other.to_string()),
                };
                self.shared.emit(notice);
                return Err(e);
            }
        };
        self.shared.install_locked(&mut session, variables);
        self.shared.emit(SessionEvent::info(
            "Configuration Loaded",
            loaded_description(&session.selection),
        ));
        Ok(session.snapshot())
    }

    /// Load the fixed development data set, bypassing the load gate.
    pub async fn load_synthetic(&self) -> SessionSnapshot {
        let mut session = self.shared.state.lock().await;
        let variables = self.loader.load_synthetic();
        self.shared.install_locked(&mut session, variables);
        self.shared.emit(SessionEvent::info(
            "Bypassed Load",
            "Loaded dummy data for development.",
        ));
        session.snapshot()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Replace one bound of one variable.
    ///
    /// Reversed or cleared bounds are accepted; they close the run gate
    /// until fixed.
    ///
    /// # Errors
    ///
    /// Returns [`VariableSetError::IndexOutOfRange`] if `index` does not
    /// address a variable in `set`.
    pub async fn set_bound(
        &self,
        set: VariableSetKind,
        index: usize,
        field: BoundField,
        value: Option<f64>,
    ) -> Result<SessionSnapshot, VariableSetError> {
        let mut session = self.shared.state.lock().await;
        session.variables_mut(set).set_bound(index, field, value)?;
        debug!(%set, index, ?field, ?value, "Variable bound updated");
        self.shared.publish(&session);
        Ok(session.snapshot())
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Start a run and return its handle. The run proceeds in the
    /// background; observe it through [`subscribe`](Self::subscribe) or
    /// [`events`](Self::events).
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ShuttingDown`] after [`shutdown`](Self::shutdown),
    /// [`RunError::AlreadyRunning`] if a run is active,
    /// [`RunError::GateNotSatisfied`] if the run gate is closed, or
    /// [`RunError::Backend`] if the backend refuses the run.
    pub async fn start_run(&self) -> Result<RunHandle, RunError> {
        let mut session = self.shared.state.lock().await;
        if self.shutdown.is_stop_requested() {
            return Err(RunError::ShuttingDown);
        }
        if session.runner.is_running() {
            self.shared.emit(SessionEvent::error(
                "Simulation Running",
                "A simulation is already in progress.",
            ));
            return Err(RunError::AlreadyRunning);
        }
        let violations = gate::check_run(&session.run_gate());
        if !violations.is_empty() {
            self.shared.emit(SessionEvent::error(
                "Validation Error",
                rejection_description(&violations),
            ));
            return Err(RunError::GateNotSatisfied { violations });
        }

        let run_id = RunId::new();
        let request = RunRequest {
            run_id,
            simulator: session.selection.simulator,
            design_variables: session.design.clone(),
            test_variables: session.test.clone(),
        };
        let source = match self.backend.submit_run(&request) {
            Ok(source) => source,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Backend refused run");
                self.shared
                    .emit(SessionEvent::error("Simulation Failed", e.to_string()));
                return Err(e.into());
            }
        };

        let control = Arc::new(StopSignal::new());
        session
            .runner
            .start(run_id, request.simulator, Arc::clone(&control), Utc::now())?;
        self.shared
            .emit_run_changes(&session, 0, RunStatus::Idle);
        self.shared.publish(&session);
        drop(session);

        tokio::spawn(drive_run(
            Arc::clone(&self.shared),
            Arc::clone(&self.shutdown),
            Arc::clone(&control),
            run_id,
            source,
            self.tick_interval,
        ));
        Ok(RunHandle::new(run_id, control))
    }

    /// Cancel the active run.
    ///
    /// Returns `false` if no run was in progress.
    pub async fn cancel_run(&self) -> bool {
        let mut session = self.shared.state.lock().await;
        let cancelled = self.shared.cancel_locked(&mut session);
        if cancelled {
            self.shared.publish(&session);
        }
        cancelled
    }

    /// Cancel any active run and stop every run driver.
    pub async fn shutdown(&self) {
        self.shutdown.request_stop();
        if self.cancel_run().await {
            info!("Active run cancelled on shutdown");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown.request_stop();
    }
}

impl core::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionController")
            .field("loader", &self.loader)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

/// Tick loop for one run.
async fn drive_run(
    shared: Arc<Shared>,
    shutdown: Arc<StopSignal>,
    control: Arc<StopSignal>,
    run_id: RunId,
    mut source: Box<dyn ProgressSource>,
    interval: Duration,
) {
    debug!(run_id = %run_id, interval_ms = interval.as_millis(), "Run driver started");
    loop {
        let stopped = tokio::select! {
            () = control.stopped() => true,
            () = shutdown.stopped() => true,
            () = tokio::time::sleep(interval) => false,
        };

        let event = if stopped { None } else { Some(source.next_tick()) };

        let mut session = shared.state.lock().await;
        if !session.runner.is_current(run_id) || !session.runner.is_running() {
            debug!(run_id = %run_id, "Run no longer active, driver exiting");
            return;
        }
        let event = match event {
            Some(event) if !control.is_stop_requested() && !shutdown.is_stop_requested() => event,
            _ => {
                shared.cancel_locked(&mut session);
                shared.publish(&session);
                return;
            }
        };

        let log_before = session.runner.run().log.len();
        let now = Utc::now();
        let outcome = match event {
            Ok(event) => session.runner.apply(event, now),
            Err(e) => {
                session.runner.fail(e.to_string(), now);
                TickOutcome::Failed
            }
        };
        let run = session.runner.run();
        shared.emit(SessionEvent::Progress {
            run_id,
            progress: run.progress,
        });
        shared.emit_run_changes(&session, log_before, RunStatus::Running);
        shared.publish(&session);

        match outcome {
            TickOutcome::Advanced => {}
            TickOutcome::Completed => {
                shared.emit(SessionEvent::info(
                    "Simulation Complete",
                    "The simulation run has finished.",
                ));
                return;
            }
            TickOutcome::Failed => {
                let reason = session
                    .runner
                    .run()
                    .failure
                    .clone()
                    .unwrap_or_default();
                shared.emit(SessionEvent::error("Simulation Failed", reason));
                return;
            }
            TickOutcome::Ignored => return,
        }
    }
}

/// Notice text for a successful gated load.
fn loaded_description(selection: &RunConfiguration) -> String {
    let circuit = selection
        .circuit_file
        .as_ref()
        .map_or("circuit", |f| f.name.as_str());
    match &selection.preconfig_file {
        Some(preconfig) => format!("Loaded {circuit} with {}.", preconfig.name),
        None => format!("Loaded {circuit}."),
    }
}

/// Notice text for a rejected run start.
fn rejection_description(violations: &[GateViolation]) -> String {
    if violations
        .iter()
        .any(|v| matches!(v, GateViolation::InvalidRanges { .. }))
    {
        "Please ensure all min/max values are valid before running.".to_owned()
    } else {
        "Please load a configuration before running.".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use optimizer_types::NoticeLevel;

    use super::*;
    use crate::backend::ProgressEvent;
    use crate::config::SyntheticConfig;
    use crate::runner::{CANCELLED_MESSAGE, COMPLETED_MESSAGE};

    fn config(max_ticks: u64) -> OptimizerConfig {
        OptimizerConfig {
            runner: RunnerConfig {
                tick_interval_ms: 800,
                max_ticks,
            },
            synthetic: SyntheticConfig {
                seed: Some(11),
                ..SyntheticConfig::default()
            },
            ..OptimizerConfig::default()
        }
    }

    fn controller() -> SessionController {
        SessionController::from_config(&config(0)).unwrap()
    }

    /// Backend replaying a fixed script, then idling at zero progress.
    struct ScriptedBackend {
        script: StdMutex<Option<VecDeque<Result<ProgressEvent, BackendError>>>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<ProgressEvent, BackendError>>) -> Self {
            Self {
                script: StdMutex::new(Some(script.into())),
            }
        }
    }

    struct ScriptedSource(VecDeque<Result<ProgressEvent, BackendError>>);

    impl ProgressSource for ScriptedSource {
        fn next_tick(&mut self) -> Result<ProgressEvent, BackendError> {
            self.0.pop_front().unwrap_or_else(|| {
                Ok(ProgressEvent::Advance {
                    progress_delta: 0.0,
                    log_line: "waiting".to_owned(),
                })
            })
        }
    }

    impl SimulatorBackend for ScriptedBackend {
        fn submit_run(
            &self,
            request: &RunRequest,
        ) -> Result<Box<dyn ProgressSource>, BackendError> {
            match self.script.lock().unwrap().take() {
                Some(script) => Ok(Box::new(ScriptedSource(script))),
                None => Err(BackendError::Rejected {
                    run_id: request.run_id,
                    message: "script already used".to_owned(),
                }),
            }
        }
    }

    fn scripted(
        max_ticks: u64,
        script: Vec<Result<ProgressEvent, BackendError>>,
    ) -> SessionController {
        let source = SyntheticSource::from_config(&SyntheticConfig::default()).unwrap();
        SessionController::new(
            ConfigurationLoader::synthetic(source),
            Arc::new(ScriptedBackend::new(script)),
            &RunnerConfig {
                tick_interval_ms: 800,
                max_ticks,
            },
        )
    }

    async fn wait_terminal(controller: &SessionController) -> SessionSnapshot {
        controller
            .subscribe()
            .wait_for(|s| s.run.status.is_terminal())
            .await
            .unwrap()
            .clone()
    }

    fn drain_notices(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<(NoticeLevel, String)> {
        let mut notices = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Notice { level, title, .. } = event {
                notices.push((level, title));
            }
        }
        notices
    }

    #[tokio::test]
    async fn fresh_session_has_both_gates_closed() {
        let snapshot = controller().snapshot();
        assert!(!snapshot.configured);
        assert!(!snapshot.can_load);
        assert!(!snapshot.can_run);
        assert_eq!(snapshot.run.status, RunStatus::Idle);
    }

    #[tokio::test]
    async fn selecting_inputs_opens_the_load_gate() {
        let controller = controller();
        controller
            .select_circuit_file(Some(FileHandle::new("amp.ocn")))
            .await;
        assert!(!controller.snapshot().can_load);
        let snapshot = controller.select_simulator(Some(Simulator::Cadence)).await;
        assert!(snapshot.can_load);
        assert_eq!(controller.snapshot(), snapshot);
        let snapshot = controller.select_circuit_file(None).await;
        assert!(!snapshot.can_load);
    }

    #[tokio::test]
    async fn gated_load_without_inputs_reports_missing_inputs() {
        let controller = controller();
        let mut events = controller.events();
        let err = controller.load_configuration().await.unwrap_err();
        assert!(matches!(err, LoadError::GateNotSatisfied { .. }));
        assert!(!controller.snapshot().configured);
        assert_eq!(
            drain_notices(&mut events),
            vec![(NoticeLevel::Error, "Missing Inputs".to_owned())]
        );
    }

    #[tokio::test]
    async fn gated_load_names_the_loaded_files() {
        let controller = controller();
        let mut events = controller.events();
        controller
            .select_circuit_file(Some(FileHandle::new("amp.ocn")))
            .await;
        controller
            .select_preconfig_file(Some(FileHandle::new("amp.yaml")))
            .await;
        controller.select_simulator(Some(Simulator::Mathcad)).await;

        let snapshot = controller.load_configuration().await.unwrap();

        assert!(snapshot.configured);
        assert!(snapshot.can_run);
        let Ok(SessionEvent::Notice { description, .. }) = events.try_recv() else {
            panic!("expected a notice");
        };
        assert_eq!(description, "Loaded amp.ocn with amp.yaml.");
    }

    #[tokio::test]
    async fn bypass_load_configures_with_valid_variables() {
        let controller = controller();
        let mut events = controller.events();
        let snapshot = controller.load_synthetic().await;
        assert!(snapshot.configured);
        assert!(!snapshot.design_variables.is_empty());
        assert!(!snapshot.test_variables.is_empty());
        assert!(snapshot.can_run);
        assert!(!snapshot.can_load);
        assert_eq!(
            drain_notices(&mut events),
            vec![(NoticeLevel::Info, "Bypassed Load".to_owned())]
        );
    }

    #[tokio::test]
    async fn reversed_bound_closes_and_reopens_the_run_gate() {
        let controller = controller();
        controller.load_synthetic().await;

        let snapshot = controller
            .set_bound(VariableSetKind::Design, 0, BoundField::Min, Some(5.0))
            .await
            .unwrap();
        assert!(!snapshot.can_run);
        assert_eq!(snapshot.design_variables.get(0).unwrap().min, Some(5.0));

        let mut events = controller.events();
        let err = controller.start_run().await.unwrap_err();
        assert!(matches!(err, RunError::GateNotSatisfied { .. }));
        assert_eq!(
            drain_notices(&mut events),
            vec![(NoticeLevel::Error, "Validation Error".to_owned())]
        );

        let snapshot = controller
            .set_bound(VariableSetKind::Design, 0, BoundField::Min, Some(0.8))
            .await
            .unwrap();
        assert!(snapshot.can_run);
    }

    #[tokio::test]
    async fn out_of_range_edit_is_rejected() {
        let controller = controller();
        controller.load_synthetic().await;
        let err = controller
            .set_bound(VariableSetKind::Test, 9, BoundField::Max, Some(1.0))
            .await
            .unwrap_err();
        assert_eq!(err, VariableSetError::IndexOutOfRange { index: 9, len: 2 });
    }

    #[tokio::test]
    async fn start_before_load_is_rejected() {
        let err = controller().start_run().await.unwrap_err();
        let RunError::GateNotSatisfied { violations } = err else {
            panic!("expected gate failure, got {err:?}");
        };
        assert_eq!(violations, vec![GateViolation::NotConfigured]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_to_completion() {
        let controller = controller();
        controller.select_simulator(Some(Simulator::Cadence)).await;
        controller.load_synthetic().await;
        let mut events = controller.events();

        let handle = controller.start_run().await.unwrap();
        let running = controller.snapshot();
        assert_eq!(running.run.status, RunStatus::Running);
        assert!(!running.can_run);
        assert_eq!(running.run.log[0].message, "Simulation started with Cadence...");

        let done = wait_terminal(&controller).await;

        assert_eq!(done.run.id, Some(handle.run_id()));
        assert_eq!(done.run.status, RunStatus::Completed);
        assert_eq!(done.run.progress, 100.0);
        assert_eq!(done.run.log.last().unwrap().message, COMPLETED_MESSAGE);
        let completions = done
            .run
            .log
            .iter()
            .filter(|e| e.message == COMPLETED_MESSAGE)
            .count();
        assert_eq!(completions, 1);
        assert!(done.can_run);

        // Let the driver publish its final notice.
        tokio::task::yield_now().await;
        assert!(
            drain_notices(&mut events)
                .contains(&(NoticeLevel::Info, "Simulation Complete".to_owned()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_running_is_rejected() {
        let controller = controller();
        controller.load_synthetic().await;
        let handle = controller.start_run().await.unwrap();
        let mut events = controller.events();

        let err = controller.start_run().await.unwrap_err();

        assert!(matches!(err, RunError::AlreadyRunning));
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.run.id, Some(handle.run_id()));
        assert_eq!(snapshot.run.status, RunStatus::Running);
        assert_eq!(
            drain_notices(&mut events),
            vec![(NoticeLevel::Error, "Simulation Running".to_owned())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_further_ticks() {
        let controller = scripted(0, Vec::new());
        controller.load_synthetic().await;
        controller.start_run().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_700)).await;
        assert_eq!(controller.snapshot().run.ticks, 2);

        assert!(controller.cancel_run().await);
        let cancelled = controller.snapshot();
        assert_eq!(cancelled.run.status, RunStatus::Cancelled);
        assert_eq!(cancelled.run.log.last().unwrap().message, CANCELLED_MESSAGE);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.snapshot().run, cancelled.run);
        assert!(!controller.cancel_run().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_with_nothing_running_is_a_no_op() {
        let controller = controller();
        assert!(!controller.cancel_run().await);
        controller.load_synthetic().await;
        assert!(!controller.cancel_run().await);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_cancel_is_applied_by_the_driver() {
        let controller = scripted(0, Vec::new());
        controller.load_synthetic().await;
        let handle = controller.start_run().await.unwrap();

        assert!(handle.cancel());
        let done = wait_terminal(&controller).await;

        assert_eq!(done.run.status, RunStatus::Cancelled);
        assert_eq!(done.run.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_controller_cancels_the_run() {
        let controller = scripted(0, Vec::new());
        controller.load_synthetic().await;
        controller.start_run().await.unwrap();
        let mut snapshots = controller.subscribe();

        drop(controller);

        let done = snapshots
            .wait_for(|s| s.run.status.is_terminal())
            .await
            .unwrap();
        assert_eq!(done.run.status, RunStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_the_run() {
        let controller = scripted(0, Vec::new());
        controller.load_synthetic().await;
        controller.start_run().await.unwrap();
        controller.shutdown().await;
        assert_eq!(controller.snapshot().run.status, RunStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_shutdown_is_refused() {
        let controller = controller();
        controller.load_synthetic().await;
        controller.shutdown().await;
        let before = controller.snapshot();

        let err = controller.start_run().await.unwrap_err();

        assert!(matches!(err, RunError::ShuttingDown));
        assert_eq!(controller.snapshot(), before);
        assert_eq!(before.run.status, RunStatus::Idle);
        assert!(before.run.log.is_empty());
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let mut config = config(0);
        config.runner.tick_interval_ms = 0;
        let err = SessionController::from_config(&config).unwrap_err();
        assert!(matches!(err, SetupError::Runner { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_cancel_after_completion_changes_nothing() {
        let controller = scripted(0, vec![Ok(ProgressEvent::Complete)]);
        controller.load_synthetic().await;
        let handle = controller.start_run().await.unwrap();
        let done = wait_terminal(&controller).await;

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(controller.snapshot().run, done.run);
        assert_eq!(done.run.status, RunStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn unfinished_run_times_out() {
        let controller = scripted(3, Vec::new());
        controller.load_synthetic().await;
        controller.start_run().await.unwrap();

        let done = wait_terminal(&controller).await;

        assert_eq!(done.run.status, RunStatus::Failed);
        assert_eq!(done.run.ticks, 3);
        assert_eq!(done.run.failure.as_deref(), Some("timed out after 3 ticks"));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_error_fails_the_run() {
        let controller = scripted(
            0,
            vec![
                Ok(ProgressEvent::Advance {
                    progress_delta: 40.0,
                    log_line: "corner 1".to_owned(),
                }),
                Err(BackendError::Internal {
                    message: "connection reset".to_owned(),
                }),
            ],
        );
        controller.load_synthetic().await;
        controller.start_run().await.unwrap();

        let done = wait_terminal(&controller).await;

        assert_eq!(done.run.status, RunStatus::Failed);
        assert_eq!(done.run.progress, 40.0);
        assert_eq!(
            done.run.log.last().unwrap().message,
            "Simulation failed: backend error: connection reset"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn backend_completion_ends_the_run_early() {
        let controller = scripted(0, vec![Ok(ProgressEvent::Complete)]);
        controller.load_synthetic().await;
        controller.start_run().await.unwrap();

        let done = wait_terminal(&controller).await;

        assert_eq!(done.run.status, RunStatus::Completed);
        assert_eq!(done.run.progress, 100.0);
    }

    #[tokio::test]
    async fn refused_submission_keeps_the_previous_run() {
        let controller = scripted(0, Vec::new());
        controller.load_synthetic().await;
        // The scripted backend accepts exactly one run.
        controller.start_run().await.unwrap();
        controller.cancel_run().await;

        let err = controller.start_run().await.unwrap_err();

        assert!(matches!(err, RunError::Backend { .. }));
        assert_eq!(controller.snapshot().run.status, RunStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_during_a_run_cancels_it_and_resets() {
        let controller = scripted(0, Vec::new());
        controller.load_synthetic().await;
        let handle = controller.start_run().await.unwrap();
        tokio::time::sleep(Duration::from_millis(900)).await;

        let snapshot = controller.load_synthetic().await;

        assert!(handle.is_cancelled());
        assert_eq!(snapshot.run.status, RunStatus::Idle);
        assert!(snapshot.run.log.is_empty());
        assert!(snapshot.can_run);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.snapshot().run.status, RunStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn run_events_are_streamed_in_order() {
        let controller = scripted(
            0,
            vec![
                Ok(ProgressEvent::Advance {
                    progress_delta: 60.0,
                    log_line: "corner 0".to_owned(),
                }),
                Ok(ProgressEvent::Advance {
                    progress_delta: 60.0,
                    log_line: "corner 1".to_owned(),
                }),
            ],
        );
        controller.load_synthetic().await;
        let mut events = controller.events();
        controller.start_run().await.unwrap();
        wait_terminal(&controller).await;
        tokio::task::yield_now().await;

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                SessionEvent::Notice { title, .. } => format!("notice:{title}"),
                SessionEvent::Log { entry, .. } => format!("log:{}", entry.message),
                SessionEvent::Progress { progress, .. } => format!("progress:{progress}"),
                SessionEvent::Status { status, .. } => format!("status:{status:?}"),
            });
        }
        assert_eq!(
            kinds,
            vec![
                "log:Simulation started with no simulator...",
                "status:Running",
                "progress:60",
                "log:corner 0",
                "progress:100",
                "log:Simulation finished successfully.",
                "status:Completed",
                "notice:Simulation Complete",
            ]
        );
    }
}
