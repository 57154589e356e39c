//! Scenario Engine
//!
//! Owns the participants, the clock and the listeners, and runs the step
//! cycle:
//!
//! ```text
//! step():
//! 0. Reject a nested call, or any call once stopped
//! 1. Honour a pending stop (finish, fire `finished`, return)
//! 2. Advance time (held on the first pass after construction / restart)
//! 3. Decision phase   - every participant
//! 4. Movement phase   - alive participants
//! 5. Detection phase  - alive participants
//! 6. Register participants created during the step
//! 7. Remove participants destroyed during the step
//! 8. Fire `stepped(time)`
//! ```
//!
//! # Fault handling
//!
//! A participant callback that returns an error is logged and recorded in
//! the step's [`StepReport`]; the remaining participants and phases still
//! run. A stepped listener that returns an error is logged and counted; the
//! remaining listeners are still notified.
//!
//! # Example
//!
//! ```rust
//! use scenario_engine_core::{ScenarioConfig, ScenarioEngine, StepOutcome};
//!
//! let config = ScenarioConfig {
//!     start_time: 100,
//!     scenario_step_ms: 1000,
//!     ..Default::default()
//! };
//! let mut engine = ScenarioEngine::new(config).unwrap();
//!
//! engine.step().unwrap(); // first pass: time holds at 100
//! engine.step().unwrap();
//! assert_eq!(engine.time(), 1100);
//!
//! engine.stop("done");
//! let outcome = engine.step().unwrap();
//! assert!(matches!(outcome, StepOutcome::Finished { .. }));
//! ```

use super::config::ScenarioConfig;
use super::context::ScenarioContext;
use crate::core::clock::{ScenarioClock, SimTime};
use crate::driver::{ManualTimer, StepTimer};
use crate::factory::ParticipantFactory;
use crate::listeners::{
    ListenerSet, ParticipantChange, ParticipantsChangedListener, RunningListener, SteppedListener,
};
use crate::models::participant::{BehaviorError, Participant, ParticipantId, Phase, Visibility};
use crate::models::pending::PendingMutationQueue;
use crate::models::registry::ParticipantRegistry;
use crate::rng::RngManager;
use std::cell::Ref;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Types
// ============================================================================

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed or restarted, not auto-stepping
    Idle,
    /// Auto-stepping
    Running,
    /// Auto-stepping paused, not stopped
    Paused,
    /// A stop has been honoured; only `restart` leaves this state
    Stopped,
}

/// Scenario error types
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid scenario step size: {0} ms (must be > 0)")]
    InvalidStepSize(i64),

    #[error("Unknown participant type: {0}")]
    UnknownParticipantType(String),

    #[error("Scenario is stopped; restart it before stepping or starting")]
    Stopped,

    #[error("A step is already in progress")]
    StepInProgress,

    #[error("Auto-step driver error: {0}")]
    Driver(#[source] std::io::Error),

    #[error("Failed to read config: {0}")]
    ConfigIo(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// A participant callback that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantFault {
    pub id: ParticipantId,
    pub phase: Phase,
    pub error: BehaviorError,
}

/// Result of a step that ran its cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Simulated time before the step
    pub old_time: SimTime,

    /// Simulated time after the step
    pub time: SimTime,

    /// Participants registered at the end of the step
    pub created: Vec<ParticipantId>,

    /// Participants removed at the end of the step
    pub destroyed: Vec<ParticipantId>,

    /// Participant callbacks that returned an error
    pub faults: Vec<ParticipantFault>,

    /// Number of stepped listeners that returned an error
    pub listener_faults: usize,
}

/// What a call to [`ScenarioEngine::step`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step cycle ran
    Stepped(StepReport),

    /// A pending stop was honoured instead of stepping
    Finished { elapsed: Duration, reason: String },
}

impl StepOutcome {
    /// True if this call honoured a stop
    pub fn is_finished(&self) -> bool {
        matches!(self, StepOutcome::Finished { .. })
    }

    /// The step report, if the cycle ran
    pub fn report(&self) -> Option<&StepReport> {
        match self {
            StepOutcome::Stepped(report) => Some(report),
            StepOutcome::Finished { .. } => None,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Turn-based scenario stepping engine
///
/// # Determinism
///
/// Participants are visited in ascending id order and all engine randomness
/// comes from one seeded xorshift64* generator, reseeded on `start()` when a
/// seed is set. Same seed + same participants = identical runs.
pub struct ScenarioEngine {
    name: String,
    case_id: String,

    /// Simulated time and step settings
    clock: ScenarioClock,

    state: EngineState,

    /// Set by `stop`, honoured at the start of the next step
    stop_reason: Option<String>,

    seed: Option<u64>,
    rng: RngManager,

    registry: ParticipantRegistry,
    pending: PendingMutationQueue,
    factory: ParticipantFactory,

    /// Auto-step driver
    timer: Box<dyn StepTimer>,

    /// Wall-clock time of the last `start()`
    run_started: Option<Instant>,

    /// Set for the whole of `step()`, listener fan-out included
    in_step: bool,

    stepped_listeners: ListenerSet<dyn SteppedListener>,
    running_listeners: ListenerSet<dyn RunningListener>,
    participant_listeners: ListenerSet<dyn ParticipantsChangedListener>,
}

impl ScenarioEngine {
    /// Create an engine that only steps when `step()` is called
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        Self::with_timer(config, Box::new(ManualTimer::new()))
    }

    /// Create an engine driven by `timer` once started
    pub fn with_timer(
        config: ScenarioConfig,
        mut timer: Box<dyn StepTimer>,
    ) -> Result<Self, ScenarioError> {
        config.validate()?;

        let mut clock = ScenarioClock::new(config.start_time, config.scenario_step_ms);
        clock.set_step_delay(config.step_delay_ms);
        timer.set_delay(clock.step_delay_duration());

        let rng = match config.seed {
            Some(seed) => RngManager::new(seed),
            None => RngManager::from_entropy(),
        };

        let case_id = config
            .case_id
            .unwrap_or_else(|| format!("Case_{}", RngManager::from_entropy().range(0, 2000)));

        Ok(Self {
            name: config.name.unwrap_or_else(|| "Scenario".to_string()),
            case_id,
            clock,
            state: EngineState::Idle,
            stop_reason: None,
            seed: config.seed,
            rng,
            registry: ParticipantRegistry::new(),
            pending: PendingMutationQueue::new(),
            factory: ParticipantFactory::new(),
            timer,
            run_started: None,
            in_step: false,
            stepped_listeners: ListenerSet::new(),
            running_listeners: ListenerSet::new(),
            participant_listeners: ListenerSet::new(),
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start auto-stepping
    ///
    /// Does nothing if the driver is already armed. Otherwise reseeds the
    /// RNG (when a seed is set), notes the wall-clock start, arms the driver
    /// with the current step delay and fires `started`.
    pub fn start(&mut self) -> Result<(), ScenarioError> {
        if self.state == EngineState::Stopped {
            return Err(ScenarioError::Stopped);
        }
        if self.timer.is_armed() {
            debug!(scenario = %self.name, "start ignored, already auto-stepping");
            return Ok(());
        }

        if let Some(seed) = self.seed {
            self.rng.reseed(seed);
        }
        self.run_started = Some(Instant::now());
        self.timer.arm(self.clock.step_delay_duration());
        self.state = EngineState::Running;

        info!(
            scenario = %self.name,
            case = %self.case_id,
            delay_ms = self.clock.step_delay(),
            "scenario started"
        );
        for listener in self.running_listeners.snapshot() {
            listener.started();
        }
        Ok(())
    }

    /// Halt auto-stepping without finishing the scenario
    pub fn pause(&mut self) {
        self.timer.disarm();
        if self.state != EngineState::Stopped {
            self.state = EngineState::Paused;
        }

        debug!(scenario = %self.name, time = self.clock.time(), "scenario paused");
        for listener in self.running_listeners.snapshot() {
            listener.paused();
        }
    }

    /// Ask the scenario to stop
    ///
    /// Nothing halts until the next `step()`, which finishes the scenario
    /// instead of stepping. A later call before then replaces the reason.
    /// Ignored once the scenario has finished; `finished` fires once per run.
    pub fn stop(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.state == EngineState::Stopped {
            debug!(scenario = %self.name, reason = %reason, "stop ignored, already stopped");
            return;
        }
        debug!(scenario = %self.name, reason = %reason, "stop requested");
        self.stop_reason = Some(reason);
    }

    /// Move the scenario through a single step
    ///
    /// Returns `Err(ScenarioError::Stopped)` if the scenario has finished and
    /// not been restarted, and `Err(ScenarioError::StepInProgress)` when
    /// called from a listener while a step is still running.
    pub fn step(&mut self) -> Result<StepOutcome, ScenarioError> {
        if self.in_step {
            warn!(scenario = %self.name, "nested step rejected, a step is in progress");
            return Err(ScenarioError::StepInProgress);
        }
        if self.state == EngineState::Stopped {
            return Err(ScenarioError::Stopped);
        }

        self.in_step = true;
        let outcome = match self.stop_reason.take() {
            Some(reason) => self.finish(reason),
            None => StepOutcome::Stepped(self.run_step()),
        };
        self.in_step = false;
        Ok(outcome)
    }

    fn run_step(&mut self) -> StepReport {
        let (old_time, new_time) = self.clock.advance();
        let mut faults = Vec::new();

        {
            let Self {
                registry,
                pending,
                stop_reason,
                rng,
                clock,
                ..
            } = self;
            let registry: &ParticipantRegistry = registry;
            let ids = registry.ids();
            let mut ctx = ScenarioContext::new(
                registry,
                pending,
                stop_reason,
                rng,
                new_time,
                clock.scenario_step(),
            );

            for phase in [Phase::Decision, Phase::Movement, Phase::Detection] {
                run_phase(registry, &ids, phase, old_time, new_time, &mut ctx, &mut faults);
            }
        }

        let created = self.pending.drain_creates_into(&mut self.registry);
        for id in &created {
            self.fire_participant_changed(*id, ParticipantChange::Added);
        }

        let destroyed = self.pending.drain_destroys_into(&mut self.registry);
        for id in &destroyed {
            self.fire_participant_changed(*id, ParticipantChange::Removed);
        }

        let listener_faults = self.fire_stepped(new_time);

        debug!(
            time = new_time,
            participants = self.registry.len(),
            created = created.len(),
            destroyed = destroyed.len(),
            faults = faults.len(),
            "scenario stepped"
        );

        StepReport {
            old_time,
            time: new_time,
            created,
            destroyed,
            faults,
            listener_faults,
        }
    }

    /// Return the scenario to its start time
    ///
    /// Clears any pending stop, re-arms the first-pass time hold, restarts
    /// every participant, then tells the participants-changed, running and
    /// stepped listeners (in that order). Participant restart failures are
    /// logged and returned.
    pub fn restart(&mut self) -> Vec<ParticipantFault> {
        self.clock.reset();
        self.stop_reason = None;
        self.state = if self.timer.is_armed() {
            EngineState::Running
        } else {
            EngineState::Idle
        };

        let mut faults = Vec::new();
        {
            let Self {
                registry,
                pending,
                stop_reason,
                rng,
                clock,
                ..
            } = self;
            let registry: &ParticipantRegistry = registry;
            let ids = registry.ids();
            let time = clock.time();
            let mut ctx = ScenarioContext::new(
                registry,
                pending,
                stop_reason,
                rng,
                time,
                clock.scenario_step(),
            );
            run_phase(registry, &ids, Phase::Restart, time, time, &mut ctx, &mut faults);
        }

        for listener in self.participant_listeners.snapshot() {
            listener.restart(self);
        }
        for listener in self.running_listeners.snapshot() {
            listener.restart(self);
        }
        for listener in self.stepped_listeners.snapshot() {
            listener.restart(self);
        }

        info!(scenario = %self.name, time = self.clock.time(), "scenario restarted");
        faults
    }

    fn finish(&mut self, reason: String) -> StepOutcome {
        self.timer.disarm();
        self.state = EngineState::Stopped;

        let elapsed = self
            .run_started
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default();

        info!(
            scenario = %self.name,
            reason = %reason,
            elapsed_ms = elapsed.as_millis() as u64,
            "scenario stopped"
        );
        for listener in self.running_listeners.snapshot() {
            listener.finished(elapsed, &reason);
        }

        StepOutcome::Finished { elapsed, reason }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// True while the auto-step driver is armed
    pub fn is_running(&self) -> bool {
        self.timer.is_armed()
    }

    /// True if a stop is waiting for the next step
    pub fn stop_pending(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Current simulated time (millis)
    pub fn time(&self) -> SimTime {
        self.clock.time()
    }

    /// Set the current time and the time `restart` returns to (millis)
    pub fn set_time(&mut self, time: SimTime) {
        self.clock.set_time(time);
    }

    /// Time `restart` returns to (millis)
    pub fn start_time(&self) -> SimTime {
        self.clock.start_time()
    }

    /// The scenario clock
    pub fn clock(&self) -> &ScenarioClock {
        &self.clock
    }

    /// Simulated millis per step
    pub fn scenario_step_time(&self) -> i64 {
        self.clock.scenario_step()
    }

    /// Set the simulated millis per step and fire `new_scenario_step_time`
    pub fn set_scenario_step_time(&mut self, step_ms: i64) -> Result<(), ScenarioError> {
        if step_ms <= 0 {
            return Err(ScenarioError::InvalidStepSize(step_ms));
        }
        self.clock.set_scenario_step(step_ms);

        for listener in self.running_listeners.snapshot() {
            listener.new_scenario_step_time(step_ms);
        }
        Ok(())
    }

    /// Set the simulated time per step
    pub fn set_scenario_step_duration(&mut self, step: Duration) -> Result<(), ScenarioError> {
        let step_ms = i64::try_from(step.as_millis()).unwrap_or(i64::MAX);
        self.set_scenario_step_time(step_ms)
    }

    /// Wall-clock millis between auto-steps (0 = run flat out)
    pub fn step_time(&self) -> u64 {
        self.clock.step_delay()
    }

    /// Set the wall-clock millis between auto-steps and fire `new_step_time`
    pub fn set_step_time(&mut self, delay_ms: u64) {
        self.clock.set_step_delay(delay_ms);
        self.timer.set_delay(self.clock.step_delay_duration());

        for listener in self.running_listeners.snapshot() {
            listener.new_step_time(delay_ms);
        }
    }

    /// Set the wall-clock delay between auto-steps
    pub fn set_step_duration(&mut self, delay: Duration) {
        self.set_step_time(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the scenario name and fire `name_changed`
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();

        for listener in self.running_listeners.snapshot() {
            listener.name_changed(&self.name);
        }
    }

    /// Case id (which permutation of a generated batch this run is)
    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    /// Set the case id
    pub fn set_case_id(&mut self, case_id: impl Into<String>) {
        self.case_id = case_id.into();
    }

    /// Seed applied on `start()`, if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Set (or clear) the seed applied on `start()`
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    /// The scenario's RNG
    pub fn rng(&mut self) -> &mut RngManager {
        &mut self.rng
    }

    // ========================================================================
    // Participants
    // ========================================================================

    /// Add a visible participant
    ///
    /// Pass `ParticipantId::UNASSIGNED` to have an id generated. Returns the
    /// final id. A duplicate id replaces the earlier participant (logged).
    pub fn add_participant(
        &mut self,
        id: ParticipantId,
        participant: Box<dyn Participant>,
    ) -> ParticipantId {
        self.admit(id, participant, Visibility::Visible)
    }

    /// Add a Monte Carlo participant (stepped, but not in the visible view)
    pub fn add_monte_carlo_participant(
        &mut self,
        id: ParticipantId,
        participant: Box<dyn Participant>,
    ) -> ParticipantId {
        self.admit(id, participant, Visibility::Invisible)
    }

    fn admit(
        &mut self,
        id: ParticipantId,
        participant: Box<dyn Participant>,
        visibility: Visibility,
    ) -> ParticipantId {
        let registered = self.registry.add(id, participant, visibility);
        self.fire_participant_changed(registered.id, ParticipantChange::Added);
        registered.id
    }

    /// Remove a participant now
    ///
    /// Unknown ids are ignored and fire nothing.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Box<dyn Participant>> {
        let removed = self.registry.remove(id)?;
        self.fire_participant_changed(id, ParticipantChange::Removed);
        Some(removed)
    }

    /// Remove every participant, notifying for each
    pub fn clear_participants(&mut self) {
        for id in self.registry.ids() {
            self.remove_participant(id);
        }
    }

    /// Queue a visible participant to join at the next step boundary
    pub fn create_participant(&mut self, participant: Box<dyn Participant>) {
        self.pending.enqueue_create(participant, Visibility::Visible);
    }

    /// Queue a Monte Carlo participant to join at the next step boundary
    pub fn create_monte_carlo_participant(&mut self, participant: Box<dyn Participant>) {
        self.pending.enqueue_create(participant, Visibility::Invisible);
    }

    /// Queue a participant to leave at the next step boundary
    pub fn destroy_participant(&mut self, id: ParticipantId) {
        self.pending.enqueue_destroy(id);
    }

    /// Borrow a participant
    pub fn participant(&self, id: ParticipantId) -> Option<Ref<'_, Box<dyn Participant>>> {
        self.registry.get(id)
    }

    /// Borrow a participant mutably
    pub fn participant_mut(
        &mut self,
        id: ParticipantId,
    ) -> Option<&mut (dyn Participant + 'static)> {
        self.registry.get_mut(id)
    }

    /// Every participant id, ascending
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.registry.ids()
    }

    /// Number of registered participants
    pub fn participant_count(&self) -> usize {
        self.registry.len()
    }

    /// Ids of visible participants, ascending
    pub fn visible_participant_ids(&self) -> Vec<ParticipantId> {
        self.registry.visible_ids()
    }

    /// Borrow every visible participant
    pub fn visible_participants(&self) -> Vec<Ref<'_, Box<dyn Participant>>> {
        self.registry.visible()
    }

    /// The participant registry
    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// Creations and destructions waiting for the next step boundary
    pub fn pending(&self) -> &PendingMutationQueue {
        &self.pending
    }

    /// Register a constructor for `create_new_participant`
    ///
    /// Returns true if an earlier constructor for `tag` was replaced.
    pub fn register_participant_type<F>(&mut self, tag: impl Into<String>, constructor: F) -> bool
    where
        F: Fn(ParticipantId, &str) -> Box<dyn Participant> + Send + Sync + 'static,
    {
        self.factory.register(tag, constructor)
    }

    /// Build and add a visible participant of a registered type
    ///
    /// The participant gets a fresh id and the name `<tag>_<id>`.
    pub fn create_new_participant(&mut self, tag: &str) -> Result<ParticipantId, ScenarioError> {
        if !self.factory.contains(tag) {
            warn!(tag, "participant type not recognised");
            return Err(ScenarioError::UnknownParticipantType(tag.to_string()));
        }

        let id = self.registry.generate_id();
        let participant = self
            .factory
            .build(tag, id)
            .ok_or_else(|| ScenarioError::UnknownParticipantType(tag.to_string()))?;
        Ok(self.add_participant(id, participant))
    }

    /// The participant constructor table
    pub fn factory(&self) -> &ParticipantFactory {
        &self.factory
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Listen for completed steps
    pub fn add_stepped_listener(&mut self, listener: Arc<dyn SteppedListener>) {
        self.stepped_listeners.add(listener);
    }

    /// Stop listening for completed steps
    pub fn remove_stepped_listener<L: ?Sized>(&mut self, listener: &Arc<L>) -> bool {
        self.stepped_listeners.remove(listener)
    }

    /// Listen for lifecycle and timing changes
    ///
    /// New running listeners go to the head of the list, so an observer added
    /// after its owner hears `finished` before the owner does (and before the
    /// owner tears it down).
    pub fn add_running_listener(&mut self, listener: Arc<dyn RunningListener>) {
        self.running_listeners.add_first(listener);
    }

    /// Stop listening for lifecycle and timing changes
    pub fn remove_running_listener<L: ?Sized>(&mut self, listener: &Arc<L>) -> bool {
        self.running_listeners.remove(listener)
    }

    /// Listen for participants joining and leaving
    pub fn add_participants_changed_listener(
        &mut self,
        listener: Arc<dyn ParticipantsChangedListener>,
    ) {
        self.participant_listeners.add(listener);
    }

    /// Stop listening for participants joining and leaving
    pub fn remove_participants_changed_listener<L: ?Sized>(&mut self, listener: &Arc<L>) -> bool {
        self.participant_listeners.remove(listener)
    }

    fn fire_participant_changed(&mut self, id: ParticipantId, change: ParticipantChange) {
        for listener in self.participant_listeners.snapshot() {
            listener.participants_changed(id, change);
        }
    }

    fn fire_stepped(&mut self, time: SimTime) -> usize {
        let mut failures = 0;
        for listener in self.stepped_listeners.snapshot() {
            if let Err(err) = listener.stepped(self, time) {
                failures += 1;
                warn!(time, error = %err, "stepped listener failed");
            }
        }
        failures
    }
}

/// Run one phase over `ids`, recording failures
///
/// Movement and detection skip participants that are not alive.
fn run_phase(
    registry: &ParticipantRegistry,
    ids: &[ParticipantId],
    phase: Phase,
    old_time: SimTime,
    new_time: SimTime,
    ctx: &mut ScenarioContext<'_>,
    faults: &mut Vec<ParticipantFault>,
) {
    for &id in ids {
        let Some(cell) = registry.cell(id) else {
            continue;
        };
        let mut participant = cell.borrow_mut();

        let result = match phase {
            Phase::Decision => participant.do_decision(old_time, new_time, ctx),
            Phase::Movement if participant.is_alive() => {
                participant.do_movement(old_time, new_time, ctx)
            }
            Phase::Detection if participant.is_alive() => {
                participant.do_detection(old_time, new_time, ctx)
            }
            Phase::Restart => participant.restart(ctx),
            Phase::Movement | Phase::Detection => Ok(()),
        };

        if let Err(error) = result {
            warn!(participant = %id, %phase, error = %error, "participant behaviour failed");
            faults.push(ParticipantFault { id, phase, error });
        }
    }
}

impl std::fmt::Debug for ScenarioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioEngine")
            .field("name", &self.name)
            .field("case_id", &self.case_id)
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("stop_reason", &self.stop_reason)
            .field("participants", &self.registry.len())
            .field("running", &self.timer.is_armed())
            .field("in_step", &self.in_step)
            .finish()
    }
}
