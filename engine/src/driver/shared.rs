//! Engine handle with a live auto-step driver

use super::thread::ThreadTimer;
use crate::orchestrator::{
    ParticipantFault, ScenarioConfig, ScenarioEngine, ScenarioError, StepOutcome,
};
use parking_lot::{Mutex, MutexGuard};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use tracing::{trace, warn};

/// Scenario engine shared behind a mutex, auto-stepped by a [`ThreadTimer`]
///
/// Every engine call, including the timer's steps, goes through the same
/// lock, so steps never overlap. When the timer fires and finds the lock
/// taken, that tick is dropped rather than queued.
///
/// # Example
///
/// ```rust,no_run
/// use scenario_engine_core::{ScenarioConfig, SharedScenario};
///
/// let scenario = SharedScenario::new(ScenarioConfig::default())?;
/// scenario.lock().set_step_time(100);
/// scenario.start()?;
/// // ... later
/// scenario.stop("operator request");
/// # Ok::<(), scenario_engine_core::ScenarioError>(())
/// ```
#[derive(Clone)]
pub struct SharedScenario {
    inner: Arc<Mutex<ScenarioEngine>>,
}

impl SharedScenario {
    /// Build an engine from `config` with a background auto-step driver
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        let target: Arc<OnceLock<Weak<Mutex<ScenarioEngine>>>> = Arc::new(OnceLock::new());

        let tick_target = target.clone();
        let timer = ThreadTimer::spawn(move || {
            if let Some(engine) = tick_target.get().and_then(Weak::upgrade) {
                auto_step(&engine);
            }
        })
        .map_err(ScenarioError::Driver)?;

        let engine = ScenarioEngine::with_timer(config, Box::new(timer))?;
        let inner = Arc::new(Mutex::new(engine));
        // freshly created, so nothing else can have set it
        let _ = target.set(Arc::downgrade(&inner));

        Ok(Self { inner })
    }

    /// Lock the engine for direct use
    pub fn lock(&self) -> MutexGuard<'_, ScenarioEngine> {
        self.inner.lock()
    }

    /// Run `f` with the engine locked
    pub fn with<R>(&self, f: impl FnOnce(&mut ScenarioEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Start auto-stepping
    pub fn start(&self) -> Result<(), ScenarioError> {
        self.inner.lock().start()
    }

    /// Pause auto-stepping
    pub fn pause(&self) {
        self.inner.lock().pause();
    }

    /// Request a stop at the next step boundary
    pub fn stop(&self, reason: impl Into<String>) {
        self.inner.lock().stop(reason);
    }

    /// Run one step now
    pub fn step(&self) -> Result<StepOutcome, ScenarioError> {
        self.inner.lock().step()
    }

    /// Restart the scenario, returning any participant restart failures
    pub fn restart(&self) -> Vec<ParticipantFault> {
        self.inner.lock().restart()
    }

    /// True while the auto-step driver is armed
    pub fn is_running(&self) -> bool {
        self.inner.lock().is_running()
    }
}

fn auto_step(engine: &Mutex<ScenarioEngine>) {
    let Some(mut guard) = engine.try_lock() else {
        trace!("scenario busy, auto-step tick dropped");
        thread::yield_now();
        return;
    };
    if let Err(err) = guard.step() {
        warn!(error = %err, "auto-step failed");
    }
}

impl std::fmt::Debug for SharedScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(engine) => f.debug_tuple("SharedScenario").field(&*engine).finish(),
            None => f.write_str("SharedScenario(<locked>)"),
        }
    }
}
