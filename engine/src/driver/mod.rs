//! Auto-step drivers
//!
//! The engine never owns a platform timer directly. It talks to a
//! [`StepTimer`], which it arms on `start()`, disarms on `pause()` and when a
//! stop is honoured, and retunes when the step delay changes.
//!
//! - [`ManualTimer`]: keeps the armed flag and delay only. The caller drives
//!   `step()` itself (tests, batch runs, hosts with their own scheduler).
//! - [`ThreadTimer`]: background thread that fires a tick callback after each
//!   delay while armed.
//! - [`SharedScenario`]: an engine behind a mutex with a `ThreadTimer` wired
//!   back into it, so `start()` really does auto-step.

mod shared;
mod thread;

pub use shared::SharedScenario;
pub use thread::ThreadTimer;

use std::time::Duration;

/// Periodic trigger for auto-stepping
pub trait StepTimer: Send {
    /// Begin firing, first after `delay`, then every `delay` after each tick
    fn arm(&mut self, delay: Duration);

    /// Stop firing
    fn disarm(&mut self);

    /// Change the delay, whether armed or not
    fn set_delay(&mut self, delay: Duration);

    /// True while armed
    fn is_armed(&self) -> bool;
}

/// Timer that never fires on its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualTimer {
    armed: bool,
    delay: Duration,
}

impl ManualTimer {
    /// Create a disarmed timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current delay
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl StepTimer for ManualTimer {
    fn arm(&mut self, delay: Duration) {
        self.delay = delay;
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}
