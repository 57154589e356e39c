//! Scenario observers
//!
//! Three listener categories, each with its own typed list:
//!
//! - [`SteppedListener`]: told the new time after every step
//! - [`RunningListener`]: started / paused / finished and timing changes
//! - [`ParticipantsChangedListener`]: participants added or removed
//!
//! Listeners are shared as `Arc`s and removed by identity. Every fan-out
//! iterates a snapshot of the list, so a listener may add or remove
//! listeners (itself included) while being notified.

use crate::core::clock::SimTime;
use crate::models::participant::ParticipantId;
use crate::orchestrator::ScenarioEngine;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by a stepped listener
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    /// Create a listener error with a description
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the description
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Notified after each completed step
pub trait SteppedListener: Send + Sync {
    /// The scenario has stepped to `time`
    ///
    /// An error is logged by the engine and does not stop the remaining
    /// listeners from being notified.
    fn stepped(&self, scenario: &mut ScenarioEngine, time: SimTime) -> Result<(), ListenerError>;

    /// The scenario has been restarted
    fn restart(&self, _scenario: &mut ScenarioEngine) {}
}

/// Notified of auto-run lifecycle and timing changes
pub trait RunningListener: Send + Sync {
    /// Auto-stepping has started
    fn started(&self) {}

    /// Auto-stepping has paused
    fn paused(&self) {}

    /// The scenario has finished after running for `elapsed` wall-clock time
    fn finished(&self, _elapsed: Duration, _reason: &str) {}

    /// The wall-clock delay between auto-steps has changed (millis)
    fn new_step_time(&self, _delay_ms: u64) {}

    /// The simulated time per step has changed (millis)
    fn new_scenario_step_time(&self, _step_ms: i64) {}

    /// The scenario has been renamed
    fn name_changed(&self, _name: &str) {}

    /// The scenario has been restarted
    fn restart(&self, _scenario: &mut ScenarioEngine) {}
}

/// Kind of participant change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantChange {
    Added,
    Removed,
}

/// Notified when participants join or leave the scenario
pub trait ParticipantsChangedListener: Send + Sync {
    /// Participant `id` was added or removed
    fn participants_changed(&self, id: ParticipantId, change: ParticipantChange);

    /// The scenario has been restarted
    fn restart(&self, _scenario: &mut ScenarioEngine) {}
}

/// Ordered list of listeners of one category
pub struct ListenerSet<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized> ListenerSet<L> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Append a listener
    pub fn add(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Insert a listener ahead of all existing ones
    pub fn add_first(&mut self, listener: Arc<L>) {
        self.listeners.insert(0, listener);
    }

    /// Remove the first registration of `listener`
    ///
    /// Matches on the pointed-to object, so a handle of the concrete listener
    /// type removes the registration made through a trait-object handle.
    /// Returns false when it was not registered.
    pub fn remove<T: ?Sized>(&mut self, listener: &Arc<T>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        match self
            .listeners
            .iter()
            .position(|l| Arc::as_ptr(l) as *const () == target)
        {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Copy of the current list, in registration order
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.clone()
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerSet<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.listeners.len())
            .finish()
    }
}
