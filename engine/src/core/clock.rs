//! Simulated time for a scenario
//!
//! The scenario moves forward in discrete steps of a fixed simulated-time
//! interval. The very first step after construction or a reset does not
//! advance time, so recorders get to see the initial state at the start time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulated time in milliseconds
pub type SimTime = i64;

/// Tracks simulated time, the per-step interval and the auto-step delay
///
/// # Example
/// ```
/// use scenario_engine_core::ScenarioClock;
///
/// let mut clock = ScenarioClock::new(100, 1000);
/// assert_eq!(clock.advance(), (100, 100)); // first pass holds time
/// assert_eq!(clock.advance(), (100, 1100));
/// assert_eq!(clock.time(), 1100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioClock {
    /// Current simulated time (millis)
    time: SimTime,
    /// Value `time` returns to on reset
    start_time: SimTime,
    /// Simulated millis added by each step
    scenario_step: i64,
    /// Wall-clock millis between auto-steps (0 = run flat out)
    step_delay: u64,
    /// Suppresses the time increment on the next advance
    first_pass: bool,
}

impl ScenarioClock {
    /// Create a new clock
    ///
    /// # Arguments
    /// * `start_time` - Initial simulated time (millis)
    /// * `scenario_step` - Simulated millis per step, must be positive
    ///
    /// # Example
    /// ```
    /// use scenario_engine_core::ScenarioClock;
    ///
    /// let clock = ScenarioClock::new(0, 1000);
    /// assert_eq!(clock.time(), 0);
    /// assert!(clock.is_first_pass());
    /// ```
    pub fn new(start_time: SimTime, scenario_step: i64) -> Self {
        assert!(scenario_step > 0, "scenario_step must be positive");
        Self {
            time: start_time,
            start_time,
            scenario_step,
            step_delay: 0,
            first_pass: true,
        }
    }

    /// Move time forward by one step
    ///
    /// Returns `(old_time, new_time)`. On the first pass both are equal.
    pub fn advance(&mut self) -> (SimTime, SimTime) {
        let old_time = self.time;
        if self.first_pass {
            self.first_pass = false;
        } else {
            self.time = self.time.saturating_add(self.scenario_step);
        }
        (old_time, self.time)
    }

    /// Return to the start time and re-arm the first-pass hold
    ///
    /// # Example
    /// ```
    /// use scenario_engine_core::ScenarioClock;
    ///
    /// let mut clock = ScenarioClock::new(0, 500);
    /// clock.advance();
    /// clock.advance();
    /// assert_eq!(clock.time(), 500);
    ///
    /// clock.reset();
    /// assert_eq!(clock.time(), 0);
    /// assert_eq!(clock.advance(), (0, 0));
    /// ```
    pub fn reset(&mut self) {
        self.time = self.start_time;
        self.first_pass = true;
    }

    /// Set both the current time and the start time
    pub fn set_time(&mut self, time: SimTime) {
        self.time = time;
        self.start_time = time;
    }

    /// Get the current simulated time
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Get the time a reset returns to
    pub fn start_time(&self) -> SimTime {
        self.start_time
    }

    /// Get the simulated millis added per step
    pub fn scenario_step(&self) -> i64 {
        self.scenario_step
    }

    /// Set the simulated millis added per step
    pub fn set_scenario_step(&mut self, scenario_step: i64) {
        assert!(scenario_step > 0, "scenario_step must be positive");
        self.scenario_step = scenario_step;
    }

    /// Get the wall-clock delay between auto-steps (millis)
    pub fn step_delay(&self) -> u64 {
        self.step_delay
    }

    /// Get the wall-clock delay between auto-steps
    pub fn step_delay_duration(&self) -> Duration {
        Duration::from_millis(self.step_delay)
    }

    /// Set the wall-clock delay between auto-steps (millis, 0 = flat out)
    pub fn set_step_delay(&mut self, step_delay: u64) {
        self.step_delay = step_delay;
    }

    /// True until the first advance after construction or reset
    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }
}
