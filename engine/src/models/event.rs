//! Event recording for scenario replay and auditing.
//!
//! [`EventRecorder`] is a ready-made listener for all three listener
//! categories. Register it with an engine and it keeps an [`EventLog`] of
//! every notification in the order the engine fired them.
//!
//! # Example
//!
//! ```rust
//! use scenario_engine_core::{EventRecorder, ScenarioConfig, ScenarioEngine, ScenarioEvent};
//! use std::sync::Arc;
//!
//! let mut engine = ScenarioEngine::new(ScenarioConfig::default()).unwrap();
//! let recorder = Arc::new(EventRecorder::new());
//! engine.add_stepped_listener(recorder.clone());
//!
//! engine.step().unwrap();
//! engine.step().unwrap();
//!
//! assert_eq!(recorder.stepped_times(), vec![0, 1000]);
//! assert_eq!(recorder.events()[0], ScenarioEvent::Stepped { time: 0 });
//! ```

use crate::core::clock::SimTime;
use crate::listeners::{
    ListenerError, ParticipantChange, ParticipantsChangedListener, RunningListener,
    SteppedListener,
};
use crate::models::participant::ParticipantId;
use crate::orchestrator::ScenarioEngine;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scenario notification captured by an [`EventRecorder`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioEvent {
    /// Auto-stepping started
    Started,

    /// Auto-stepping paused
    Paused,

    /// Scenario finished after `elapsed_ms` of wall-clock running
    Finished { elapsed_ms: u64, reason: String },

    /// A step completed at simulated `time`
    Stepped { time: SimTime },

    /// Wall-clock delay between auto-steps changed
    StepTimeChanged { delay_ms: u64 },

    /// Simulated time per step changed
    ScenarioStepTimeChanged { step_ms: i64 },

    /// Participant joined the scenario
    ParticipantAdded { id: ParticipantId },

    /// Participant left the scenario
    ParticipantRemoved { id: ParticipantId },

    /// Scenario restarted (recorded once, from the running-listener hook)
    Restarted,

    /// Scenario renamed
    NameChanged { name: String },
}

impl ScenarioEvent {
    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            ScenarioEvent::Started => "Started",
            ScenarioEvent::Paused => "Paused",
            ScenarioEvent::Finished { .. } => "Finished",
            ScenarioEvent::Stepped { .. } => "Stepped",
            ScenarioEvent::StepTimeChanged { .. } => "StepTimeChanged",
            ScenarioEvent::ScenarioStepTimeChanged { .. } => "ScenarioStepTimeChanged",
            ScenarioEvent::ParticipantAdded { .. } => "ParticipantAdded",
            ScenarioEvent::ParticipantRemoved { .. } => "ParticipantRemoved",
            ScenarioEvent::Restarted => "Restarted",
            ScenarioEvent::NameChanged { .. } => "NameChanged",
        }
    }

    /// Get participant ID if event relates to a specific participant
    pub fn participant_id(&self) -> Option<ParticipantId> {
        match self {
            ScenarioEvent::ParticipantAdded { id } => Some(*id),
            ScenarioEvent::ParticipantRemoved { id } => Some(*id),
            _ => None,
        }
    }
}

/// Ordered list of scenario events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ScenarioEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: ScenarioEvent) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[ScenarioEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&ScenarioEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific participant
    pub fn events_for_participant(&self, id: ParticipantId) -> Vec<&ScenarioEvent> {
        self.events
            .iter()
            .filter(|e| e.participant_id() == Some(id))
            .collect()
    }

    /// Times carried by the stepped events, in order
    pub fn stepped_times(&self) -> Vec<SimTime> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ScenarioEvent::Stepped { time } => Some(*time),
                _ => None,
            })
            .collect()
    }

    /// Drop all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Listener that records every notification it receives
#[derive(Debug, Default)]
pub struct EventRecorder {
    log: Mutex<EventLog>,
}

impl EventRecorder {
    /// Create a recorder with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the log so far
    pub fn log(&self) -> EventLog {
        self.log.lock().clone()
    }

    /// Copy of the events so far
    pub fn events(&self) -> Vec<ScenarioEvent> {
        self.log.lock().events().to_vec()
    }

    /// Number of events recorded
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Number of events of a given type
    pub fn count_of(&self, event_type: &str) -> usize {
        self.log.lock().events_of_type(event_type).len()
    }

    /// Times carried by the stepped events, in order
    pub fn stepped_times(&self) -> Vec<SimTime> {
        self.log.lock().stepped_times()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.log.lock().clear();
    }

    fn record(&self, event: ScenarioEvent) {
        self.log.lock().log(event);
    }
}

impl SteppedListener for EventRecorder {
    fn stepped(&self, _scenario: &mut ScenarioEngine, time: SimTime) -> Result<(), ListenerError> {
        self.record(ScenarioEvent::Stepped { time });
        Ok(())
    }
}

impl RunningListener for EventRecorder {
    fn started(&self) {
        self.record(ScenarioEvent::Started);
    }

    fn paused(&self) {
        self.record(ScenarioEvent::Paused);
    }

    fn finished(&self, elapsed: Duration, reason: &str) {
        self.record(ScenarioEvent::Finished {
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            reason: reason.to_string(),
        });
    }

    fn new_step_time(&self, delay_ms: u64) {
        self.record(ScenarioEvent::StepTimeChanged { delay_ms });
    }

    fn new_scenario_step_time(&self, step_ms: i64) {
        self.record(ScenarioEvent::ScenarioStepTimeChanged { step_ms });
    }

    fn name_changed(&self, name: &str) {
        self.record(ScenarioEvent::NameChanged {
            name: name.to_string(),
        });
    }

    fn restart(&self, _scenario: &mut ScenarioEngine) {
        self.record(ScenarioEvent::Restarted);
    }
}

impl ParticipantsChangedListener for EventRecorder {
    fn participants_changed(&self, id: ParticipantId, change: ParticipantChange) {
        let event = match change {
            ParticipantChange::Added => ScenarioEvent::ParticipantAdded { id },
            ParticipantChange::Removed => ScenarioEvent::ParticipantRemoved { id },
        };
        self.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_queries() {
        let mut log = EventLog::new();
        log.log(ScenarioEvent::ParticipantAdded { id: ParticipantId(3) });
        log.log(ScenarioEvent::Stepped { time: 0 });
        log.log(ScenarioEvent::ParticipantRemoved { id: ParticipantId(3) });
        log.log(ScenarioEvent::Stepped { time: 1000 });

        assert_eq!(log.len(), 4);
        assert_eq!(log.events_of_type("Stepped").len(), 2);
        assert_eq!(log.events_for_participant(ParticipantId(3)).len(), 2);
        assert_eq!(log.stepped_times(), vec![0, 1000]);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_recorder_maps_participant_changes() {
        let recorder = EventRecorder::new();
        recorder.participants_changed(ParticipantId(9), ParticipantChange::Added);
        recorder.participants_changed(ParticipantId(9), ParticipantChange::Removed);

        assert_eq!(
            recorder.events(),
            vec![
                ScenarioEvent::ParticipantAdded { id: ParticipantId(9) },
                ScenarioEvent::ParticipantRemoved { id: ParticipantId(9) },
            ]
        );
    }

    #[test]
    fn test_recorder_finished_carries_reason() {
        let recorder = EventRecorder::new();
        recorder.finished(Duration::from_millis(1500), "target destroyed");

        assert_eq!(
            recorder.events(),
            vec![ScenarioEvent::Finished {
                elapsed_ms: 1500,
                reason: "target destroyed".to_string()
            }]
        );
        assert_eq!(recorder.count_of("Finished"), 1);
    }
}
