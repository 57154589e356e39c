//! Participant contract
//!
//! A participant is an independent actor in the scenario. The engine knows
//! nothing about its internals beyond this trait: an id, an alive flag and
//! the per-step decision, movement and detection callbacks.

use crate::core::clock::SimTime;
use crate::orchestrator::ScenarioContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Participant identifier
///
/// `ParticipantId::UNASSIGNED` asks the registry to generate an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    /// Placeholder id meaning "please generate one"
    pub const UNASSIGNED: ParticipantId = ParticipantId(0);

    /// True for the placeholder id
    pub fn is_unassigned(&self) -> bool {
        *self == Self::UNASSIGNED
    }

    /// Get inner value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ParticipantId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Which view of the registry a participant appears in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Visibility {
    /// Listed in the visible view (rendered / tracked by hosts)
    #[default]
    Visible,
    /// Monte Carlo participant: stepped normally but not listed as visible
    Invisible,
}

/// Step phase a participant callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Decision,
    Movement,
    Detection,
    Restart,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Decision => "decision",
            Phase::Movement => "movement",
            Phase::Detection => "detection",
            Phase::Restart => "restart",
        };
        f.write_str(name)
    }
}

/// Failure raised by participant behaviour
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BehaviorError {
    message: String,
}

impl BehaviorError {
    /// Create a behaviour error with a description
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

/// An actor taking part in a scenario
///
/// The engine calls, once per step and in this order across all
/// participants: `do_decision` (every participant), `do_movement` (alive
/// participants), `do_detection` (alive participants).
///
/// Callbacks get a [`ScenarioContext`] for reading other participants and for
/// requesting creations, destructions or a scenario stop. Those requests take
/// effect at the end of the step.
pub trait Participant: Send {
    /// Current id
    fn id(&self) -> ParticipantId;

    /// Store the id assigned by the registry
    fn set_id(&mut self, id: ParticipantId);

    /// Display name
    fn name(&self) -> &str {
        ""
    }

    /// Alive participants move and detect; dead ones only decide
    fn is_alive(&self) -> bool;

    /// Decision phase. Runs regardless of `is_alive`, since deciding is what
    /// can bring a participant to life.
    fn do_decision(
        &mut self,
        old_time: SimTime,
        new_time: SimTime,
        ctx: &mut ScenarioContext<'_>,
    ) -> Result<(), BehaviorError>;

    /// Movement phase
    fn do_movement(
        &mut self,
        old_time: SimTime,
        new_time: SimTime,
        ctx: &mut ScenarioContext<'_>,
    ) -> Result<(), BehaviorError>;

    /// Detection phase
    fn do_detection(
        &mut self,
        old_time: SimTime,
        new_time: SimTime,
        ctx: &mut ScenarioContext<'_>,
    ) -> Result<(), BehaviorError>;

    /// Return to the initial state after a scenario restart
    fn restart(&mut self, _ctx: &mut ScenarioContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }
}

impl fmt::Debug for dyn Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("alive", &self.is_alive())
            .finish()
    }
}
