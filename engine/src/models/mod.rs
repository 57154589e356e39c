//! Domain types: participants, the registry, deferred mutations and events

pub mod event;
pub mod participant;
pub mod pending;
pub mod registry;

pub use event::{EventLog, EventRecorder, ScenarioEvent};
pub use participant::{BehaviorError, Participant, ParticipantId, Phase, Visibility};
pub use pending::PendingMutationQueue;
pub use registry::{ParticipantRegistry, Registered};
