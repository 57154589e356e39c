//! Scenario Engine Core
//!
//! Turn-based multi-agent scenario stepping engine with deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Simulated time (scenario clock)
//! - **models**: Participants, the participant registry, pending mutations, events
//! - **listeners**: Typed observer lists for stepped, running and participant events
//! - **driver**: Auto-step timers (manual and background-thread)
//! - **orchestrator**: The scenario engine state machine and its configuration
//! - **factory**: Participant constructors registered by type tag
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Time never advances on the first step after construction or restart
//! 2. Participants created or destroyed during a step only join or leave at the step boundary
//! 3. A pending stop is honoured at the start of the next step, never mid-step
//! 4. Every listener fan-out iterates a copy of the listener list

// Module declarations
pub mod core;
pub mod driver;
pub mod factory;
pub mod listeners;
pub mod models;
pub mod orchestrator;
pub mod rng;

// Re-exports for convenience
pub use core::clock::{ScenarioClock, SimTime};
pub use driver::{ManualTimer, SharedScenario, StepTimer, ThreadTimer};
pub use factory::{ParticipantConstructor, ParticipantFactory};
pub use listeners::{
    ListenerError, ListenerSet, ParticipantChange, ParticipantsChangedListener, RunningListener,
    SteppedListener,
};
pub use models::{
    event::{EventLog, EventRecorder, ScenarioEvent},
    participant::{BehaviorError, Participant, ParticipantId, Phase, Visibility},
    pending::PendingMutationQueue,
    registry::{ParticipantRegistry, Registered},
};
pub use orchestrator::{
    EngineState, ParticipantFault, ScenarioConfig, ScenarioContext, ScenarioEngine, ScenarioError,
    StepOutcome, StepReport,
};
pub use rng::RngManager;
