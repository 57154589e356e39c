//! Orchestrator - the scenario engine
//!
//! See `engine.rs` for the step cycle and lifecycle state machine.

pub mod config;
pub mod context;
pub mod engine;

// Re-export main types for convenience
pub use config::ScenarioConfig;
pub use context::ScenarioContext;
pub use engine::{
    EngineState, ParticipantFault, ScenarioEngine, ScenarioError, StepOutcome, StepReport,
};
