//! The view of the scenario handed to participant callbacks

use crate::core::clock::SimTime;
use crate::models::participant::{Participant, ParticipantId, Visibility};
use crate::models::pending::PendingMutationQueue;
use crate::models::registry::ParticipantRegistry;
use crate::rng::RngManager;

/// What a participant may see and do while the scenario steps
///
/// Other participants are readable, the acting participant itself is not
/// (it is already mutably borrowed). Creations, destructions and stop
/// requests are queued and take effect at the step boundary.
pub struct ScenarioContext<'a> {
    registry: &'a ParticipantRegistry,
    pending: &'a mut PendingMutationQueue,
    stop_reason: &'a mut Option<String>,
    rng: &'a mut RngManager,
    time: SimTime,
    scenario_step: i64,
}

impl<'a> ScenarioContext<'a> {
    pub(crate) fn new(
        registry: &'a ParticipantRegistry,
        pending: &'a mut PendingMutationQueue,
        stop_reason: &'a mut Option<String>,
        rng: &'a mut RngManager,
        time: SimTime,
        scenario_step: i64,
    ) -> Self {
        Self {
            registry,
            pending,
            stop_reason,
            rng,
            time,
            scenario_step,
        }
    }

    /// Current simulated time
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Simulated millis per step
    pub fn scenario_step(&self) -> i64 {
        self.scenario_step
    }

    /// Every registered id, ascending
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.registry.ids()
    }

    /// Ids in the visible view
    pub fn visible_ids(&self) -> Vec<ParticipantId> {
        self.registry.visible_ids()
    }

    /// Visibility of a registered participant
    pub fn visibility(&self, id: ParticipantId) -> Option<Visibility> {
        self.registry.visibility(id)
    }

    /// Read another participant
    ///
    /// Returns `None` for unknown ids and for the participant currently
    /// acting.
    pub fn with_participant<R>(
        &self,
        id: ParticipantId,
        f: impl FnOnce(&dyn Participant) -> R,
    ) -> Option<R> {
        self.registry.try_get(id).map(|p| f(&**p))
    }

    /// Add a visible participant at the end of this step
    pub fn create_participant(&mut self, participant: Box<dyn Participant>) {
        self.pending.enqueue_create(participant, Visibility::Visible);
    }

    /// Add a Monte Carlo participant at the end of this step
    pub fn create_monte_carlo_participant(&mut self, participant: Box<dyn Participant>) {
        self.pending.enqueue_create(participant, Visibility::Invisible);
    }

    /// Remove a participant at the end of this step
    pub fn destroy_participant(&mut self, id: ParticipantId) {
        self.pending.enqueue_destroy(id);
    }

    /// Ask the scenario to stop at the start of the next step
    pub fn stop(&mut self, reason: impl Into<String>) {
        *self.stop_reason = Some(reason.into());
    }

    /// True if a stop has been requested
    pub fn stop_requested(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// The scenario's deterministic RNG
    pub fn rng(&mut self) -> &mut RngManager {
        &mut *self.rng
    }
}
