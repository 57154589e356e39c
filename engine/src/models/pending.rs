//! Deferred participant creation and destruction
//!
//! Participants created or destroyed while a step is running are parked here
//! and applied at the step boundary, after the detection phase. A participant
//! created mid-step therefore sits out the rest of that step, and one
//! destroyed mid-step keeps acting until the step's phases are over.

use crate::models::participant::{Participant, ParticipantId, Visibility};
use crate::models::registry::ParticipantRegistry;
use tracing::debug;

/// Creation and destruction requests waiting for the step boundary
#[derive(Debug, Default)]
pub struct PendingMutationQueue {
    creations: Vec<(Box<dyn Participant>, Visibility)>,
    destructions: Vec<ParticipantId>,
}

impl PendingMutationQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a participant to join at the next step boundary
    pub fn enqueue_create(&mut self, participant: Box<dyn Participant>, visibility: Visibility) {
        debug!(participant = %participant.id(), ?visibility, "participant creation queued");
        self.creations.push((participant, visibility));
    }

    /// Queue a participant to leave at the next step boundary
    pub fn enqueue_destroy(&mut self, id: ParticipantId) {
        debug!(participant = %id, "participant destruction queued");
        self.destructions.push(id);
    }

    /// Add every queued creation to `registry`, in request order
    ///
    /// Returns the ids the participants were registered under.
    pub fn drain_creates_into(&mut self, registry: &mut ParticipantRegistry) -> Vec<ParticipantId> {
        self.creations
            .drain(..)
            .map(|(participant, visibility)| {
                let id = participant.id();
                registry.add(id, participant, visibility).id
            })
            .collect()
    }

    /// Remove every queued destruction from `registry`, in request order
    ///
    /// Returns the ids that were actually present and removed. Ids that were
    /// queued twice, or were never registered, are skipped.
    pub fn drain_destroys_into(
        &mut self,
        registry: &mut ParticipantRegistry,
    ) -> Vec<ParticipantId> {
        self.destructions
            .drain(..)
            .filter(|id| registry.remove(*id).is_some())
            .collect()
    }

    /// Ids of participants waiting to be created
    pub fn pending_creations(&self) -> Vec<ParticipantId> {
        self.creations.iter().map(|(p, _)| p.id()).collect()
    }

    /// Ids waiting to be destroyed
    pub fn pending_destructions(&self) -> &[ParticipantId] {
        &self.destructions
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.destructions.is_empty()
    }
}
