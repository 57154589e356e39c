//! Participant registry
//!
//! Holds every participant in the scenario, keyed by id. Each entry carries a
//! visibility tag, so the three views the engine works with fall out of one
//! map:
//!
//! - **complete**: every entry
//! - **visible**: entries tagged [`Visibility::Visible`]
//! - **invisible**: entries tagged [`Visibility::Invisible`] (Monte Carlo)
//!
//! An id therefore can never sit in the visible and invisible views at once,
//! and both views are always subsets of the complete one.
//!
//! Iteration is in ascending id order so seeded runs replay identically.
//! Participants live in a `RefCell` so a step can hand one participant
//! mutable access while the others stay readable through the context.

use crate::models::participant::{Participant, ParticipantId, Visibility};
use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use tracing::warn;

struct Entry {
    participant: RefCell<Box<dyn Participant>>,
    visibility: Visibility,
}

/// Result of adding a participant
#[derive(Debug)]
pub struct Registered {
    /// Final id of the participant (generated when it was unassigned)
    pub id: ParticipantId,
    /// Participant previously stored under the same id, if any
    pub displaced: Option<Box<dyn Participant>>,
}

/// Owns the scenario's participants
pub struct ParticipantRegistry {
    entries: BTreeMap<ParticipantId, Entry>,
    next_id: u32,
}

impl ParticipantRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Produce an id not currently in use
    pub fn generate_id(&mut self) -> ParticipantId {
        loop {
            let candidate = ParticipantId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Add a participant
    ///
    /// An unassigned `id` is replaced with a generated one, which is also
    /// written back to the participant. Adding under an id that is already
    /// present logs a warning and replaces the existing entry; the old
    /// participant is handed back in [`Registered::displaced`].
    pub fn add(
        &mut self,
        id: ParticipantId,
        mut participant: Box<dyn Participant>,
        visibility: Visibility,
    ) -> Registered {
        let id = if id.is_unassigned() {
            let generated = self.generate_id();
            participant.set_id(generated);
            generated
        } else {
            id
        };

        let displaced = self
            .entries
            .insert(
                id,
                Entry {
                    participant: RefCell::new(participant),
                    visibility,
                },
            )
            .map(|old| old.participant.into_inner());

        if displaced.is_some() {
            warn!(participant = %id, "duplicate participant id added, previous entry replaced");
        }

        Registered { id, displaced }
    }

    /// Remove a participant from every view
    ///
    /// Returns `None` (and changes nothing) when the id is unknown.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Box<dyn Participant>> {
        self.entries
            .remove(&id)
            .map(|entry| entry.participant.into_inner())
    }

    /// Borrow a participant
    ///
    /// # Panics
    /// Panics if the participant is currently mutably borrowed, which only
    /// happens inside that participant's own step callback. Code running in
    /// a callback should use `ScenarioContext::with_participant` instead.
    pub fn get(&self, id: ParticipantId) -> Option<Ref<'_, Box<dyn Participant>>> {
        self.entries.get(&id).map(|entry| entry.participant.borrow())
    }

    /// Borrow a participant mutably
    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut (dyn Participant + 'static)> {
        self.entries
            .get_mut(&id)
            .map(|entry| &mut **entry.participant.get_mut())
    }

    /// Borrow a participant unless it is already mutably borrowed
    pub(crate) fn try_get(&self, id: ParticipantId) -> Option<Ref<'_, Box<dyn Participant>>> {
        self.entries.get(&id)?.participant.try_borrow().ok()
    }

    /// Participant cell, for the engine's phase loops
    pub(crate) fn cell(&self, id: ParticipantId) -> Option<&RefCell<Box<dyn Participant>>> {
        self.entries.get(&id).map(|entry| &entry.participant)
    }

    /// True if the id is in the complete view
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Visibility of a registered participant
    pub fn visibility(&self, id: ParticipantId) -> Option<Visibility> {
        self.entries.get(&id).map(|entry| entry.visibility)
    }

    /// Every id (the complete view)
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.entries.keys().copied().collect()
    }

    /// Ids in the visible view
    pub fn visible_ids(&self) -> Vec<ParticipantId> {
        self.ids_with(Visibility::Visible)
    }

    /// Ids in the invisible (Monte Carlo) view
    pub fn invisible_ids(&self) -> Vec<ParticipantId> {
        self.ids_with(Visibility::Invisible)
    }

    /// Borrow every visible participant
    pub fn visible(&self) -> Vec<Ref<'_, Box<dyn Participant>>> {
        self.entries
            .values()
            .filter(|entry| entry.visibility == Visibility::Visible)
            .map(|entry| entry.participant.borrow())
            .collect()
    }

    /// Number of participants in the complete view
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no participants are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ids_with(&self, visibility: Visibility) -> Vec<ParticipantId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.visibility == visibility)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParticipantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantRegistry")
            .field("visible", &self.visible_ids())
            .field("invisible", &self.invisible_ids())
            .field("next_id", &self.next_id)
            .finish()
    }
}
