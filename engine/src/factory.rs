//! Participant constructors registered by type tag
//!
//! Hosts register one constructor per participant kind ("SSK", "FRIGATE",
//! ...). The engine's `create_new_participant(tag)` looks the tag up, builds
//! the participant under a fresh id with the default name `<tag>_<id>` and
//! registers it. Unknown tags are a configuration error, not a panic.

use crate::models::participant::{Participant, ParticipantId};
use std::collections::HashMap;

/// Builds a participant from its id and default name
pub type ParticipantConstructor =
    Box<dyn Fn(ParticipantId, &str) -> Box<dyn Participant> + Send + Sync>;

/// Table of participant constructors keyed by type tag
#[derive(Default)]
pub struct ParticipantFactory {
    constructors: HashMap<String, ParticipantConstructor>,
}

impl ParticipantFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `tag`
    ///
    /// Returns true if an earlier constructor was replaced.
    pub fn register<F>(&mut self, tag: impl Into<String>, constructor: F) -> bool
    where
        F: Fn(ParticipantId, &str) -> Box<dyn Participant> + Send + Sync + 'static,
    {
        self.constructors
            .insert(tag.into(), Box::new(constructor))
            .is_some()
    }

    /// True if `tag` has a constructor
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Build a participant of kind `tag` with id `id`
    ///
    /// Returns `None` for an unknown tag.
    pub fn build(&self, tag: &str, id: ParticipantId) -> Option<Box<dyn Participant>> {
        let constructor = self.constructors.get(tag)?;
        let name = format!("{}_{}", tag, id);
        Some(constructor(id, &name))
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl std::fmt::Debug for ParticipantFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantFactory")
            .field("tags", &self.tags())
            .finish()
    }
}
