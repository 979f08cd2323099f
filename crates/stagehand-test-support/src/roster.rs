//! Test roster — fixed `CharacterRoster` for tests.

use std::collections::HashMap;

use stagehand_core::roster::{CharacterProfile, CharacterRoster};

/// A roster backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    profiles: HashMap<String, CharacterProfile>,
}

impl StaticRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a character.
    #[must_use]
    pub fn with(mut self, id: &str, name: &str, image: &str) -> Self {
        self.profiles.insert(
            id.to_owned(),
            CharacterProfile {
                id: id.to_owned(),
                name: name.to_owned(),
                image: image.to_owned(),
            },
        );
        self
    }
}

impl CharacterRoster for StaticRoster {
    fn lookup(&self, id: &str) -> Option<CharacterProfile> {
        self.profiles.get(id).cloned()
    }
}
