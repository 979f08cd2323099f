//! Character lookup abstraction.

use serde::{Deserialize, Serialize};

/// Name used when a script references a character the roster does not know.
pub const PLACEHOLDER_NAME: &str = "???";

/// Image used when a script references a character the roster does not know.
pub const PLACEHOLDER_IMAGE: &str = "placeholder.png";

/// Display data for a character, as owned by the persona layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Character identifier as used in scene markup.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base image reference.
    pub image: String,
}

impl CharacterProfile {
    /// Returns the stand-in profile for an unknown character id.
    #[must_use]
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: PLACEHOLDER_NAME.to_owned(),
            image: PLACEHOLDER_IMAGE.to_owned(),
        }
    }
}

/// Character lookup by id.
pub trait CharacterRoster: Send + Sync {
    /// Returns the profile for `id`, if the character exists.
    fn lookup(&self, id: &str) -> Option<CharacterProfile>;

    /// Returns the profile for `id`, substituting a placeholder when unknown.
    fn resolve(&self, id: &str) -> CharacterProfile {
        self.lookup(id)
            .unwrap_or_else(|| CharacterProfile::placeholder(id))
    }
}
