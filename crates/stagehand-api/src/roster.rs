//! Character roster loaded from a JSON profile file.

use std::collections::HashMap;
use std::path::Path;

use stagehand_core::roster::{CharacterProfile, CharacterRoster};

use crate::error::AppError;

/// A roster of character profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProfileRoster {
    profiles: HashMap<String, CharacterProfile>,
}

impl ProfileRoster {
    /// Builds a roster from profiles. A later profile replaces an earlier one
    /// with the same id.
    #[must_use]
    pub fn new(profiles: Vec<CharacterProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();
        Self { profiles }
    }

    /// Parses a JSON array of `{id, name, image}` objects.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the text is not such an array.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let profiles: Vec<CharacterProfile> = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("invalid roster: {e}")))?;
        Ok(Self::new(profiles))
    }

    /// Reads a roster file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Server` if the file cannot be read and
    /// `AppError::Config` if it does not parse.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Number of known characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the roster knows no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl CharacterRoster for ProfileRoster {
    fn lookup(&self, id: &str) -> Option<CharacterProfile> {
        self.profiles.get(id).cloned()
    }
}
