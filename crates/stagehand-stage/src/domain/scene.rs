//! Scene state: the active background and the characters on stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stage slot a character occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Left third of the stage.
    Left,
    /// Middle of the stage.
    #[default]
    Center,
    /// Right third of the stage.
    Right,
}

impl Position {
    /// Reads a position attribute leniently. Anything unrecognized, or a
    /// missing attribute, is `Center`.
    #[must_use]
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("left") => Self::Left,
            Some("right") => Self::Right,
            _ => Self::Center,
        }
    }
}

/// A character currently visible on stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterOnStage {
    /// Character identifier.
    pub id: String,
    /// Sprite expression, if one was set.
    pub expression: Option<String>,
    /// Stage slot.
    pub position: Position,
}

/// The state a prefix of the command queue produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneState {
    /// Active background reference.
    pub background: Option<String>,
    /// Characters on stage, keyed by id.
    pub on_stage: BTreeMap<String, CharacterOnStage>,
}

impl SceneState {
    /// Returns the on-stage record for `id`.
    #[must_use]
    pub fn character(&self, id: &str) -> Option<&CharacterOnStage> {
        self.on_stage.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_attr_is_lenient() {
        assert_eq!(Position::from_attr(Some("LEFT")), Position::Left);
        assert_eq!(Position::from_attr(Some("right")), Position::Right);
        assert_eq!(Position::from_attr(Some("upstage")), Position::Center);
        assert_eq!(Position::from_attr(None), Position::Center);
    }
}
