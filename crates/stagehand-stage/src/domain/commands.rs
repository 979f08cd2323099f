//! Stage commands.
//!
//! Each command carries what it needs to apply itself and the snapshot taken
//! at compile time that lets it revert itself exactly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stagehand_markup::Node;

use super::scene::{CharacterOnStage, SceneState};

/// Speaker expression change made by a dialogue line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionChange {
    /// Expression set while the line is spoken.
    pub to: String,
    /// Expression the speaker had before.
    pub from: Option<String>,
}

/// A single stage command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageCommand {
    /// Switch the background.
    Background {
        /// New background reference.
        src: String,
        /// Background before this command.
        previous: Option<String>,
    },
    /// Place a character on stage.
    Enter {
        /// Record inserted on apply.
        character: CharacterOnStage,
        /// Record this one replaced, if the character was already on stage.
        replaced: Option<CharacterOnStage>,
    },
    /// Remove a character from stage.
    Exit {
        /// Character identifier.
        id: String,
        /// Record removed on apply; `None` if the character was not on stage.
        removed: Option<CharacterOnStage>,
    },
    /// A spoken line.
    Dialogue {
        /// Speaking character.
        speaker: String,
        /// Expression change, recorded only when the speaker is on stage.
        change: Option<ExpressionChange>,
        /// Inline rich content.
        content: Vec<Node>,
    },
    /// Narration.
    Narrate {
        /// Inline rich content.
        content: Vec<Node>,
    },
    /// Show an illustration.
    ShowImage {
        /// Image reference.
        src: String,
        /// Character the image belongs to, if any.
        from: Option<String>,
    },
    /// Present choices and wait for a selection.
    Prompt {
        /// Description shown above the choices.
        info: String,
        /// Choice texts in order.
        choices: Vec<String>,
    },
    /// Hold animated playback.
    Pause {
        /// How long to hold.
        duration: Duration,
    },
}

impl StageCommand {
    /// Returns the command type name (for logging).
    #[must_use]
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::Background { .. } => "stage.background",
            Self::Enter { .. } => "stage.enter",
            Self::Exit { .. } => "stage.exit",
            Self::Dialogue { .. } => "stage.dialogue",
            Self::Narrate { .. } => "stage.narrate",
            Self::ShowImage { .. } => "stage.show_image",
            Self::Prompt { .. } => "stage.prompt",
            Self::Pause { .. } => "stage.pause",
        }
    }

    /// Whether playback suspends for the user after this command.
    #[must_use]
    pub fn is_wait_point(&self) -> bool {
        matches!(
            self,
            Self::Dialogue { .. } | Self::Narrate { .. } | Self::Prompt { .. }
        )
    }

    /// Applies this command to `state`.
    pub fn apply(&self, state: &mut SceneState) {
        match self {
            Self::Background { src, .. } => state.background = Some(src.clone()),
            Self::Enter { character, .. } => {
                state
                    .on_stage
                    .insert(character.id.clone(), character.clone());
            }
            Self::Exit { id, .. } => {
                state.on_stage.remove(id);
            }
            Self::Dialogue {
                speaker,
                change: Some(change),
                ..
            } => {
                if let Some(character) = state.on_stage.get_mut(speaker) {
                    character.expression = Some(change.to.clone());
                }
            }
            Self::Dialogue { change: None, .. }
            | Self::Narrate { .. }
            | Self::ShowImage { .. }
            | Self::Prompt { .. }
            | Self::Pause { .. } => {}
        }
    }

    /// Reverts this command on `state`, which must be the state this command
    /// produced.
    pub fn revert(&self, state: &mut SceneState) {
        match self {
            Self::Background { previous, .. } => state.background.clone_from(previous),
            Self::Enter {
                character,
                replaced,
            } => match replaced {
                Some(previous) => {
                    state
                        .on_stage
                        .insert(previous.id.clone(), previous.clone());
                }
                None => {
                    state.on_stage.remove(&character.id);
                }
            },
            Self::Exit { removed, .. } => {
                if let Some(previous) = removed {
                    state
                        .on_stage
                        .insert(previous.id.clone(), previous.clone());
                }
            }
            Self::Dialogue {
                speaker,
                change: Some(change),
                ..
            } => {
                if let Some(character) = state.on_stage.get_mut(speaker) {
                    character.expression.clone_from(&change.from);
                }
            }
            Self::Dialogue { change: None, .. }
            | Self::Narrate { .. }
            | Self::ShowImage { .. }
            | Self::Prompt { .. }
            | Self::Pause { .. } => {}
        }
    }

    /// Convenience form of [`apply`](Self::apply) returning the new state.
    #[must_use]
    pub fn applied_to(&self, mut state: SceneState) -> SceneState {
        self.apply(&mut state);
        state
    }

    /// Convenience form of [`revert`](Self::revert) returning the prior state.
    #[must_use]
    pub fn reverted_from(&self, mut state: SceneState) -> SceneState {
        self.revert(&mut state);
        state
    }
}
