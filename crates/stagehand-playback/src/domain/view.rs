//! Renderer-facing snapshot of the scene.
//!
//! A view is derived entirely from the scene state plus the command queue
//! and its cursor, so an instant jump and a step-by-step replay to the same
//! index produce the same view.

use serde::Serialize;
use stagehand_core::roster::CharacterRoster;
use stagehand_markup::Node;
use stagehand_stage::domain::commands::StageCommand;
use stagehand_stage::domain::queue::CommandQueue;
use stagehand_stage::domain::scene::{Position, SceneState};
use uuid::Uuid;

/// A character as the renderer draws it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterView {
    /// Character identifier.
    pub id: String,
    /// Display name from the roster.
    pub name: String,
    /// Base image from the roster.
    pub image: String,
    /// Sprite expression, if set.
    pub expression: Option<String>,
    /// Stage slot.
    pub position: Position,
    /// Whether the roster did not know this id.
    pub placeholder: bool,
}

/// Who is speaking the current line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerView {
    /// Character identifier.
    pub id: String,
    /// Display name from the roster.
    pub name: String,
}

/// The text box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextView {
    /// Speaker for dialogue; `None` for narration.
    pub speaker: Option<SpeakerView>,
    /// Revealed content; a structurally valid prefix while animating.
    pub content: Vec<Node>,
    /// Whether the full line is shown.
    pub complete: bool,
}

/// An open prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptView {
    /// Description shown above the choices.
    pub info: String,
    /// Choice texts in order.
    pub choices: Vec<String>,
}

/// A displayed illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    /// Image reference.
    pub src: String,
    /// Character the image belongs to, if any.
    pub from: Option<String>,
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneView {
    /// Active background.
    pub background: Option<String>,
    /// Characters on stage, left to right.
    pub characters: Vec<CharacterView>,
    /// Text box contents.
    pub text: Option<TextView>,
    /// Open prompt.
    pub prompt: Option<PromptView>,
    /// Displayed illustration.
    pub image: Option<ImageView>,
    /// Index of the last executed command.
    pub cursor: Option<usize>,
    /// Message that contributed the command at the cursor.
    pub message_id: Option<Uuid>,
    /// Number of commands in the queue.
    pub length: usize,
    /// Whether a playback operation is running.
    pub busy: bool,
    /// Whether a message is still streaming in.
    pub streaming: bool,
}

impl SceneView {
    /// Builds the view of `state` at the queue's cursor.
    ///
    /// The text box and prompt come from the latest wait point at or before
    /// the cursor. An illustration stays visible through the first wait point
    /// after it.
    #[must_use]
    pub fn build(state: &SceneState, queue: &CommandQueue, roster: &dyn CharacterRoster) -> Self {
        let mut characters: Vec<CharacterView> = state
            .on_stage
            .values()
            .map(|character| {
                let known = roster.lookup(&character.id);
                let placeholder = known.is_none();
                let profile = known.unwrap_or_else(|| roster.resolve(&character.id));
                CharacterView {
                    id: character.id.clone(),
                    name: profile.name,
                    image: profile.image,
                    expression: character.expression.clone(),
                    position: character.position,
                    placeholder,
                }
            })
            .collect();
        characters.sort_by_key(|c| position_rank(c.position));

        let mut view = Self {
            background: state.background.clone(),
            characters,
            cursor: queue.cursor(),
            message_id: queue.cursor().and_then(|index| queue.message_at(index)),
            length: queue.len(),
            ..Self::default()
        };

        let Some(cursor) = queue.cursor() else {
            return view;
        };
        let anchor = if queue.get(cursor).is_some_and(StageCommand::is_wait_point) {
            Some(cursor)
        } else {
            queue.previous_wait_point(cursor)
        };

        match anchor.and_then(|index| queue.get(index)) {
            Some(StageCommand::Dialogue {
                speaker, content, ..
            }) => {
                view.text = Some(TextView {
                    speaker: Some(SpeakerView {
                        id: speaker.clone(),
                        name: roster.resolve(speaker).name,
                    }),
                    content: content.clone(),
                    complete: true,
                });
            }
            Some(StageCommand::Narrate { content }) => {
                view.text = Some(TextView {
                    speaker: None,
                    content: content.clone(),
                    complete: true,
                });
            }
            Some(StageCommand::Prompt { info, choices }) => {
                view.prompt = Some(PromptView {
                    info: info.clone(),
                    choices: choices.clone(),
                });
            }
            _ => {}
        }

        let floor = anchor
            .and_then(|index| queue.previous_wait_point(index))
            .map_or(0, |index| index + 1);
        view.image = queue.commands()[floor..=cursor]
            .iter()
            .rev()
            .find_map(|command| match command {
                StageCommand::ShowImage { src, from } => Some(ImageView {
                    src: src.clone(),
                    from: from.clone(),
                }),
                _ => None,
            });
        view
    }
}

fn position_rank(position: Position) -> u8 {
    match position {
        Position::Left => 0,
        Position::Center => 1,
        Position::Right => 2,
    }
}
