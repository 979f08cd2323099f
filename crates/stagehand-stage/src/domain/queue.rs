//! The conversation-wide command queue.

use std::ops::Range;

use uuid::Uuid;

use super::commands::StageCommand;
use super::scene::SceneState;

#[derive(Debug, Clone, PartialEq, Eq)]
struct MessageSpan {
    message_id: Uuid,
    range: Range<usize>,
}

/// Per-message command lists concatenated in chat order, with a cursor.
///
/// The cursor is the index of the last executed command, `None` before the
/// first. Executing `commands[0..=cursor]` from the empty state always yields
/// the current scene state.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<StageCommand>,
    spans: Vec<MessageSpan>,
    cursor: Option<usize>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the queue holds no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All commands in order.
    #[must_use]
    pub fn commands(&self) -> &[StageCommand] {
        &self.commands
    }

    /// The command at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StageCommand> {
        self.commands.get(index)
    }

    /// Index of the last command.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.commands.len().checked_sub(1)
    }

    /// Index of the last executed command.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Moves the cursor. Out-of-range values are clamped to the last command.
    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.cursor = cursor.and_then(|index| self.clamp(index));
    }

    /// Clamps `index` into the queue; `None` when the queue is empty.
    #[must_use]
    pub fn clamp(&self, index: usize) -> Option<usize> {
        self.last_index().map(|last| index.min(last))
    }

    /// Appends one message's commands and returns their index range.
    pub fn append(&mut self, message_id: Uuid, commands: Vec<StageCommand>) -> Range<usize> {
        let start = self.commands.len();
        self.commands.extend(commands);
        let range = start..self.commands.len();
        self.spans.push(MessageSpan {
            message_id,
            range: range.clone(),
        });
        range
    }

    /// The message that contributed the command at `index`.
    #[must_use]
    pub fn message_at(&self, index: usize) -> Option<Uuid> {
        self.spans
            .iter()
            .find(|span| span.range.contains(&index))
            .map(|span| span.message_id)
    }

    /// Drops every command and span and resets the cursor.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.spans.clear();
        self.cursor = None;
    }

    /// Nearest wait point strictly after `from` (`None` scans from the start).
    #[must_use]
    pub fn next_wait_point(&self, from: Option<usize>) -> Option<usize> {
        let start = from.map_or(0, |index| index + 1);
        self.commands
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, command)| command.is_wait_point())
            .map(|(index, _)| index)
    }

    /// Nearest wait point strictly before `from`.
    #[must_use]
    pub fn previous_wait_point(&self, from: usize) -> Option<usize> {
        let end = from.min(self.commands.len());
        self.commands[..end]
            .iter()
            .rposition(StageCommand::is_wait_point)
    }

    /// Replays `commands[0..=through]` from the empty state.
    #[must_use]
    pub fn replay(&self, through: Option<usize>) -> SceneState {
        let mut state = SceneState::default();
        if let Some(last) = through.and_then(|index| self.clamp(index)) {
            for command in &self.commands[..=last] {
                command.apply(&mut state);
            }
        }
        state
    }
}
