//! Playback engine.
//!
//! Owns the command queue, the live scene state and the cursor. Every
//! forward step goes through one execution routine parameterized by a
//! [`PlaybackContext`]: animated for normal playback, silent for instant
//! jumps. Backward steps revert commands in reverse order without animation.

use std::ops::Range;
use std::sync::Arc;

use stagehand_core::clock::Clock;
use stagehand_core::error::StageError;
use stagehand_core::history::ChatHistory;
use stagehand_core::message::Message;
use stagehand_core::roster::CharacterRoster;
use stagehand_stage::application::compiler::{compile_message, compile_stream};
use stagehand_stage::domain::commands::StageCommand;
use stagehand_stage::domain::queue::CommandQueue;
use stagehand_stage::domain::scene::SceneState;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::context::{PlaybackContext, SilentContext};
use crate::application::render::Renderer;
use crate::application::streaming::StreamAdapter;
use crate::application::typewriter::{RevealOutcome, RevealTarget, Typewriter};
use crate::domain::config::PlaybackConfig;
use crate::domain::signal::{Suspend, UserAction, Wake};
use crate::domain::view::SceneView;

/// How a forward playback operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Nothing to play: the queue is empty or the cursor is already there.
    Idle,
    /// The target command was reached.
    Completed,
    /// The operation stopped early; the cursor is at `at`.
    Cancelled {
        /// Index of the last executed command.
        at: usize,
    },
}

enum Step {
    Continue,
    Stop,
}

/// Drives the scene through the command queue.
pub struct PlaybackEngine {
    queue: CommandQueue,
    state: SceneState,
    shadow: SceneState,
    config: PlaybackConfig,
    typewriter: Typewriter,
    text_box: RevealTarget,
    streams: StreamAdapter,
    roster: Arc<dyn CharacterRoster>,
    clock: Arc<dyn Clock>,
    outbox: Option<mpsc::UnboundedSender<Message>>,
    resolved_prompt: Option<usize>,
    busy: bool,
}

impl PlaybackEngine {
    /// Creates an engine with an empty queue.
    #[must_use]
    pub fn new(
        config: PlaybackConfig,
        roster: Arc<dyn CharacterRoster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue: CommandQueue::new(),
            state: SceneState::default(),
            shadow: SceneState::default(),
            typewriter: Typewriter::new(&config),
            config,
            text_box: RevealTarget::new(),
            streams: StreamAdapter::new(),
            roster,
            clock,
            outbox: None,
            resolved_prompt: None,
            busy: false,
        }
    }

    /// Sends user messages produced by prompt choices to `outbox`.
    #[must_use]
    pub fn with_outbox(mut self, outbox: mpsc::UnboundedSender<Message>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Returns the playback configuration.
    #[must_use]
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Returns the command queue.
    #[must_use]
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Returns the live scene state.
    #[must_use]
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Index of the last executed command.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.queue.cursor()
    }

    /// Whether a forward playback operation is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The message currently streaming in, if any.
    #[must_use]
    pub fn streaming(&self) -> Option<Uuid> {
        self.streams.active()
    }

    /// The frame for the current state and cursor.
    #[must_use]
    pub fn view(&self) -> SceneView {
        let mut view = SceneView::build(&self.state, &self.queue, self.roster.as_ref());
        view.busy = self.busy;
        view.streaming = self.streams.is_streaming();
        view
    }

    /// Whether the cursor rests on a prompt that has not been answered yet.
    #[must_use]
    pub fn awaiting_choice(&self) -> bool {
        self.open_prompt().is_some()
    }

    fn open_prompt(&self) -> Option<&[String]> {
        let cursor = self.queue.cursor()?;
        if self.resolved_prompt == Some(cursor) {
            return None;
        }
        match self.queue.get(cursor)? {
            StageCommand::Prompt { choices, .. } => Some(choices),
            _ => None,
        }
    }

    fn move_cursor(&mut self, index: Option<usize>) {
        self.queue.set_cursor(index);
        self.resolved_prompt = None;
    }

    fn ensure_unlocked(&self) -> Result<(), StageError> {
        match self.streams.active() {
            Some(message_id) => Err(StageError::NavigationLocked(message_id)),
            None => Ok(()),
        }
    }

    /// Compiles one complete message and appends its commands. Degraded
    /// messages go to the renderer as plain text.
    pub fn ingest(&mut self, message: &Message, renderer: &mut dyn Renderer) -> Range<usize> {
        let compiled = compile_message(message, &mut self.shadow, self.config.compile_options());
        if let Some(plain) = &compiled.plain {
            renderer.render_plain(plain);
        }
        self.queue.append(compiled.message_id, compiled.commands)
    }

    /// Replaces the queue with the compiled `messages` and jumps instantly to
    /// the end. Open streams are dropped.
    #[instrument(skip(self, messages, renderer), fields(messages = messages.len()))]
    pub async fn load_messages(&mut self, messages: &[Message], renderer: &mut dyn Renderer) {
        self.streams.clear();
        self.queue.clear();
        self.shadow = SceneState::default();
        for message in messages {
            self.ingest(message, renderer);
        }
        info!(commands = self.queue.len(), "history compiled");
        self.replay_silently(self.queue.last_index()).await;
        renderer.render(&self.view());
    }

    /// Loads the conversation from `history` and jumps to its end.
    ///
    /// # Errors
    ///
    /// Returns the history provider's error.
    pub async fn load_history(
        &mut self,
        history: &dyn ChatHistory,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StageError> {
        let messages = history.load_messages().await?;
        self.load_messages(&messages, renderer).await;
        Ok(())
    }

    /// Materializes the state at `index` instantly by replaying every
    /// command from the start through a silent context, then draws one
    /// frame. `None` resets to the empty stage.
    ///
    /// # Errors
    ///
    /// Returns `StageError::NavigationLocked` while a message is streaming.
    #[instrument(skip(self, renderer))]
    pub async fn jump_to(
        &mut self,
        index: Option<usize>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StageError> {
        self.ensure_unlocked()?;
        self.replay_silently(index).await;
        renderer.render(&self.view());
        Ok(())
    }

    async fn replay_silently(&mut self, index: Option<usize>) {
        self.state = SceneState::default();
        self.move_cursor(None);
        let Some(target) = index.and_then(|i| self.queue.clamp(i)) else {
            return;
        };
        let mut silent = SilentContext;
        for i in 0..=target {
            self.execute(i, &mut silent, false).await;
        }
    }

    /// Plays forward from the cursor through `index`, animating every
    /// command. Wait points strictly before the target wait for the user;
    /// the target itself is presented without waiting.
    ///
    /// # Errors
    ///
    /// Returns `StageError::NavigationLocked` while a message is streaming.
    #[instrument(skip(self, ctx))]
    pub async fn advance_to(
        &mut self,
        index: usize,
        ctx: &mut dyn PlaybackContext,
    ) -> Result<PlaybackOutcome, StageError> {
        self.ensure_unlocked()?;
        Ok(self.play_forward(index, ctx).await)
    }

    /// Plays forward to the next wait point, or to the end of the queue if
    /// none is left.
    ///
    /// # Errors
    ///
    /// Returns `StageError::NavigationLocked` while a message is streaming.
    pub async fn next(
        &mut self,
        ctx: &mut dyn PlaybackContext,
    ) -> Result<PlaybackOutcome, StageError> {
        self.ensure_unlocked()?;
        let target = self
            .queue
            .next_wait_point(self.queue.cursor())
            .or(self.queue.last_index());
        match target {
            Some(index) => Ok(self.play_forward(index, ctx).await),
            None => Ok(PlaybackOutcome::Idle),
        }
    }

    async fn play_forward(
        &mut self,
        index: usize,
        ctx: &mut dyn PlaybackContext,
    ) -> PlaybackOutcome {
        let Some(target) = self.queue.clamp(index) else {
            debug!("queue is empty; nothing to play");
            return PlaybackOutcome::Idle;
        };
        let start = self.queue.cursor().map_or(0, |cursor| cursor + 1);
        if start > target {
            return PlaybackOutcome::Idle;
        }

        self.busy = true;
        let mut outcome = PlaybackOutcome::Completed;
        for i in start..=target {
            if let Step::Stop = self.execute(i, ctx, i != target).await {
                info!(at = i, "playback cancelled");
                outcome = PlaybackOutcome::Cancelled { at: i };
                break;
            }
        }
        self.busy = false;
        ctx.present(self.view());
        outcome
    }

    /// Executes the command at `index`: applies it to the live state, moves
    /// the cursor, then animates it through `ctx`. With `wait`, a wait point
    /// holds until the user resolves it.
    async fn execute(&mut self, index: usize, ctx: &mut dyn PlaybackContext, wait: bool) -> Step {
        let Some(command) = self.queue.get(index).cloned() else {
            return Step::Continue;
        };
        command.apply(&mut self.state);
        self.move_cursor(Some(index));

        let mut frame = if ctx.is_animated() {
            debug!(index, command_type = command.command_type(), "executing command");
            self.view()
        } else {
            SceneView::default()
        };

        let wake = match &command {
            StageCommand::Background { .. } => {
                ctx.present(frame);
                ctx.suspend(Suspend::Transition, self.config.crossfade).await
            }
            StageCommand::Enter { .. } | StageCommand::Exit { .. } => {
                ctx.present(frame);
                ctx.suspend(Suspend::Transition, self.config.stage_transition)
                    .await
            }
            StageCommand::ShowImage { .. } => {
                ctx.present(frame);
                ctx.suspend(Suspend::Transition, self.config.image_transition)
                    .await
            }
            StageCommand::Pause { duration } => {
                ctx.present(frame);
                ctx.suspend(Suspend::Pause, *duration).await
            }
            StageCommand::Dialogue { content, .. } | StageCommand::Narrate { content } => {
                if let Some(text) = frame.text.as_mut() {
                    text.content.clear();
                    text.complete = false;
                }
                ctx.present(frame);
                match self.typewriter.reveal(&self.text_box, content, ctx).await {
                    RevealOutcome::Completed | RevealOutcome::Skipped => {}
                    RevealOutcome::Cancelled | RevealOutcome::Superseded => return Step::Stop,
                }
                if !wait {
                    return Step::Continue;
                }
                return match ctx.wait_for_user(false).await {
                    UserAction::Cancelled => Step::Stop,
                    UserAction::Advance | UserAction::Choice(_) => Step::Continue,
                };
            }
            StageCommand::Prompt { choices, .. } => {
                ctx.present(frame);
                if !wait {
                    return Step::Continue;
                }
                loop {
                    match ctx.wait_for_user(true).await {
                        UserAction::Choice(text) if choices.contains(&text) => {
                            self.resolved_prompt = Some(index);
                            self.emit_choice(text);
                            return Step::Continue;
                        }
                        UserAction::Choice(text) => {
                            warn!(choice = %text, "choice is not one of the listed options");
                        }
                        UserAction::Advance => return Step::Continue,
                        UserAction::Cancelled => return Step::Stop,
                    }
                }
            }
        };

        match wake {
            Wake::Cancelled => Step::Stop,
            Wake::Elapsed | Wake::Skipped => Step::Continue,
        }
    }

    /// Steps back to the previous wait point without animation.
    ///
    /// # Errors
    ///
    /// Returns `StageError::NavigationLocked` while a message is streaming.
    pub fn previous(&mut self, renderer: &mut dyn Renderer) -> Result<(), StageError> {
        self.ensure_unlocked()?;
        let Some(cursor) = self.queue.cursor() else {
            return Ok(());
        };
        self.retreat_to(self.queue.previous_wait_point(cursor), renderer)
    }

    /// Reverts commands from the cursor down to (excluding) `index`, newest
    /// first, then draws the target frame. `None` reverts everything.
    ///
    /// # Errors
    ///
    /// Returns `StageError::NavigationLocked` while a message is streaming.
    #[instrument(skip(self, renderer))]
    pub fn retreat_to(
        &mut self,
        index: Option<usize>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StageError> {
        self.ensure_unlocked()?;
        let Some(cursor) = self.queue.cursor() else {
            return Ok(());
        };
        let target = index.and_then(|i| self.queue.clamp(i));
        if target.is_some_and(|t| t >= cursor) {
            return Ok(());
        }

        let floor = target.map_or(0, |t| t + 1);
        for i in (floor..=cursor).rev() {
            if let Some(command) = self.queue.get(i) {
                command.revert(&mut self.state);
            }
        }
        self.move_cursor(target);
        renderer.render(&self.view());
        Ok(())
    }

    /// Resolves the open prompt with `text` and emits it as a user message.
    ///
    /// A prompt resolves once per visit; moving the cursor opens it again.
    /// Returns `None` when no unanswered prompt is at the cursor, when `text`
    /// is not one of its choices, or while a message is streaming.
    pub fn select_choice(&mut self, text: &str) -> Option<Message> {
        if let Some(message_id) = self.streams.active() {
            warn!(%message_id, "choice ignored while a message is streaming");
            return None;
        }
        let Some(choices) = self.open_prompt() else {
            warn!("choice selected with no open prompt");
            return None;
        };
        if !choices.iter().any(|choice| choice == text) {
            warn!(choice = text, "choice is not one of the listed options");
            return None;
        }
        self.resolved_prompt = self.queue.cursor();
        Some(self.emit_choice(text.to_owned()))
    }

    fn emit_choice(&self, text: String) -> Message {
        let message = Message::user(text, self.clock.as_ref());
        info!(message_id = %message.id, "choice selected");
        if let Some(outbox) = &self.outbox
            && outbox.send(message.clone()).is_err()
        {
            warn!(message_id = %message.id, "outbox closed; choice message dropped");
        }
        message
    }

    /// Marks `message_id` as streaming before its first token arrives.
    pub fn open_stream(&mut self, message_id: Uuid) {
        self.streams.open(message_id);
    }

    /// Buffers one token of a streaming message.
    pub fn push_token(&mut self, message_id: Uuid, token: &str) {
        self.streams.push(message_id, token);
    }

    /// Compiles a finished stream and appends its commands.
    ///
    /// # Errors
    ///
    /// Returns `StageError::StreamNotFound` if no stream is open for the id.
    pub fn complete_stream(
        &mut self,
        message_id: Uuid,
        renderer: &mut dyn Renderer,
    ) -> Result<Range<usize>, StageError> {
        self.finish_stream(message_id, false, renderer)
    }

    /// Compiles a stream that was stopped or failed early. The partial text
    /// is recovered and a "generation stopped" marker is appended.
    ///
    /// # Errors
    ///
    /// Returns `StageError::StreamNotFound` if no stream is open for the id.
    pub fn abort_stream(
        &mut self,
        message_id: Uuid,
        renderer: &mut dyn Renderer,
    ) -> Result<Range<usize>, StageError> {
        self.finish_stream(message_id, true, renderer)
    }

    #[instrument(skip(self, renderer))]
    fn finish_stream(
        &mut self,
        message_id: Uuid,
        stopped: bool,
        renderer: &mut dyn Renderer,
    ) -> Result<Range<usize>, StageError> {
        let text = self.streams.finish(message_id)?;
        let compiled = compile_stream(
            message_id,
            &text,
            stopped,
            &mut self.shadow,
            self.config.compile_options(),
        );
        if let Some(plain) = &compiled.plain {
            renderer.render_plain(plain);
        }
        let range = self.queue.append(message_id, compiled.commands);
        info!(commands = range.len(), "stream compiled");
        Ok(range)
    }

    /// Animates exactly across `range`, first jumping silently to the
    /// command before it if the cursor is elsewhere.
    ///
    /// `range` is the output of a stream that just finished, so streams that
    /// are still open do not hold it back. Their commands append after it.
    pub async fn play_range(
        &mut self,
        range: Range<usize>,
        ctx: &mut dyn PlaybackContext,
    ) -> PlaybackOutcome {
        let Some(last) = range.end.checked_sub(1).filter(|&last| last >= range.start) else {
            return PlaybackOutcome::Idle;
        };
        let before = range.start.checked_sub(1);
        if self.queue.cursor() != before {
            self.replay_silently(before).await;
        }
        self.play_forward(last, ctx).await
    }
}
