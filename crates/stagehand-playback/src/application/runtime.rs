//! Engine runtime.
//!
//! A single task owns the engine and processes one input at a time. While a
//! forward playback operation runs, the task keeps reading its inbox through
//! the animated context: signals steer the running operation, navigation
//! requests are refused as busy, and everything else is deferred until the
//! operation ends.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use stagehand_core::error::StageError;
use stagehand_core::history::ChatHistory;
use stagehand_core::message::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::context::{AnimatedContext, SignalSource};
use crate::application::engine::PlaybackEngine;
use crate::application::render::Renderer;
use crate::domain::signal::Signal;
use crate::domain::view::SceneView;

type Reply = oneshot::Sender<Result<SceneView, StageError>>;

/// An operation for the engine task.
pub enum Request {
    /// Replace the conversation and jump to its end.
    LoadMessages(Vec<Message>),
    /// Load the conversation from a provider and jump to its end.
    LoadHistory(Arc<dyn ChatHistory>),
    /// Lock navigation for a message that is about to stream.
    OpenStream(Uuid),
    /// Buffer one token of a streaming message.
    Token {
        /// Streaming message.
        message_id: Uuid,
        /// Token text.
        token: String,
    },
    /// Compile a finished stream and play its commands.
    CompleteStream(Uuid),
    /// Compile a stopped or failed stream and play its commands.
    AbortStream(Uuid),
    /// Play forward to the next wait point.
    Next,
    /// Step back to the previous wait point.
    Previous,
    /// Play forward through an index.
    AdvanceTo(usize),
    /// Step back to an index; `None` is before the first command.
    RetreatTo(Option<usize>),
    /// Jump instantly to an index; `None` is before the first command.
    JumpTo(Option<usize>),
    /// The current frame, answered once any running operation has finished.
    Snapshot,
}

impl Request {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadMessages(_) => "load_messages",
            Self::LoadHistory(_) => "load_history",
            Self::OpenStream(_) => "open_stream",
            Self::Token { .. } => "token",
            Self::CompleteStream(_) => "complete_stream",
            Self::AbortStream(_) => "abort_stream",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::AdvanceTo(_) => "advance_to",
            Self::RetreatTo(_) => "retreat_to",
            Self::JumpTo(_) => "jump_to",
            Self::Snapshot => "snapshot",
        }
    }

    /// Whether the request moves the cursor. Such requests are refused while
    /// another operation is running.
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::LoadMessages(_)
                | Self::LoadHistory(_)
                | Self::Next
                | Self::Previous
                | Self::AdvanceTo(_)
                | Self::RetreatTo(_)
                | Self::JumpTo(_)
        )
    }
}

enum EngineInput {
    Signal(Signal),
    Request(Request, Option<Reply>),
}

/// Cloneable sender side of the engine task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineInput>,
}

impl EngineHandle {
    /// Whether the engine task is still accepting input.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Delivers a user signal.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn signal(&self, signal: Signal) -> Result<(), StageError> {
        self.tx
            .send(EngineInput::Signal(signal))
            .map_err(|_| StageError::EngineStopped)
    }

    /// Resolves the current wait point, or plays to the next one when idle.
    /// An idle advance is ignored while an unanswered prompt is at the
    /// cursor.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn advance(&self) -> Result<(), StageError> {
        self.signal(Signal::Advance)
    }

    /// Finishes the current reveal immediately.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn skip(&self) -> Result<(), StageError> {
        self.signal(Signal::Skip)
    }

    /// Resolves the open prompt with `text`.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn select_choice(&self, text: impl Into<String>) -> Result<(), StageError> {
        self.signal(Signal::Choice(text.into()))
    }

    /// Stops the running operation after the current command.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn cancel(&self) -> Result<(), StageError> {
        self.signal(Signal::Cancel)
    }

    /// Sends a request and waits for the frame it produced.
    ///
    /// # Errors
    ///
    /// Returns the request's own error, `StageError::Busy` if a navigation
    /// request arrived during another operation, or
    /// `StageError::EngineStopped` if the engine task has exited.
    pub async fn request(&self, request: Request) -> Result<SceneView, StageError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineInput::Request(request, Some(reply)))
            .map_err(|_| StageError::EngineStopped)?;
        response.await.map_err(|_| StageError::EngineStopped)?
    }

    /// Sends a request without waiting for it to be processed. Failures are
    /// logged by the engine task.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn post(&self, request: Request) -> Result<(), StageError> {
        self.tx
            .send(EngineInput::Request(request, None))
            .map_err(|_| StageError::EngineStopped)
    }

    /// Buffers one token of a streaming message.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EngineStopped` if the engine task has exited.
    pub fn push_token(&self, message_id: Uuid, token: impl Into<String>) -> Result<(), StageError> {
        self.post(Request::Token {
            message_id,
            token: token.into(),
        })
    }
}

struct Inbox {
    rx: mpsc::UnboundedReceiver<EngineInput>,
    deferred: VecDeque<EngineInput>,
}

impl Inbox {
    async fn next(&mut self) -> Option<EngineInput> {
        match self.deferred.pop_front() {
            Some(input) => Some(input),
            None => self.rx.recv().await,
        }
    }
}

#[async_trait]
impl SignalSource for Inbox {
    async fn next_signal(&mut self) -> Option<Signal> {
        loop {
            match self.rx.recv().await? {
                EngineInput::Signal(signal) => return Some(signal),
                EngineInput::Request(request, reply) if request.is_navigation() => {
                    debug!(kind = request.kind(), "request refused while playback is busy");
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(StageError::Busy));
                    }
                }
                deferred @ EngineInput::Request(..) => self.deferred.push_back(deferred),
            }
        }
    }
}

/// Spawns the task that owns `engine` and draws through `renderer`.
#[must_use]
pub fn spawn_engine(
    engine: PlaybackEngine,
    renderer: Box<dyn Renderer>,
) -> (EngineHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let inbox = Inbox {
        rx,
        deferred: VecDeque::new(),
    };
    let task = tokio::spawn(run(engine, renderer, inbox));
    (EngineHandle { tx }, task)
}

async fn run(mut engine: PlaybackEngine, mut renderer: Box<dyn Renderer>, mut inbox: Inbox) {
    info!("playback engine started");
    while let Some(input) = inbox.next().await {
        match input {
            EngineInput::Signal(signal) => {
                on_idle_signal(&mut engine, renderer.as_mut(), &mut inbox, signal).await;
            }
            EngineInput::Request(request, reply) => {
                let kind = request.kind();
                let result = on_request(&mut engine, renderer.as_mut(), &mut inbox, request)
                    .await
                    .map(|()| engine.view());
                if let Err(e) = &result {
                    warn!(kind, error = %e, "request failed");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
        }
    }
    info!("playback engine stopped");
}

async fn on_idle_signal(
    engine: &mut PlaybackEngine,
    renderer: &mut dyn Renderer,
    inbox: &mut Inbox,
    signal: Signal,
) {
    match signal {
        Signal::Advance if engine.awaiting_choice() => {
            debug!("advance ignored until the prompt is answered");
        }
        Signal::Advance => {
            let mut ctx = AnimatedContext::new(inbox, renderer);
            if let Err(e) = engine.next(&mut ctx).await {
                debug!(error = %e, "advance ignored");
            }
        }
        Signal::Choice(text) => {
            if engine.select_choice(&text).is_some() {
                renderer.render(&engine.view());
            }
        }
        Signal::Skip | Signal::Cancel => debug!(?signal, "nothing running; signal ignored"),
    }
}

async fn on_request(
    engine: &mut PlaybackEngine,
    renderer: &mut dyn Renderer,
    inbox: &mut Inbox,
    request: Request,
) -> Result<(), StageError> {
    match request {
        Request::LoadMessages(messages) => {
            engine.load_messages(&messages, renderer).await;
            Ok(())
        }
        Request::LoadHistory(history) => engine.load_history(history.as_ref(), renderer).await,
        Request::OpenStream(message_id) => {
            engine.open_stream(message_id);
            renderer.render(&engine.view());
            Ok(())
        }
        Request::Token { message_id, token } => {
            engine.push_token(message_id, &token);
            Ok(())
        }
        Request::CompleteStream(message_id) => {
            let range = engine.complete_stream(message_id, renderer)?;
            let mut ctx = AnimatedContext::new(inbox, renderer);
            engine.play_range(range, &mut ctx).await;
            Ok(())
        }
        Request::AbortStream(message_id) => {
            let range = engine.abort_stream(message_id, renderer)?;
            let mut ctx = AnimatedContext::new(inbox, renderer);
            engine.play_range(range, &mut ctx).await;
            Ok(())
        }
        Request::Next => {
            let mut ctx = AnimatedContext::new(inbox, renderer);
            engine.next(&mut ctx).await.map(drop)
        }
        Request::AdvanceTo(index) => {
            let mut ctx = AnimatedContext::new(inbox, renderer);
            engine.advance_to(index, &mut ctx).await.map(drop)
        }
        Request::Previous => engine.previous(renderer),
        Request::RetreatTo(index) => engine.retreat_to(index, renderer),
        Request::JumpTo(index) => engine.jump_to(index, renderer).await,
        Request::Snapshot => Ok(()),
    }
}
