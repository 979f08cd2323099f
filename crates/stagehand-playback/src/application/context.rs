//! Playback execution contexts.
//!
//! The engine runs every command through one routine parameterized by a
//! context. The animated context performs real delays and listens for user
//! signals; the silent context turns every suspension point into a no-op so
//! the same routine doubles as instant replay.

use std::time::Duration;

use async_trait::async_trait;
use stagehand_markup::Node;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::application::render::Renderer;
use crate::domain::signal::{Signal, Suspend, UserAction, Wake};
use crate::domain::view::SceneView;

/// Where an animated context reads user signals from.
#[async_trait]
pub trait SignalSource: Send {
    /// Waits for the next signal; `None` once the source is closed.
    async fn next_signal(&mut self) -> Option<Signal>;
}

#[async_trait]
impl SignalSource for mpsc::UnboundedReceiver<Signal> {
    async fn next_signal(&mut self) -> Option<Signal> {
        self.recv().await
    }
}

/// The capabilities a playback routine needs while executing commands.
#[async_trait]
pub trait PlaybackContext: Send {
    /// Whether suspensions take real time and frames are drawn.
    fn is_animated(&self) -> bool;

    /// Suspends for `duration` at a named point. Ends early on skip or
    /// cancel.
    async fn suspend(&mut self, point: Suspend, duration: Duration) -> Wake;

    /// Waits for the user to resolve a wait point.
    async fn wait_for_user(&mut self, expects_choice: bool) -> UserAction;

    /// Draws a new frame.
    fn present(&mut self, view: SceneView);

    /// Redraws the current frame with the text box replaced by `content`.
    fn present_reveal(&mut self, content: Vec<Node>, complete: bool);
}

/// Context that animates in real time and draws every frame.
pub struct AnimatedContext<'a> {
    signals: &'a mut dyn SignalSource,
    renderer: &'a mut dyn Renderer,
    frame: SceneView,
}

impl<'a> AnimatedContext<'a> {
    /// Creates a context reading signals from `signals` and drawing through
    /// `renderer`.
    pub fn new(signals: &'a mut dyn SignalSource, renderer: &'a mut dyn Renderer) -> Self {
        Self {
            signals,
            renderer,
            frame: SceneView::default(),
        }
    }
}

#[async_trait]
impl PlaybackContext for AnimatedContext<'_> {
    fn is_animated(&self) -> bool {
        true
    }

    async fn suspend(&mut self, point: Suspend, duration: Duration) -> Wake {
        if duration.is_zero() {
            return Wake::Elapsed;
        }
        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                () = sleep_until(deadline) => return Wake::Elapsed,
                signal = self.signals.next_signal() => match signal {
                    Some(Signal::Skip | Signal::Advance) => {
                        debug!(?point, "suspension skipped");
                        return Wake::Skipped;
                    }
                    Some(Signal::Cancel) | None => return Wake::Cancelled,
                    Some(Signal::Choice(_)) => debug!(?point, "choice ignored outside a prompt"),
                },
            }
        }
    }

    async fn wait_for_user(&mut self, expects_choice: bool) -> UserAction {
        loop {
            match self.signals.next_signal().await {
                Some(Signal::Advance) if !expects_choice => return UserAction::Advance,
                Some(Signal::Choice(text)) if expects_choice => return UserAction::Choice(text),
                Some(Signal::Cancel) | None => return UserAction::Cancelled,
                Some(other) => debug!(?other, expects_choice, "signal ignored at wait point"),
            }
        }
    }

    fn present(&mut self, view: SceneView) {
        self.frame = view;
        self.renderer.render(&self.frame);
    }

    fn present_reveal(&mut self, content: Vec<Node>, complete: bool) {
        if let Some(text) = self.frame.text.as_mut() {
            text.content = content;
            text.complete = complete;
        }
        self.renderer.render(&self.frame);
    }
}

/// Context with no delays, no waits and no frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentContext;

#[async_trait]
impl PlaybackContext for SilentContext {
    fn is_animated(&self) -> bool {
        false
    }

    async fn suspend(&mut self, _point: Suspend, _duration: Duration) -> Wake {
        Wake::Elapsed
    }

    async fn wait_for_user(&mut self, _expects_choice: bool) -> UserAction {
        UserAction::Advance
    }

    fn present(&mut self, _view: SceneView) {}

    fn present_reveal(&mut self, _content: Vec<Node>, _complete: bool) {}
}
