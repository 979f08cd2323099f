//! Shared application state.

use std::sync::Arc;

use stagehand_core::message::Message;
use stagehand_playback::application::engine::PlaybackEngine;
use stagehand_playback::application::render::{WatchRenderer, WatchSubscriber};
use stagehand_playback::application::runtime::{EngineHandle, spawn_engine};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Sender side of the engine task.
    pub engine: EngineHandle,
    /// Latest frame and plain-message log.
    pub view: WatchSubscriber,
    /// User messages emitted by choices, waiting to be collected.
    pub outbox: Arc<Mutex<mpsc::UnboundedReceiver<Message>>>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        engine: EngineHandle,
        view: WatchSubscriber,
        outbox: mpsc::UnboundedReceiver<Message>,
    ) -> Self {
        Self {
            engine,
            view,
            outbox: Arc::new(Mutex::new(outbox)),
        }
    }

    /// Spawns the engine task, drawing into a watch renderer and emitting
    /// choices into the outbox. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(engine: PlaybackEngine) -> (Self, JoinHandle<()>) {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let (renderer, view) = WatchRenderer::channel();
        let (handle, task) = spawn_engine(engine.with_outbox(outbox_tx), Box::new(renderer));
        (Self::new(handle, view, outbox_rx), task)
    }
}
