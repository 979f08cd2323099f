//! Test renderer — records every frame for later inspection.

use std::sync::{Arc, Mutex};

use stagehand_playback::application::render::Renderer;
use stagehand_playback::domain::view::SceneView;
use stagehand_stage::application::compiler::PlainMessage;

#[derive(Debug, Default)]
struct Recorded {
    frames: Vec<SceneView>,
    plain: Vec<PlainMessage>,
}

/// A renderer that records all frames and plain messages. Clones share the
/// same log, so a test can keep one clone while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingRenderer {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every frame rendered so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn frames(&self) -> Vec<SceneView> {
        self.recorded.lock().unwrap().frames.clone()
    }

    /// Returns the most recent frame.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn last_frame(&self) -> Option<SceneView> {
        self.recorded.lock().unwrap().frames.last().cloned()
    }

    /// Returns a snapshot of every plain message rendered so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn plain_messages(&self) -> Vec<PlainMessage> {
        self.recorded.lock().unwrap().plain.clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, view: &SceneView) {
        self.recorded.lock().unwrap().frames.push(view.clone());
    }

    fn render_plain(&mut self, message: &PlainMessage) {
        self.recorded.lock().unwrap().plain.push(message.clone());
    }
}
