//! Renderer port.

use stagehand_stage::application::compiler::PlainMessage;
use tokio::sync::watch;

use crate::domain::view::SceneView;

/// Receives every frame playback produces.
pub trait Renderer: Send {
    /// Draws a scene frame.
    fn render(&mut self, view: &SceneView);

    /// Shows a message that could not be staged, as escaped plain text.
    fn render_plain(&mut self, message: &PlainMessage);
}

/// Renderer that publishes the latest frame and the plain-message log over
/// `watch` channels, for surfaces that poll state.
#[derive(Debug)]
pub struct WatchRenderer {
    scene: watch::Sender<SceneView>,
    plain: watch::Sender<Vec<PlainMessage>>,
}

/// Read side of a [`WatchRenderer`].
#[derive(Debug, Clone)]
pub struct WatchSubscriber {
    /// Latest scene frame.
    pub scene: watch::Receiver<SceneView>,
    /// Every plain message rendered so far.
    pub plain: watch::Receiver<Vec<PlainMessage>>,
}

impl WatchRenderer {
    /// Creates a renderer and its subscriber.
    #[must_use]
    pub fn channel() -> (Self, WatchSubscriber) {
        let (scene, scene_rx) = watch::channel(SceneView::default());
        let (plain, plain_rx) = watch::channel(Vec::new());
        (
            Self { scene, plain },
            WatchSubscriber {
                scene: scene_rx,
                plain: plain_rx,
            },
        )
    }
}

impl Renderer for WatchRenderer {
    fn render(&mut self, view: &SceneView) {
        self.scene.send_replace(view.clone());
    }

    fn render_plain(&mut self, message: &PlainMessage) {
        self.plain.send_modify(|log| log.push(message.clone()));
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_watch_renderer_publishes_latest_frame_and_plain_log() {
        // Arrange
        let (mut renderer, subscriber) = WatchRenderer::channel();
        let view = SceneView {
            background: Some("forest.png".to_owned()),
            ..SceneView::default()
        };
        let plain = PlainMessage {
            message_id: Uuid::new_v4(),
            escaped_text: "just prose".to_owned(),
            error: "no scene markup found".to_owned(),
        };

        // Act
        renderer.render(&SceneView::default());
        renderer.render(&view);
        renderer.render_plain(&plain);

        // Assert
        assert_eq!(*subscriber.scene.borrow(), view);
        assert_eq!(*subscriber.plain.borrow(), vec![plain]);
    }
}
