//! Shared test fakes and utilities for the Stagehand interpreter.

mod clock;
mod history;
mod renderer;
mod roster;

pub use clock::FixedClock;
pub use history::{FailingChatHistory, InMemoryChatHistory, assistant, user};
pub use renderer::RecordingRenderer;
pub use roster::StaticRoster;
