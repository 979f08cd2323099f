//! Route modules grouped by the kind of input they deliver to the engine.

pub mod health;
pub mod history;
pub mod playback;
pub mod scene;
pub mod stream;
