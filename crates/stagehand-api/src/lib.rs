//! Stagehand — HTTP surface for the scene script interpreter.
//!
//! Delivers user signals, navigation requests and stream events into the
//! engine task, and exposes the latest rendered frame as JSON.

pub mod error;
pub mod roster;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the full route tree. Layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1",
            routes::scene::router()
                .merge(routes::history::router())
                .nest("/stream", routes::stream::router())
                .nest("/playback", routes::playback::router()),
        )
        .with_state(state)
}
