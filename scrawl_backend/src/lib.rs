pub mod shared_types;
pub mod websocket;

use axum::{Router, routing::get};
use std::sync::Arc;
use websocket::RoomHub;

/// Build the relay router. CORS is layered on in `main` so tests can
/// serve the bare router on an ephemeral port.
pub fn app(hub: Arc<RoomHub>) -> Router {
    Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .with_state(hub)
}
