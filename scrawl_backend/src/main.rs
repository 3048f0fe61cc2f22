use axum::http::HeaderValue;
use scrawl_backend::{app, websocket::RoomHub};
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrawl_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- CORS Setup ---
    // The only configuration beyond the listen address: "*" (the
    // default) opens the relay to any origin, anything else is taken
    // as one exact allowed origin.
    let cors_origin = env::var("SCRAWL_CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
    let cors = if cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origin = cors_origin
            .parse::<HeaderValue>()
            .expect("SCRAWL_CORS_ORIGIN is not a valid origin");
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let hub = Arc::new(RoomHub::default());
    let app = app(hub).layer(cors);

    // --- Server Launch ---
    // Bind to 0.0.0.0 so the relay is reachable from other hosts and
    // containers.
    let addr = env::var("SCRAWL_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = TcpListener::bind(&addr).await.unwrap();
    info!("Server listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
