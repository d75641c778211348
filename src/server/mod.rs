use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

pub mod events;
pub mod handlers;
pub mod state;

pub use self::state::AppState;
use handlers::{
    decide_signal, get_heatmap, get_map, get_traffic, index_html, map_events_stream, script_js,
    search_location, style_css,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/style.css", get(style_css))
        .route("/script.js", get(script_js))
        .route("/api/map", get(get_map))
        .route("/api/heatmap", get(get_heatmap))
        .route("/api/search", get(search_location))
        .route("/api/traffic", get(get_traffic))
        .route("/api/signal", post(decide_signal))
        .route("/api/events", get(map_events_stream))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("✅ HTTP server started successfully at http://{}", addr);
    tracing::info!("   🗺️  API endpoints:");
    tracing::info!("      - GET /api/map - Current map view");
    tracing::info!("      - GET /api/heatmap - Heat layer points and options");
    tracing::info!("      - GET /api/search?q=<place> - Geocode and recenter");
    tracing::info!("      - GET /api/traffic?hour=<0-23> - Hourly traffic heat and metrics");
    tracing::info!("      - POST /api/signal - Signal plan for lane congestion scores");
    tracing::info!("      - GET /api/events - Server-sent map events");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("🛑 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Received Ctrl-C, shutting down");
}
