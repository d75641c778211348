use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// Import modules
mod constants;
mod geocoding;
mod heatmap;
mod html_template;
mod map_view;
mod search;
mod server;
mod settings;
mod signal;
mod traffic;
mod utils;

#[cfg(test)]
mod testing;

use constants::{DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_ZOOM, EVENT_CHANNEL_CAPACITY};
use geocoding::NominatimClient;
use heatmap::HeatLayer;
use map_view::{LatLng, MapView, TileLayer};
use search::SearchController;
use server::{events::EventNotifier, start_server, AppState};
use settings::Settings;
use traffic::TrafficDataset;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_traffic(settings: &Settings) -> Option<Arc<TrafficDataset>> {
    let path = settings.traffic_data_path.as_deref()?;
    match TrafficDataset::load(path) {
        Ok(dataset) if dataset.is_empty() => {
            tracing::warn!("⚠️  Traffic data file {} has no rows", path.display());
            Some(Arc::new(dataset))
        }
        Ok(dataset) => {
            tracing::info!(
                "🚦 Loaded {} traffic readings from {}",
                dataset.len(),
                path.display()
            );
            Some(Arc::new(dataset))
        }
        Err(e) => {
            tracing::error!("❌ Could not load traffic data {}: {}", path.display(), e);
            None
        }
    }
}

fn build_map_view(settings: &Settings) -> MapView {
    let tile_layer = TileLayer {
        url_template: settings.tile_url.clone(),
        max_zoom: settings.tile_max_zoom,
        ..TileLayer::default()
    };
    MapView::with_layers(
        LatLng::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG),
        DEFAULT_ZOOM,
        tile_layer,
        HeatLayer::traffic(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    tracing::info!("🗺️  Traffic Heatmap v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = Settings::config_path();
    let settings = Settings::load().context("Failed to load settings")?;
    if config_path.exists() {
        tracing::info!("⚙️  Loaded settings from {}", config_path.display());
    } else {
        match settings.save() {
            Ok(()) => tracing::info!("⚙️  Wrote default settings to {}", config_path.display()),
            Err(e) => tracing::warn!("⚠️  Could not write default settings: {:#}", e),
        }
    }

    let geocoder = NominatimClient::new(
        settings.geocoder_url.clone(),
        &settings.geocoder_user_agent,
        settings.geocoder_timeout(),
    )
    .context("Failed to build geocoding client")?;
    tracing::info!("🌍 Geocoding via {}", geocoder.endpoint());

    let (event_sender, _event_receiver) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let notifier = Arc::new(EventNotifier::new(event_sender.clone()));

    let view = build_map_view(&settings);
    tracing::info!(
        "🧱 Tiles from {} (max zoom {})",
        view.tile_layer().url_template,
        view.tile_layer().max_zoom
    );
    tracing::info!(
        "🔥 Heat layer ready with {} points",
        view.heat_layer().points().len()
    );

    let controller = SearchController::new(view, Arc::new(geocoder), notifier)
        .supersede_stale(settings.supersede_stale_searches);
    if !settings.supersede_stale_searches {
        tracing::warn!("⚠️  Stale search responses will be applied (last response wins)");
    }

    let app_state = AppState {
        controller: Arc::new(controller),
        event_sender,
        traffic: load_traffic(&settings),
    };

    if settings.auto_open_browser {
        let url = format!("http://127.0.0.1:{}", settings.port);
        if let Err(e) = utils::open_browser(&url) {
            tracing::warn!("⚠️  Failed to open browser: {}", e);
        }
    }

    start_server(app_state, settings.port).await?;

    Ok(())
}
