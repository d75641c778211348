use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Html, IntoResponse, Json, Response, Sse,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use super::events::MapEvent;
use super::state::AppState;
use crate::constants::DEFAULT_TRAFFIC_HOUR;
use crate::geocoding::GeocodeResult;
use crate::heatmap::HeatLayer;
use crate::html_template::{embedded_asset, render_index};
use crate::map_view::MapSnapshot;
use crate::search::SearchOutcome;
use crate::signal::{signal_decision, SignalState};
use crate::traffic::{HourlyTraffic, TrafficError};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct TrafficParams {
    pub hour: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GeocodeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub view: MapSnapshot,
}

impl SearchResponse {
    fn new(outcome: SearchOutcome, view: MapSnapshot) -> Self {
        let status = outcome.status();
        let message = outcome.message();
        let (result, error) = match outcome {
            SearchOutcome::Found { result } => (Some(result), None),
            SearchOutcome::Failed { error } => (None, Some(error)),
            _ => (None, None),
        };
        Self {
            status,
            message,
            result,
            error,
            view,
        }
    }
}

pub async fn index_html(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    render_index(&state.controller.snapshot()).map_err(|e| {
        tracing::error!("Failed to render index page: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn serve_asset(name: &str, content_type: &'static str) -> Response {
    match embedded_asset(name) {
        Some(data) => ([(header::CONTENT_TYPE, content_type)], data).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn style_css() -> Response {
    serve_asset("style.css", "text/css")
}

pub async fn script_js() -> Response {
    serve_asset("script.js", "application/javascript")
}

// API endpoint for the full map state
pub async fn get_map(State(state): State<AppState>) -> Json<MapSnapshot> {
    Json(state.controller.snapshot())
}

// API endpoint for the heat overlay alone
pub async fn get_heatmap(State(state): State<AppState>) -> Json<HeatLayer> {
    Json(state.controller.snapshot().heat_layer)
}

// API endpoint to geocode a place and move the map there
pub async fn search_location(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, StatusCode> {
    let outcome = match state.controller.spawn_search(params.q).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => SearchOutcome::Superseded,
        Err(e) => {
            tracing::error!("Search task failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(SearchResponse::new(
        outcome,
        state.controller.snapshot(),
    )))
}

// API endpoint for the hour-of-day traffic overlay
pub async fn get_traffic(
    State(state): State<AppState>,
    Query(params): Query<TrafficParams>,
) -> Result<Json<HourlyTraffic>, (StatusCode, String)> {
    let Some(dataset) = state.traffic.as_deref() else {
        return Err((
            StatusCode::NOT_FOUND,
            "No traffic dataset configured".to_string(),
        ));
    };

    let hour = params.hour.unwrap_or(DEFAULT_TRAFFIC_HOUR);
    match dataset.for_hour(hour) {
        Ok(traffic) => {
            if let Some(message) = &traffic.message {
                tracing::warn!("⚠️  {}", message);
            }
            Ok(Json(traffic))
        }
        Err(e @ TrafficError::HourOutOfRange(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            tracing::error!("Failed to build traffic view for hour {}: {}", hour, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// API endpoint turning per-lane congestion scores into a signal plan
pub async fn decide_signal(Json(scores): Json<HashMap<String, f64>>) -> Json<SignalState> {
    let state = signal_decision(&scores);
    tracing::debug!("🚦 Signal plan for {:?}: {:?}", scores, state);
    Json(state)
}

// SSE endpoint for alerts and map changes
pub async fn map_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);
    let mut event_receiver = state.event_sender.subscribe();

    // Forward events from main sender to SSE stream
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = event_receiver.recv() => match event {
                    Ok(map_event) => map_event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("SSE subscriber lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::time::sleep(Duration::from_secs(30)) => MapEvent::heartbeat(),
            };

            let sse_event = SseEvent::default()
                .event(event.event_type.clone())
                .json_data(&event)
                .unwrap_or_else(|_| SseEvent::default().data("Error serializing event"));

            if tx.send(Ok(sse_event)).await.is_err() {
                break; // Client disconnected
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive-message"),
    )
}
