use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::map_view::LatLng;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeocodeResult {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoder answered HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed geocoder response: {0}")]
    Decode(String),
    #[error("candidate has unparsable coordinate {field}={value:?}")]
    InvalidCoordinate { field: &'static str, value: String },
    #[error("invalid geocoder configuration: {0}")]
    Config(String),
}

/// Forward geocoding: free text in, candidate places out (best first).
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError>;
}

// One entry of the Nominatim `format=json` array. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
}

impl TryFrom<NominatimPlace> for GeocodeResult {
    type Error = GeocodeError;

    fn try_from(place: NominatimPlace) -> Result<Self, Self::Error> {
        let lat = parse_coordinate("lat", &place.lat)?;
        let lon = parse_coordinate("lon", &place.lon)?;
        Ok(GeocodeResult {
            display_name: place.display_name,
            lat,
            lon,
        })
    }
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<f64, GeocodeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
}

/// Client for the OpenStreetMap Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    endpoint: String,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, GeocodeError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| GeocodeError::Config(format!("user agent {user_agent:?}: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            endpoint: endpoint.into(),
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        tracing::debug!("🌍 Geocoding {:?} via {}", query, self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "json"), ("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let places: Vec<NominatimPlace> =
            serde_json::from_slice(&body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

        // Only the best candidate decides the outcome; malformed runners-up are dropped
        let mut places = places.into_iter();
        let Some(first) = places.next() else {
            return Ok(Vec::new());
        };
        let mut results = vec![GeocodeResult::try_from(first)?];
        results.extend(places.filter_map(|place| match GeocodeResult::try_from(place) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!("Skipping candidate for {:?}: {}", query, e);
                None
            }
        }));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap as AxumHeaders, StatusCode},
        response::{IntoResponse, Json},
        routing::get,
        Router,
    };
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn fake_nominatim(
        headers: AxumHeaders,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        let q = params.get("q").cloned().unwrap_or_default();
        let agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if params.get("format").map(String::as_str) != Some("json") {
            return StatusCode::BAD_REQUEST.into_response();
        }
        match q.as_str() {
            "boom" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            "garbage" => "<html>not json</html>".into_response(),
            "badcoord" => Json(serde_json::json!([
                {"display_name": "Nowhere", "lat": "north", "lon": "1.0"}
            ]))
            .into_response(),
            "badsecond" => Json(serde_json::json!([
                {"display_name": "Delhi", "lat": "28.7041", "lon": "77.1025"},
                {"display_name": "Broken", "lat": "", "lon": "77.0"},
                {"display_name": "Agra", "lat": "27.1767", "lon": "78.0081"}
            ]))
            .into_response(),
            "nothing" => Json(serde_json::json!([])).into_response(),
            _ => Json(serde_json::json!([
                {"display_name": q, "lat": "28.7041", "lon": "77.1025", "place_id": 1},
                {"display_name": agent, "lat": "0", "lon": "0"}
            ]))
            .into_response(),
        }
    }

    async fn spawn_fake() -> String {
        let app = Router::new().route("/search", get(fake_nominatim));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/search")
    }

    fn client(endpoint: String) -> NominatimClient {
        NominatimClient::new(endpoint, "traffic_heatmap-tests/1.0", None).unwrap()
    }

    #[tokio::test]
    async fn parses_string_coordinates_in_order() {
        let geocoder = client(spawn_fake().await);
        let results = geocoder.search("Delhi").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].display_name, "Delhi");
        assert_eq!(results[0].position(), LatLng::new(28.7041, 77.1025));
    }

    #[tokio::test]
    async fn sends_user_agent_and_encodes_query() {
        let geocoder = client(spawn_fake().await);
        let results = geocoder.search("Fish & Chips #1?").await.unwrap();
        assert_eq!(results[0].display_name, "Fish & Chips #1?");
        assert_eq!(results[1].display_name, "traffic_heatmap-tests/1.0");
    }

    #[tokio::test]
    async fn malformed_runner_up_does_not_spoil_first_candidate() {
        let geocoder = client(spawn_fake().await);
        let results = geocoder.search("badsecond").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position(), LatLng::new(28.7041, 77.1025));
        assert_eq!(results[1].display_name, "Agra");
    }

    #[tokio::test]
    async fn empty_array_is_not_an_error() {
        let geocoder = client(spawn_fake().await);
        assert!(geocoder.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn maps_failures_to_typed_errors() {
        let geocoder = client(spawn_fake().await);
        assert!(matches!(
            geocoder.search("boom").await,
            Err(GeocodeError::Status(s)) if s == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(matches!(
            geocoder.search("garbage").await,
            Err(GeocodeError::Decode(_))
        ));
        assert!(matches!(
            geocoder.search("badcoord").await,
            Err(GeocodeError::InvalidCoordinate { field: "lat", .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let geocoder = client(format!("http://{addr}/search"));
        assert!(matches!(
            geocoder.search("Delhi").await,
            Err(GeocodeError::Transport(_))
        ));
    }

    #[test]
    fn rejects_user_agent_with_control_characters() {
        assert!(matches!(
            NominatimClient::new("http://localhost/search", "bad\nagent", None),
            Err(GeocodeError::Config(_))
        ));
    }
}
