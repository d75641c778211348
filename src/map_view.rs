use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_ZOOM, OSM_ATTRIBUTION, OSM_TILE_MAX_ZOOM,
    OSM_TILE_URL,
};
use crate::heatmap::HeatLayer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    pub url_template: String,
    pub max_zoom: u8,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            max_zoom: OSM_TILE_MAX_ZOOM,
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub position: LatLng,
    pub popup: String,
    pub popup_open: bool,
    pub created_at: DateTime<Utc>,
}

/// Serializable copy of a [`MapView`], as served by `/api/map`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub center: LatLng,
    pub zoom: u8,
    pub tile_layer: TileLayer,
    pub heat_layer: HeatLayer,
    pub markers: Vec<Marker>,
}

/// The map state the browser renders: viewport, base tiles, heat overlay and
/// the markers dropped by searches.
///
/// Markers only ever accumulate. The heat layer is fixed at construction.
#[derive(Debug, Clone)]
pub struct MapView {
    center: LatLng,
    zoom: u8,
    tile_layer: TileLayer,
    heat_layer: HeatLayer,
    markers: Vec<Marker>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

impl MapView {
    pub fn new() -> Self {
        Self::with_layers(
            LatLng::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG),
            DEFAULT_ZOOM,
            TileLayer::default(),
            HeatLayer::traffic(),
        )
    }

    pub fn with_layers(center: LatLng, zoom: u8, tile_layer: TileLayer, heat_layer: HeatLayer) -> Self {
        let zoom = zoom.min(tile_layer.max_zoom);
        Self {
            center,
            zoom,
            tile_layer,
            heat_layer,
            markers: Vec::new(),
        }
    }

    /// Moves the viewport. Zoom is capped at the tile layer's maximum.
    pub fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.center = center;
        self.zoom = zoom.min(self.tile_layer.max_zoom);
    }

    /// Drops a marker with its popup already open.
    pub fn add_marker(&mut self, position: LatLng, popup: impl Into<String>) -> &Marker {
        self.markers.push(Marker {
            position,
            popup: popup.into(),
            popup_open: true,
            created_at: Utc::now(),
        });
        &self.markers[self.markers.len() - 1]
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    #[cfg(test)]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn tile_layer(&self) -> &TileLayer {
        &self.tile_layer
    }

    pub fn heat_layer(&self) -> &HeatLayer {
        &self.heat_layer
    }

    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            center: self.center,
            zoom: self.zoom,
            tile_layer: self.tile_layer.clone(),
            heat_layer: self.heat_layer.clone(),
            markers: self.markers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_over_india_at_zoom_five() {
        let view = MapView::new();
        assert_eq!(view.center(), LatLng::new(20.5937, 78.9629));
        assert_eq!(view.zoom(), 5);
        assert_eq!(view.tile_layer().max_zoom, 18);
        assert_eq!(view.heat_layer().points().len(), 5);
        assert!(view.markers().is_empty());
    }

    #[test]
    fn markers_accumulate_with_open_popups() {
        let mut view = MapView::new();
        view.add_marker(LatLng::new(28.7041, 77.1025), "Delhi");
        let second = view.add_marker(LatLng::new(19.076, 72.8777), "Mumbai");
        assert_eq!(second.popup, "Mumbai");
        assert!(second.popup_open);
        assert_eq!(view.markers().len(), 2);
        assert_eq!(view.markers()[0].popup, "Delhi");
    }

    #[test]
    fn set_view_caps_zoom_at_tile_max() {
        let mut view = MapView::new();
        view.set_view(LatLng::new(1.0, 2.0), 22);
        assert_eq!(view.center(), LatLng::new(1.0, 2.0));
        assert_eq!(view.zoom(), 18);
    }

    #[test]
    fn independent_views_do_not_share_state() {
        let mut a = MapView::new();
        let b = MapView::new();
        a.add_marker(LatLng::new(0.0, 0.0), "here");
        assert_eq!(a.markers().len(), 1);
        assert!(b.markers().is_empty());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let mut view = MapView::new();
        view.add_marker(LatLng::new(1.0, 2.0), "x");
        let json = serde_json::to_value(view.snapshot()).unwrap();
        assert_eq!(json["zoom"], 5);
        assert_eq!(json["center"]["lat"], 20.5937);
        assert_eq!(json["tileLayer"]["maxZoom"], 18);
        assert_eq!(json["markers"][0]["popupOpen"], true);
        assert_eq!(json["heatLayer"]["points"].as_array().unwrap().len(), 5);
    }
}
