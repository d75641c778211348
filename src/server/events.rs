use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::map_view::{LatLng, Marker};
use crate::search::Notifier;

// SSE Event types
#[derive(Debug, Clone, Serialize)]
pub struct MapEvent {
    pub event_type: String,
    pub data: MapEventData,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapEventData {
    pub message: Option<String>,
    pub center: Option<LatLng>,
    pub zoom: Option<u8>,
    pub marker: Option<Marker>,
    pub timestamp: DateTime<Utc>,
}

impl Default for MapEventData {
    fn default() -> Self {
        Self {
            message: None,
            center: None,
            zoom: None,
            marker: None,
            timestamp: Utc::now(),
        }
    }
}

impl MapEvent {
    pub fn new(event_type: &str, data: MapEventData) -> Self {
        Self {
            event_type: event_type.to_string(),
            data,
        }
    }

    pub fn heartbeat() -> Self {
        Self::new(
            "heartbeat",
            MapEventData {
                message: Some("SSE connection alive".to_string()),
                ..Default::default()
            },
        )
    }
}

/// Publishes search side effects to every `/api/events` subscriber.
pub struct EventNotifier {
    sender: broadcast::Sender<MapEvent>,
}

impl EventNotifier {
    pub fn new(sender: broadcast::Sender<MapEvent>) -> Self {
        Self { sender }
    }

    fn publish(&self, event: MapEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }
}

impl Notifier for EventNotifier {
    fn alert(&self, message: &str) {
        self.publish(MapEvent::new(
            "alert",
            MapEventData {
                message: Some(message.to_string()),
                ..Default::default()
            },
        ));
    }

    fn view_changed(&self, center: LatLng, zoom: u8) {
        self.publish(MapEvent::new(
            "view_changed",
            MapEventData {
                center: Some(center),
                zoom: Some(zoom),
                ..Default::default()
            },
        ));
    }

    fn marker_added(&self, marker: &Marker) {
        self.publish(MapEvent::new(
            "marker_added",
            MapEventData {
                marker: Some(marker.clone()),
                ..Default::default()
            },
        ));
    }
}
