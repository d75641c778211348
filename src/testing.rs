// Test doubles shared by the unit test modules
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::geocoding::{GeocodeError, GeocodeResult, Geocoder};
use crate::map_view::{LatLng, Marker};
use crate::search::Notifier;

fn place(name: &str, lat: f64, lon: f64) -> GeocodeResult {
    GeocodeResult {
        display_name: name.to_string(),
        lat,
        lon,
    }
}

enum Canned {
    Results(Vec<GeocodeResult>),
    Failure,
}

/// Answers every query the same way and counts calls.
pub struct StaticGeocoder {
    canned: Canned,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    pub fn found(lat: f64, lon: f64) -> Self {
        Self {
            canned: Canned::Results(vec![place("match", lat, lon), place("runner-up", 0.0, 0.0)]),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            canned: Canned::Results(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            canned: Canned::Failure,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.canned {
            Canned::Results(results) => Ok(results.clone()),
            Canned::Failure => Err(GeocodeError::Decode("connection reset".to_string())),
        }
    }
}

/// Holds each query until the test releases it, so responses can be
/// delivered in any order. Reports every query on `started`.
pub struct GatedGeocoder {
    started: mpsc::UnboundedSender<String>,
    gates: Mutex<HashMap<String, oneshot::Sender<Vec<GeocodeResult>>>>,
}

impl GatedGeocoder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (started, rx) = mpsc::unbounded_channel();
        let geocoder = Self {
            started,
            gates: Mutex::new(HashMap::new()),
        };
        (geocoder, rx)
    }

    pub fn release(&self, query: &str, lat: f64, lon: f64) {
        let gate = self.gates.lock().unwrap().remove(query);
        if let Some(tx) = gate {
            let _ = tx.send(vec![place(query, lat, lon)]);
        }
    }
}

#[async_trait]
impl Geocoder for GatedGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(query.to_string(), tx);
        let _ = self.started.send(query.to_string());
        rx.await
            .map_err(|_| GeocodeError::Decode("gate dropped".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
    view_changes: AtomicUsize,
    markers_added: AtomicUsize,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn view_changes(&self) -> usize {
        self.view_changes.load(Ordering::SeqCst)
    }

    pub fn markers_added(&self) -> usize {
        self.markers_added.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn view_changed(&self, _center: LatLng, _zoom: u8) {
        self.view_changes.fetch_add(1, Ordering::SeqCst);
    }

    fn marker_added(&self, _marker: &Marker) {
        self.markers_added.fetch_add(1, Ordering::SeqCst);
    }
}
