use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{AbortHandle, JoinHandle};

use crate::constants::{MSG_EMPTY_QUERY, MSG_NOT_FOUND, SEARCH_RESULT_ZOOM};
use crate::geocoding::{GeocodeResult, Geocoder};
use crate::map_view::{LatLng, MapSnapshot, MapView, Marker};

/// Receives the user-facing side effects of a search.
///
/// `alert` carries the two literal messages; the other hooks are optional
/// progress notifications.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);

    fn view_changed(&self, _center: LatLng, _zoom: u8) {}

    fn marker_added(&self, _marker: &Marker) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    EmptyQuery,
    Found { result: GeocodeResult },
    NotFound,
    Failed { error: String },
    /// A newer search started before this one's response arrived.
    Superseded,
}

impl SearchOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            SearchOutcome::EmptyQuery => "empty",
            SearchOutcome::Found { .. } => "found",
            SearchOutcome::NotFound => "not_found",
            SearchOutcome::Failed { .. } => "error",
            SearchOutcome::Superseded => "superseded",
        }
    }

    /// The alert text shown to the user, if this outcome has one.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            SearchOutcome::EmptyQuery => Some(MSG_EMPTY_QUERY),
            SearchOutcome::NotFound => Some(MSG_NOT_FOUND),
            _ => None,
        }
    }
}

/// Turns a free-text place name into a recenter + marker on the owned map.
///
/// Each call takes a fresh generation number. With `supersede_stale` on, a
/// response is applied only if no newer search started while it was in
/// flight, so the most recent call wins regardless of response order.
pub struct SearchController {
    view: Mutex<MapView>,
    geocoder: Arc<dyn Geocoder>,
    notifier: Arc<dyn Notifier>,
    generation: AtomicU64,
    supersede_stale: bool,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl SearchController {
    pub fn new(view: MapView, geocoder: Arc<dyn Geocoder>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            view: Mutex::new(view),
            geocoder,
            notifier,
            generation: AtomicU64::new(0),
            supersede_stale: true,
            in_flight: Mutex::new(None),
        }
    }

    /// `false` restores last-response-wins: every response is applied.
    pub fn supersede_stale(mut self, enabled: bool) -> Self {
        self.supersede_stale = enabled;
        self
    }

    fn view(&self) -> MutexGuard<'_, MapView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.view().snapshot()
    }

    #[cfg(test)]
    pub fn center_and_zoom(&self) -> (LatLng, u8) {
        let view = self.view();
        (view.center(), view.zoom())
    }

    #[cfg(test)]
    pub fn marker_count(&self) -> usize {
        self.view().markers().len()
    }

    pub async fn search_location(&self, query: &str) -> SearchOutcome {
        if query.is_empty() {
            self.notifier.alert(MSG_EMPTY_QUERY);
            return SearchOutcome::EmptyQuery;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self.geocoder.search(query).await;

        if self.is_stale(generation) {
            tracing::debug!("⏭️  Discarding stale response for {:?} (generation {})", query, generation);
            return SearchOutcome::Superseded;
        }

        match response {
            Ok(results) => match results.into_iter().next() {
                Some(first) => {
                    if self.apply(query, &first, generation) {
                        SearchOutcome::Found { result: first }
                    } else {
                        SearchOutcome::Superseded
                    }
                }
                None => {
                    tracing::info!("🔍 No match for {:?}", query);
                    self.notifier.alert(MSG_NOT_FOUND);
                    SearchOutcome::NotFound
                }
            },
            Err(e) => {
                // Logged only; the user gets no alert for transport failures
                tracing::error!("❌ Error fetching location: {}", e);
                SearchOutcome::Failed { error: e.to_string() }
            }
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.supersede_stale && self.generation.load(Ordering::SeqCst) != generation
    }

    /// Moves the view and drops the marker, unless a newer search started.
    /// The staleness check runs under the view lock so a superseded task
    /// cannot overwrite a newer result.
    fn apply(&self, query: &str, result: &GeocodeResult, generation: u64) -> bool {
        let position = result.position();
        let (center, zoom, marker) = {
            let mut view = self.view();
            if self.is_stale(generation) {
                tracing::debug!("⏭️  Discarding stale result for {:?} (generation {})", query, generation);
                return false;
            }
            view.set_view(position, SEARCH_RESULT_ZOOM);
            let marker = view.add_marker(position, query).clone();
            (view.center(), view.zoom(), marker)
        };

        tracing::info!(
            "📍 {:?} -> ({:.4}, {:.4}) {}",
            query,
            position.lat,
            position.lng,
            result.display_name
        );
        self.notifier.view_changed(center, zoom);
        self.notifier.marker_added(&marker);
        true
    }

    /// Runs a search in the background. With `supersede_stale` on, a real
    /// (non-empty) search aborts the previous spawned search if it is still
    /// in flight. Empty queries only alert and never touch other searches.
    pub fn spawn_search(self: &Arc<Self>, query: String) -> JoinHandle<SearchOutcome> {
        let replaces_in_flight = self.supersede_stale && !query.is_empty();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.search_location(&query).await });

        if replaces_in_flight {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = in_flight.replace(handle.abort_handle()) {
                previous.abort();
            }
        }
        handle
    }
}
