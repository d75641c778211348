use std::sync::Arc;
use tokio::sync::broadcast;

use super::events::MapEvent;
use crate::search::SearchController;
use crate::traffic::TrafficDataset;

// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SearchController>,
    pub event_sender: broadcast::Sender<MapEvent>,
    /// Absent when no dataset is configured.
    pub traffic: Option<Arc<TrafficDataset>>,
}
