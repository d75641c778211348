// Port configuration
pub const DEFAULT_PORT: u16 = 3001;

// Initial map view (centre of India)
pub const DEFAULT_CENTER_LAT: f64 = 20.5937;
pub const DEFAULT_CENTER_LNG: f64 = 78.9629;
pub const DEFAULT_ZOOM: u8 = 5;

// Zoom applied after a successful place search
pub const SEARCH_RESULT_ZOOM: u8 = 14;

// Base tile source
pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_TILE_MAX_ZOOM: u8 = 18;
pub const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

// Heat layer rendering parameters
pub const HEAT_RADIUS: u32 = 25;
pub const HEAT_BLUR: u32 = 15;
pub const HEAT_MAX_ZOOM: u8 = 17;

// Hourly traffic overlay built from the recorded dataset
pub const DEFAULT_TRAFFIC_HOUR: u8 = 8;
pub const TRAFFIC_HEAT_RADIUS: u32 = 15;
pub const TRAFFIC_HEAT_BLUR: u32 = 20;

// Geocoding service
pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
// Nominatim rejects requests without an identifying User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("traffic_heatmap/", env!("CARGO_PKG_VERSION"));

// User-facing signals
pub const MSG_EMPTY_QUERY: &str = "Please enter a location!";
pub const MSG_NOT_FOUND: &str = "Location not found!";

// Capacity of the broadcast channel feeding /api/events
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
