use anyhow::{Context, Result};
use axum::response::Html;
use rust_embed::RustEmbed;

use crate::map_view::MapSnapshot;

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct Asset;

const CONFIG_PLACEHOLDER: &str = "/* MAP_CONFIG_PLACEHOLDER */ null";

pub fn embedded_asset(name: &str) -> Option<Vec<u8>> {
    Asset::get(name).map(|file| file.data.into_owned())
}

/// Renders `index.html` with the current map state inlined, so the first
/// paint needs no extra round trip.
pub fn render_index(snapshot: &MapSnapshot) -> Result<Html<String>> {
    let page = embedded_asset("index.html").context("index.html is not embedded")?;
    let page = String::from_utf8(page).context("index.html is not UTF-8")?;

    let config = serde_json::to_string(snapshot).context("Failed to serialize map config")?;
    // Popup text is user input; keep it from closing the script tag
    let config = config.replace("</", "<\\/");

    Ok(Html(page.replace(CONFIG_PLACEHOLDER, &config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_view::{LatLng, MapView};

    #[test]
    fn placeholder_is_present_in_embedded_page() {
        let page = String::from_utf8(embedded_asset("index.html").unwrap()).unwrap();
        assert!(page.contains(CONFIG_PLACEHOLDER));
    }

    #[test]
    fn inlines_snapshot_and_escapes_script_terminators() {
        let mut view = MapView::new();
        view.add_marker(LatLng::new(1.0, 2.0), "</script><b>x</b>");
        let Html(html) = render_index(&view.snapshot()).unwrap();
        assert!(!html.contains(CONFIG_PLACEHOLDER));
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("<\\/script><b>x<\\/b>"));
        assert!(html.contains("\"radius\":25"));
    }

    #[test]
    fn unknown_asset_is_none() {
        assert!(embedded_asset("missing.js").is_none());
    }
}
