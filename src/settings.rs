use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_PORT, DEFAULT_USER_AGENT, NOMINATIM_SEARCH_URL, OSM_TILE_MAX_ZOOM, OSM_TILE_URL,
};

const CONFIG_FILE_NAME: &str = "traffic_heatmap.ini";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub auto_open_browser: bool,
    pub tile_url: String,
    pub tile_max_zoom: u8,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    /// 0 disables the request timeout.
    pub geocoder_timeout_secs: u64,
    pub supersede_stale_searches: bool,
    /// CSV of hourly junction counts; `None` disables `/api/traffic`.
    pub traffic_data_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auto_open_browser: false,
            tile_url: OSM_TILE_URL.to_string(),
            tile_max_zoom: OSM_TILE_MAX_ZOOM,
            geocoder_url: NOMINATIM_SEARCH_URL.to_string(),
            geocoder_user_agent: DEFAULT_USER_AGENT.to_string(),
            geocoder_timeout_secs: 0,
            supersede_stale_searches: true,
            traffic_data_path: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Parses `key = value` lines. Unknown keys and unparsable values are
    /// skipped with a warning and the default is kept.
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        let mut config_map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim(), value.trim().trim_matches('"'));
            }
        }

        for (key, value) in config_map {
            let applied = match key {
                "port" => value.parse().map(|v| settings.port = v).is_ok(),
                "auto_open_browser" => value.parse().map(|v| settings.auto_open_browser = v).is_ok(),
                "tile_url" => {
                    settings.tile_url = value.to_string();
                    true
                }
                "tile_max_zoom" => value.parse().map(|v| settings.tile_max_zoom = v).is_ok(),
                "geocoder_url" => {
                    settings.geocoder_url = value.to_string();
                    true
                }
                "geocoder_user_agent" => {
                    settings.geocoder_user_agent = value.to_string();
                    true
                }
                "geocoder_timeout_secs" => value
                    .parse()
                    .map(|v| settings.geocoder_timeout_secs = v)
                    .is_ok(),
                "supersede_stale_searches" => value
                    .parse()
                    .map(|v| settings.supersede_stale_searches = v)
                    .is_ok(),
                "traffic_data_path" => {
                    settings.traffic_data_path =
                        (!value.is_empty()).then(|| PathBuf::from(value));
                    true
                }
                _ => {
                    tracing::warn!("⚠️  Unknown config key: {}", key);
                    continue;
                }
            };
            if !applied {
                tracing::warn!("⚠️  Ignoring invalid value for {}: {:?}", key, value);
            }
        }

        settings
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }

        let mut content = String::new();
        content.push_str("# Traffic Heatmap Configuration File\n");
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("auto_open_browser = {}\n", self.auto_open_browser));
        content.push_str(&format!("tile_url = \"{}\"\n", self.tile_url));
        content.push_str(&format!("tile_max_zoom = {}\n", self.tile_max_zoom));
        content.push_str(&format!("geocoder_url = \"{}\"\n", self.geocoder_url));
        content.push_str(&format!("geocoder_user_agent = \"{}\"\n", self.geocoder_user_agent));
        content.push_str(&format!("geocoder_timeout_secs = {}\n", self.geocoder_timeout_secs));
        content.push_str(&format!(
            "supersede_stale_searches = {}\n",
            self.supersede_stale_searches
        ));
        let traffic_data_path = self
            .traffic_data_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        content.push_str(&format!("traffic_data_path = \"{}\"\n", traffic_data_path));

        std::fs::write(config_path, content).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn geocoder_timeout(&self) -> Option<Duration> {
        (self.geocoder_timeout_secs > 0).then(|| Duration::from_secs(self.geocoder_timeout_secs))
    }

    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .unwrap_or_default()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        if path.ends_with("target/debug") || path.ends_with("target/release") {
            path.pop();
            path.pop();
        }
        path.push(CONFIG_FILE_NAME);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("traffic_heatmap-does-not-exist.ini");
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3001);
        assert!(settings.supersede_stale_searches);
        assert_eq!(settings.geocoder_timeout(), None);
    }

    #[test]
    fn parses_known_keys_and_skips_noise() {
        let settings = Settings::parse(
            "# comment\n\
             port = 8080\n\
             geocoder_url = \"http://localhost:9000/search\"\n\
             geocoder_timeout_secs = 5\n\
             supersede_stale_searches = false\n\
             traffic_data_path = \"data/odisha.csv\"\n\
             tile_max_zoom = nineteen\n\
             colour = blue\n\
             \n",
        );
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.geocoder_url, "http://localhost:9000/search");
        assert_eq!(settings.geocoder_timeout(), Some(Duration::from_secs(5)));
        assert!(!settings.supersede_stale_searches);
        assert_eq!(settings.tile_max_zoom, 18);
        assert_eq!(
            settings.traffic_data_path.as_deref(),
            Some(Path::new("data/odisha.csv"))
        );
    }

    #[test]
    fn blank_traffic_path_disables_dataset() {
        let settings = Settings::parse("traffic_data_path = \"\"\n");
        assert_eq!(settings.traffic_data_path, None);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = std::env::temp_dir().join(format!(
            "traffic_heatmap-settings-{}.ini",
            std::process::id()
        ));
        let settings = Settings {
            port: 4000,
            auto_open_browser: true,
            tile_url: "https://tiles.example/{z}/{x}/{y}.png".to_string(),
            traffic_data_path: Some(PathBuf::from("traffic.csv")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }
}
