use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::constants::{HEAT_BLUR, HEAT_MAX_ZOOM, HEAT_RADIUS};

#[derive(Debug, Error, PartialEq)]
pub enum HeatmapError {
    #[error("intensity {0} is outside [0, 1]")]
    IntensityOutOfRange(f64),
    #[error("coordinate ({0}, {1}) is not a valid latitude/longitude")]
    InvalidCoordinate(f64, f64),
}

/// A single weighted sample of the heat layer.
///
/// Serialized as `[lat, lng, intensity]`, the tuple form the browser heat
/// plugin consumes directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 3]")]
pub struct HeatPoint {
    lat: f64,
    lng: f64,
    intensity: f64,
}

impl HeatPoint {
    pub fn new(lat: f64, lng: f64, intensity: f64) -> Result<Self, HeatmapError> {
        if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(HeatmapError::InvalidCoordinate(lat, lng));
        }
        if !(0.0..=1.0).contains(&intensity) {
            return Err(HeatmapError::IntensityOutOfRange(intensity));
        }
        Ok(Self { lat, lng, intensity })
    }

    #[cfg(test)]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[cfg(test)]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    #[cfg(test)]
    pub fn intensity(&self) -> f64 {
        self.intensity
    }
}

impl From<HeatPoint> for [f64; 3] {
    fn from(p: HeatPoint) -> Self {
        [p.lat, p.lng, p.intensity]
    }
}

// Traffic hot spots: Delhi, Mumbai, Chennai, Kolkata, Bengaluru
const TRAFFIC_DATA: [(f64, f64, f64); 5] = [
    (28.7041, 77.1025, 1.0),
    (19.0760, 72.8777, 0.8),
    (13.0827, 80.2707, 0.6),
    (22.5726, 88.3639, 0.4),
    (12.9716, 77.5946, 0.2),
];

#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub threshold: f64,
    pub color: String,
}

/// Colour ramp keyed by intensity threshold, kept sorted by threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient(Vec<GradientStop>);

impl Gradient {
    pub fn new<I, S>(stops: I) -> Self
    where
        I: IntoIterator<Item = (f64, S)>,
        S: Into<String>,
    {
        let mut stops: Vec<GradientStop> = stops
            .into_iter()
            .map(|(threshold, color)| GradientStop {
                threshold,
                color: color.into(),
            })
            .collect();
        stops.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self(stops)
    }

    #[cfg(test)]
    pub fn stops(&self) -> &[GradientStop] {
        &self.0
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Gradient::new([(0.2, "green"), (0.6, "yellow"), (1.0, "red")])
    }
}

// `{"0.2": "green", ...}` is what L.heatLayer expects for `gradient`
impl Serialize for Gradient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for stop in &self.0 {
            map.serialize_entry(&stop.threshold.to_string(), &stop.color)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatLayerOptions {
    pub radius: u32,
    pub blur: u32,
    pub max_zoom: u8,
    pub gradient: Gradient,
}

impl Default for HeatLayerOptions {
    fn default() -> Self {
        Self {
            radius: HEAT_RADIUS,
            blur: HEAT_BLUR,
            max_zoom: HEAT_MAX_ZOOM,
            gradient: Gradient::default(),
        }
    }
}

/// Fixed heat overlay. Built once; there is no way to mutate the points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatLayer {
    points: Vec<HeatPoint>,
    options: HeatLayerOptions,
}

impl HeatLayer {
    pub fn new(points: Vec<HeatPoint>, options: HeatLayerOptions) -> Self {
        Self { points, options }
    }

    pub fn traffic() -> Self {
        let points = TRAFFIC_DATA
            .iter()
            .map(|&(lat, lng, intensity)| HeatPoint { lat, lng, intensity })
            .collect();
        Self::new(points, HeatLayerOptions::default())
    }

    pub fn points(&self) -> &[HeatPoint] {
        &self.points
    }

    #[cfg(test)]
    pub fn options(&self) -> &HeatLayerOptions {
        &self.options
    }
}
