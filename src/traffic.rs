use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::constants::{TRAFFIC_HEAT_BLUR, TRAFFIC_HEAT_RADIUS};
use crate::heatmap::{HeatLayer, HeatLayerOptions, HeatPoint, HeatmapError};
use crate::signal::{lane_for_junction, signal_decision, SignalState};

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("failed to read traffic data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognised DateTime {value:?}")]
    DateTime { row: usize, value: String },
    #[error("row {row}: {source}")]
    Location { row: usize, source: HeatmapError },
    #[error("hour {0} is outside 0..=23")]
    HourOutOfRange(u8),
    #[error(transparent)]
    Heatmap(#[from] HeatmapError),
}

// Column names as exported by the traffic counting pipeline
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "DateTime")]
    date_time: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Vehicles")]
    vehicles: u64,
    #[serde(rename = "Junction", default)]
    junction: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficRecord {
    pub timestamp: NaiveDateTime,
    pub lat: f64,
    pub lng: f64,
    pub vehicles: u64,
    pub junction: Option<u32>,
}

impl TrafficRecord {
    pub fn hour(&self) -> u8 {
        // `hour()` is always below 24
        self.timestamp.hour() as u8
    }
}

fn parse_date_time(row: usize, value: &str) -> Result<NaiveDateTime, TrafficError> {
    let trimmed = value.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| TrafficError::DateTime {
            row,
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficMetrics {
    pub total_vehicles: u64,
    /// Number of readings recorded in the hour.
    pub active_junctions: usize,
}

/// Everything the dashboard shows for one hour of the day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyTraffic {
    pub hour: u8,
    pub heat_layer: HeatLayer,
    pub metrics: TrafficMetrics,
    pub signal: SignalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Vehicle counts recorded at geolocated junctions, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TrafficDataset {
    records: Vec<TrafficRecord>,
}

impl TrafficDataset {
    pub fn load(path: &Path) -> Result<Self, TrafficError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TrafficError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, TrafficError> {
        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row_number = index + 1;
            let row = row?;
            let timestamp = parse_date_time(row_number, &row.date_time)?;
            HeatPoint::new(row.latitude, row.longitude, 0.0).map_err(|source| {
                TrafficError::Location {
                    row: row_number,
                    source,
                }
            })?;
            records.push(TrafficRecord {
                timestamp,
                lat: row.latitude,
                lng: row.longitude,
                vehicles: row.vehicles,
                junction: row.junction,
            });
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Heat overlay, totals and signal plan for readings taken during `hour`.
    ///
    /// Intensities are vehicle counts scaled by the busiest reading of the
    /// hour, so the hottest spot is always 1.0.
    pub fn for_hour(&self, hour: u8) -> Result<HourlyTraffic, TrafficError> {
        if hour > 23 {
            return Err(TrafficError::HourOutOfRange(hour));
        }

        let readings: Vec<&TrafficRecord> =
            self.records.iter().filter(|r| r.hour() == hour).collect();

        let total_vehicles = readings.iter().map(|r| r.vehicles).sum();
        let busiest = readings.iter().map(|r| r.vehicles).max().unwrap_or(0);

        let points = readings
            .iter()
            .map(|r| {
                let intensity = if busiest == 0 {
                    0.0
                } else {
                    r.vehicles as f64 / busiest as f64
                };
                HeatPoint::new(r.lat, r.lng, intensity)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut lane_load: HashMap<String, f64> = HashMap::new();
        for reading in &readings {
            if let Some(lane) = reading.junction.and_then(lane_for_junction) {
                *lane_load.entry(lane.to_string()).or_default() += reading.vehicles as f64;
            }
        }

        let message = readings
            .is_empty()
            .then(|| format!("No traffic data available for hour {hour}:00."));

        let options = HeatLayerOptions {
            radius: TRAFFIC_HEAT_RADIUS,
            blur: TRAFFIC_HEAT_BLUR,
            ..HeatLayerOptions::default()
        };

        Ok(HourlyTraffic {
            hour,
            heat_layer: HeatLayer::new(points, options),
            metrics: TrafficMetrics {
                total_vehicles,
                active_junctions: readings.len(),
            },
            signal: signal_decision(&lane_load),
            message,
        })
    }
}
