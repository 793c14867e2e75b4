//! Scalar statistics for report builders.

use serde::{Deserialize, Serialize};

use crate::geo_utils::compute_bounds;
use crate::metrics::{seconds_between, DerivedTable};
use crate::{Bounds, GpsPoint};

/// Summary statistics derived from a metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Largest cumulative distance reached in any segment (km)
    pub total_distance_km: f64,
    /// Sum of every segment's final cumulative distance (km)
    pub segments_distance_km: f64,
    /// Max minus min elevation, `None` without elevation data
    pub elevation_range_m: Option<f64>,
    /// Mean of the defined speed values, `None` if there are none
    pub mean_speed_kmh: Option<f64>,
    /// Last timestamp minus first timestamp, `None` with fewer than two timestamps
    pub elapsed_seconds: Option<f64>,
    pub point_count: usize,
    pub segment_count: usize,
    pub bounds: Option<Bounds>,
}

impl TrackSummary {
    /// Label/value pairs for the report's summary table.
    ///
    /// Unknown elevation range renders as `0`, unknown speed as `N/A`.
    pub fn report_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Distance (km)", format!("{:.2}", self.total_distance_km)),
            (
                "Elevation range (m)",
                format!("{:.0}", self.elevation_range_m.unwrap_or(0.0)),
            ),
            (
                "Average speed (km/h)",
                self.mean_speed_kmh
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
        ]
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Compute summary statistics over a derived table.
pub fn summarize(table: &DerivedTable) -> TrackSummary {
    let rows = table.rows();

    let total_distance_km = rows
        .iter()
        .map(|row| row.cumulative_km)
        .fold(0.0, f64::max);

    // Rows of a segment are contiguous, so a segment ends where the index changes.
    let segments_distance_km = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| {
            rows.get(i + 1)
                .map_or(true, |next| next.segment_index != row.segment_index)
        })
        .map(|(_, row)| row.cumulative_km)
        .sum();

    let elevation_range_m = min_max(rows.iter().filter_map(|row| row.elevation))
        .map(|(min, max)| max - min);

    let speeds: Vec<f64> = rows.iter().filter_map(|row| row.speed_kmh).collect();
    let mean_speed_kmh = if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
    };

    let mut timestamps = rows.iter().filter_map(|row| row.timestamp);
    let elapsed_seconds = match (timestamps.next(), timestamps.last()) {
        (Some(first), Some(last)) => Some(seconds_between(first, last)),
        _ => None,
    };

    let positions: Vec<GpsPoint> = rows
        .iter()
        .map(|row| GpsPoint::new(row.latitude, row.longitude))
        .collect();

    TrackSummary {
        total_distance_km,
        segments_distance_km,
        elevation_range_m,
        mean_speed_kmh,
        elapsed_seconds,
        point_count: rows.len(),
        segment_count: table.segment_count(),
        bounds: compute_bounds(&positions),
    }
}

fn min_max<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}
