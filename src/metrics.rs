//! Per-point motion metrics.
//!
//! Turns a [`Track`] into a flat [`DerivedTable`], one [`DerivedRow`] per
//! point in file order. Each segment is walked once, left to right, carrying
//! the previous point and the running distance. Both reset at every
//! segment boundary.
//!
//! Derivation never fails. Values that cannot be computed at a row are
//! `None`:
//!
//! | Condition                               | step distance | step seconds | pace / speed |
//! |-----------------------------------------|---------------|--------------|--------------|
//! | first point of a segment                | 0.0           | 0.0          | None         |
//! | either timestamp missing                | computed      | 0.0          | None         |
//! | identical timestamps                    | computed      | 0.0          | None         |
//! | either elevation missing                | computed      | computed     | computed     |

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::{RawPoint, Track};

/// Conversion factor from m/s to km/h.
pub const MPS_TO_KMH: f64 = 3.6;

/// One row of the derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
    /// Index of the segment this row belongs to
    pub segment_index: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    /// Great-circle distance from the previous point in the segment (m)
    pub step_distance_m: f64,
    /// Seconds since the previous point; 0.0 when unknown
    pub step_seconds: f64,
    /// Running sum of `step_distance_m` within the segment (m)
    pub cumulative_distance_m: f64,
    pub cumulative_km: f64,
    /// `None` when `step_seconds == 0.0`
    pub pace_m_per_s: Option<f64>,
    pub speed_kmh: Option<f64>,
}

/// Ordered table of derived rows for a whole track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedTable {
    rows: Vec<DerivedRow>,
    segment_count: usize,
}

impl DerivedTable {
    pub fn rows(&self) -> &[DerivedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of segments in the source track, including empty ones.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Rows belonging to one segment.
    pub fn segment_rows(&self, segment_index: usize) -> impl Iterator<Item = &DerivedRow> + '_ {
        self.rows
            .iter()
            .filter(move |row| row.segment_index == segment_index)
    }

    /// True when at least one row carries an elevation.
    pub fn has_elevation(&self) -> bool {
        self.rows.iter().any(|row| row.elevation.is_some())
    }

    /// Serialize the table as a JSON array of rows (undefined values as `null`).
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.rows).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn into_rows(self) -> Vec<DerivedRow> {
        self.rows
    }
}

/// Derive the metrics table for every segment of a track.
pub fn derive_metrics(track: &Track) -> DerivedTable {
    let mut rows = Vec::with_capacity(track.point_count());
    for (segment_index, points) in track.segments().enumerate() {
        derive_segment(points, segment_index, &mut rows);
    }

    DerivedTable {
        rows,
        segment_count: track.segment_count(),
    }
}

/// Derive rows for one segment, appending them to `rows`.
///
/// Running distance starts at zero regardless of what `rows` already holds.
pub fn derive_segment(points: &[RawPoint], segment_index: usize, rows: &mut Vec<DerivedRow>) {
    let mut previous: Option<&RawPoint> = None;
    let mut cumulative_distance_m = 0.0;

    for index in 0..points.len() {
        let point = &points[index];

        let (step_distance_m, step_seconds) = match previous {
            Some(prev) => {
                let distance = haversine_distance(&prev.position(), &point.position());
                (distance, elapsed_seconds(prev, point))
            }
            None => (0.0, 0.0),
        };

        if step_seconds < 0.0 {
            warn!(
                "[Metrics] Segment {} point {}: timestamp goes back {:.1}s",
                segment_index, index, -step_seconds
            );
        }

        cumulative_distance_m += step_distance_m;
        let pace_m_per_s = pace(step_distance_m, step_seconds);

        rows.push(DerivedRow {
            segment_index,
            timestamp: point.timestamp,
            latitude: point.latitude,
            longitude: point.longitude,
            elevation: point.elevation,
            step_distance_m,
            step_seconds,
            cumulative_distance_m,
            cumulative_km: cumulative_distance_m / 1000.0,
            pace_m_per_s,
            speed_kmh: pace_m_per_s.map(|p| p * MPS_TO_KMH),
        });

        previous = Some(point);
    }

    debug!(
        "[Metrics] Segment {}: {} points, {:.1} m",
        segment_index,
        points.len(),
        cumulative_distance_m
    );
}

/// Seconds between two points, or 0.0 unless both carry a timestamp.
fn elapsed_seconds(prev: &RawPoint, point: &RawPoint) -> f64 {
    match (prev.timestamp, point.timestamp) {
        (Some(t0), Some(t1)) => seconds_between(t0, t1),
        _ => 0.0,
    }
}

/// Signed seconds from `t0` to `t1` at microsecond resolution.
///
/// Spans too long for microseconds fall back to milliseconds.
pub(crate) fn seconds_between(t0: DateTime<Utc>, t1: DateTime<Utc>) -> f64 {
    let delta = t1 - t0;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

fn pace(step_distance_m: f64, step_seconds: f64) -> Option<f64> {
    if step_seconds == 0.0 {
        None
    } else {
        Some(step_distance_m / step_seconds)
    }
}
