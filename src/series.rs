//! Chart-ready series built from a derived table.
//!
//! Renderers plot distance on the x axis. Gaps (`y == None`) are kept in
//! place so the renderer can break the line instead of interpolating.

use serde::{Deserialize, Serialize};

use crate::metrics::DerivedTable;

/// Default rolling window for the speed chart, in rows.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// One (x, y) sample of a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Cumulative distance in km
    pub x: f64,
    pub y: Option<f64>,
}

/// Elevation against cumulative distance.
///
/// Returns `None` when no row carries an elevation, meaning no elevation
/// chart can be produced.
pub fn elevation_profile(table: &DerivedTable) -> Option<Vec<ProfilePoint>> {
    if !table.has_elevation() {
        return None;
    }
    Some(
        table
            .rows()
            .iter()
            .map(|row| ProfilePoint {
                x: row.cumulative_km,
                y: row.elevation,
            })
            .collect(),
    )
}

/// Smoothed speed (km/h) against cumulative distance.
pub fn speed_profile(table: &DerivedTable, window: usize) -> Vec<ProfilePoint> {
    let speeds: Vec<Option<f64>> = table.rows().iter().map(|row| row.speed_kmh).collect();
    rolling_mean(&speeds, window)
        .into_iter()
        .zip(table.rows())
        .map(|(y, row)| ProfilePoint {
            x: row.cumulative_km,
            y,
        })
        .collect()
}

/// Trailing rolling mean over `window` values.
///
/// Undefined values are skipped; a position is undefined only when its whole
/// window is undefined. A window of 0 is treated as 1.
///
/// # Example
/// ```
/// use track_profile::rolling_mean;
///
/// let smoothed = rolling_mean(&[Some(2.0), None, Some(4.0), None, None, None], 2);
/// assert_eq!(smoothed, vec![Some(2.0), Some(2.0), Some(4.0), Some(4.0), None, None]);
/// ```
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut out = Vec::with_capacity(values.len());

    for (i, value) in values.iter().enumerate() {
        if let Some(v) = value {
            sum += v;
            count += 1;
        }
        if i >= window {
            if let Some(old) = values[i - window] {
                sum -= old;
                count -= 1;
            }
        }
        if count == 0 {
            sum = 0.0;
        }
        out.push(if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        });
    }
    out
}
