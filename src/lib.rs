//! # Track Profile
//!
//! GPS track loading and motion-profile derivation.
//!
//! This library provides:
//! - GPX loading into ordered, validated segments of raw points
//! - A per-point metrics table (step and cumulative distance, elapsed time,
//!   pace, speed) with segment-reset semantics
//! - Summary statistics and chart-ready series for report consumers
//!
//! ## Features
//!
//! - **`parallel`** - Process independent tracks in parallel with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use track_profile::{process_bytes, ProfileConfig};
//!
//! let gpx = br#"<?xml version="1.0"?>
//! <gpx version="1.1" creator="demo">
//!   <trk><trkseg>
//!     <trkpt lat="0.0" lon="0.000"><ele>100</ele><time>2024-05-01T08:00:00Z</time></trkpt>
//!     <trkpt lat="0.0" lon="0.001"><ele>105</ele><time>2024-05-01T08:00:10Z</time></trkpt>
//!   </trkseg></trk>
//! </gpx>"#;
//!
//! let profile = process_bytes(gpx, &ProfileConfig::default()).unwrap();
//! let last = &profile.table.rows()[1];
//! assert_eq!(last.step_seconds, 10.0);
//! assert!((last.speed_kmh.unwrap() - 40.0).abs() < 0.1);
//! ```

use std::io::Read;
use std::ops::Range;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackError};

// Geographic utilities (distance, bounds)
pub mod geo_utils;

// GPX loading
pub mod loader;
pub use loader::{load_file, load_reader, parse_gpx};

// Per-point metrics derivation
pub mod metrics;
pub use metrics::{derive_metrics, derive_segment, DerivedRow, DerivedTable};

// Report statistics
pub mod summary;
pub use summary::{summarize, TrackSummary};

// Chart series preparation
pub mod series;
pub use series::{
    elevation_profile, rolling_mean, speed_profile, ProfilePoint, DEFAULT_SMOOTHING_WINDOW,
};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use track_profile::GpsPoint;
/// let point = GpsPoint::new(46.5197, 6.6323); // Lausanne
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One recorded GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, `None` when not recorded
    pub elevation: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawPoint {
    /// Create a point with coordinates only.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            timestamp: None,
        }
    }

    /// Set the elevation (NaN and infinities are stored as `None`).
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation).filter(|e| e.is_finite());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Bounding box for a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// An ordered sequence of segments, stored as one point arena plus
/// per-segment index ranges.
///
/// A `Track` always holds at least one point: both the loader and
/// [`Track::from_segments`] reject empty input with [`TrackError::EmptyTrack`].
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Name of the first `<trk>`, if the document carries one
    pub name: Option<String>,
    points: Vec<RawPoint>,
    segments: Vec<Range<usize>>,
}

impl Track {
    /// Build a validated track from in-memory segments.
    ///
    /// Applies the same checks as the loader: every coordinate must be in
    /// range and at least one point must exist.
    pub fn from_segments(segments: Vec<Vec<RawPoint>>) -> Result<Self> {
        let mut builder = TrackBuilder::default();
        for segment in segments {
            builder.begin_segment();
            for point in segment {
                builder.push_point(point)?;
            }
        }
        builder.finish()
    }

    /// Number of points across all segments.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of segments, including empty ones.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// All points in file order.
    pub fn points(&self) -> &[RawPoint] {
        &self.points
    }

    /// Points of one segment, or `None` if the index is out of range.
    pub fn segment(&self, index: usize) -> Option<&[RawPoint]> {
        self.segments
            .get(index)
            .map(|range| &self.points[range.clone()])
    }

    /// Segments in file order.
    pub fn segments(&self) -> impl Iterator<Item = &[RawPoint]> + '_ {
        self.segments
            .iter()
            .map(move |range| &self.points[range.clone()])
    }
}

/// Incremental track construction shared by the loader and `Track::from_segments`.
#[derive(Debug, Default)]
pub(crate) struct TrackBuilder {
    name: Option<String>,
    points: Vec<RawPoint>,
    segments: Vec<Range<usize>>,
}

impl TrackBuilder {
    pub(crate) fn set_name(&mut self, name: String) {
        if self.name.is_none() && !name.is_empty() {
            self.name = Some(name);
        }
    }

    /// Open a new (possibly empty) segment.
    pub(crate) fn begin_segment(&mut self) {
        let start = self.points.len();
        self.segments.push(start..start);
    }

    /// Append a point to the current segment, opening one if needed.
    pub(crate) fn push_point(&mut self, point: RawPoint) -> Result<()> {
        if self.segments.is_empty() {
            self.begin_segment();
        }
        let index = self.points.len();
        let segment = self.segments.len() - 1;
        if !point.position().is_valid() {
            return Err(TrackError::InvalidPoint {
                index,
                segment,
                latitude: point.latitude,
                longitude: point.longitude,
            });
        }
        self.points.push(point);
        self.segments[segment].end = index + 1;
        Ok(())
    }

    pub(crate) fn point_count(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn finish(self) -> Result<Track> {
        if self.points.is_empty() {
            return Err(TrackError::EmptyTrack);
        }
        Ok(Track {
            name: self.name,
            points: self.points,
            segments: self.segments,
        })
    }
}

/// Configuration for the end-to-end pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Maximum number of points accepted before derivation.
    /// Derivation cost and table size are linear in point count.
    /// Default: 1,000,000
    pub max_points: usize,

    /// Rolling-mean window (in rows) for the smoothed speed series.
    /// Default: 5
    pub smoothing_window: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_points: 1_000_000,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

/// Everything the chart renderer and report builder consume for one track.
#[derive(Debug, Clone, Serialize)]
pub struct TrackProfile {
    pub track_name: Option<String>,
    pub table: DerivedTable,
    pub summary: TrackSummary,
}

impl TrackProfile {
    /// Elevation-vs-distance series, `None` when the track has no elevation.
    pub fn elevation_series(&self) -> Option<Vec<ProfilePoint>> {
        elevation_profile(&self.table)
    }

    /// Smoothed speed-vs-distance series.
    pub fn speed_series(&self, config: &ProfileConfig) -> Vec<ProfilePoint> {
        speed_profile(&self.table, config.smoothing_window)
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Derive the profile for an already-loaded track.
///
/// Fails only when the track exceeds `config.max_points`.
pub fn profile_track(track: &Track, config: &ProfileConfig) -> Result<TrackProfile> {
    if track.point_count() > config.max_points {
        return Err(TrackError::TooManyPoints {
            point_count: track.point_count(),
            limit: config.max_points,
        });
    }

    let table = derive_metrics(track);
    let summary = summarize(&table);

    info!(
        "[Pipeline] Profiled {} points in {} segments: {:.2} km",
        table.len(),
        table.segment_count(),
        summary.total_distance_km
    );

    Ok(TrackProfile {
        track_name: track.name.clone(),
        table,
        summary,
    })
}

/// Load a GPX file and derive its profile.
pub fn process_file<P: AsRef<Path>>(path: P, config: &ProfileConfig) -> Result<TrackProfile> {
    let track = load_file(path)?;
    profile_track(&track, config)
}

/// Read a GPX document from a stream and derive its profile.
pub fn process_reader<R: Read>(reader: R, config: &ProfileConfig) -> Result<TrackProfile> {
    let track = load_reader(reader)?;
    profile_track(&track, config)
}

/// Parse an in-memory GPX document and derive its profile.
pub fn process_bytes(input: &[u8], config: &ProfileConfig) -> Result<TrackProfile> {
    let track = parse_gpx(input)?;
    profile_track(&track, config)
}

/// Process several GPX files in parallel.
///
/// Each file runs through its own independent pipeline; results are returned
/// in input order.
#[cfg(feature = "parallel")]
pub fn process_files_parallel<P>(paths: &[P], config: &ProfileConfig) -> Vec<Result<TrackProfile>>
where
    P: AsRef<Path> + Sync,
{
    use rayon::prelude::*;

    info!("[Pipeline] Processing {} files in parallel", paths.len());
    paths
        .par_iter()
        .map(|path| process_file(path, config))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
