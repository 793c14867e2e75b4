//! Unified error handling for the track-profile library.
//!
//! Every failure happens in the loader or the pipeline guard. Metric
//! derivation itself never fails: undefined values surface as `None`.

use thiserror::Error;

/// Unified error type for track-profile operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    /// Input could not be parsed as a track-recording document
    #[error("Malformed track: {message}")]
    MalformedTrack { message: String },

    /// Document parsed but contains no points in any segment
    #[error("Track contains no points")]
    EmptyTrack,

    /// A point has non-finite or out-of-range coordinates
    #[error("Point {index} (segment {segment}) has invalid coordinates ({latitude}, {longitude})")]
    InvalidPoint {
        index: usize,
        segment: usize,
        latitude: f64,
        longitude: f64,
    },

    /// Track exceeds the configured point limit
    #[error("Track has {point_count} points, limit is {limit}")]
    TooManyPoints { point_count: usize, limit: usize },

    /// Input file could not be read
    #[error("Failed to read '{path}': {message}")]
    Io { path: String, message: String },
}

impl TrackError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        TrackError::MalformedTrack {
            message: message.into(),
        }
    }
}

/// Result type alias for track-profile operations.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Extension trait for converting Option to TrackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a malformed-track error.
    fn ok_or_malformed(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackError::malformed(message))
    }
}
