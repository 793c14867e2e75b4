//! End-to-end pipeline tests: GPX on disk -> table -> summary and chart series.
//!
//! Run with: `cargo test --test pipeline`
//! The parallel batch test needs `--features parallel`.

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use track_profile::{
    process_bytes, process_file, process_reader, ProfileConfig, TrackError,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Helper: write a GPX document into a temp dir and return its path.
fn write_gpx(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("failed to create gpx file");
    file.write_all(contents.as_bytes())
        .expect("failed to write gpx file");
    path
}

/// Two segments: a timed climb with elevation, then an untimed, flat walk.
fn hike_gpx() -> String {
    let mut gpx = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Ridge Loop</name>
    <trkseg>
"#,
    );
    for i in 0..10 {
        gpx.push_str(&format!(
            "      <trkpt lat=\"46.{:04}\" lon=\"7.0\"><ele>{}</ele><time>2024-06-01T08:{:02}:00Z</time></trkpt>\n",
            i * 10,
            1200 + i * 15,
            i
        ));
    }
    gpx.push_str("    </trkseg>\n    <trkseg>\n");
    for i in 0..5 {
        gpx.push_str(&format!(
            "      <trkpt lat=\"46.1\" lon=\"7.{:04}\"/>\n",
            i * 20
        ));
    }
    gpx.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    gpx
}

// ============================================================================
// Test: Full Pipeline from File
// ============================================================================

#[test]
fn test_process_file_end_to_end() {
    init_logging();
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = write_gpx(&dir, "hike.gpx", &hike_gpx());

    let config = ProfileConfig::default();
    let profile = process_file(&path, &config).expect("pipeline failed");

    assert_eq!(profile.track_name.as_deref(), Some("Ridge Loop"));
    assert_eq!(profile.table.len(), 15);
    assert_eq!(profile.table.segment_count(), 2);

    let rows = profile.table.rows();
    // Row order equals input order; segment 1 starts at row 10
    assert_eq!(rows[10].segment_index, 1);
    assert_eq!(rows[10].cumulative_distance_m, 0.0);
    assert_eq!(rows[9].segment_index, 0);

    // 0.001 degrees of latitude per minute is ~111 m/min, ~6.67 km/h
    for row in &rows[1..10] {
        assert_eq!(row.step_seconds, 60.0);
        assert!((row.speed_kmh.unwrap() - 6.67).abs() < 0.05);
    }
    // Second segment has no timestamps
    for row in &rows[10..] {
        assert_eq!(row.speed_kmh, None);
        assert_eq!(row.elevation, None);
    }
    assert!(rows[14].cumulative_distance_m > rows[11].cumulative_distance_m);

    let summary = &profile.summary;
    assert_eq!(summary.elevation_range_m, Some(135.0));
    assert!((summary.mean_speed_kmh.unwrap() - 6.67).abs() < 0.05);
    assert!((summary.total_distance_km - rows[9].cumulative_km).abs() < 1e-12);
    assert!(summary.segments_distance_km > summary.total_distance_km);

    let elevation = profile.elevation_series().expect("elevation chart expected");
    assert_eq!(elevation.len(), 15);
    assert_eq!(elevation[0].y, Some(1200.0));

    let speed = profile.speed_series(&config);
    assert_eq!(speed.len(), 15);
    assert_eq!(speed[0].y, None);
    // Smoothing window still covers timed rows at the start of segment 2
    assert!(speed[10].y.is_some());
    assert_eq!(speed[14].y, None);

    let json = profile.table.to_json();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 15);
}

#[test]
fn test_process_reader_matches_bytes() {
    init_logging();
    let gpx = hike_gpx();
    let config = ProfileConfig::default();

    let from_reader = process_reader(std::io::Cursor::new(gpx.clone()), &config).unwrap();
    let from_bytes = process_bytes(gpx.as_bytes(), &config).unwrap();
    assert_eq!(from_reader.table, from_bytes.table);
    assert_eq!(from_reader.summary, from_bytes.summary);
}

// ============================================================================
// Test: Failure Modes
// ============================================================================

#[test]
fn test_pipeline_errors() {
    init_logging();
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = ProfileConfig::default();

    let malformed = write_gpx(&dir, "bad.gpx", "{\"type\": \"FeatureCollection\"}");
    assert!(matches!(
        process_file(&malformed, &config),
        Err(TrackError::MalformedTrack { .. })
    ));

    let empty = write_gpx(
        &dir,
        "empty.gpx",
        r#"<gpx version="1.1"><trk><trkseg></trkseg></trk></gpx>"#,
    );
    assert_eq!(
        process_file(&empty, &config).unwrap_err(),
        TrackError::EmptyTrack
    );

    let invalid = write_gpx(
        &dir,
        "invalid.gpx",
        r#"<gpx><trk><trkseg><trkpt lat="0" lon="0"/><trkpt lat="0" lon="-190"/></trkseg></trk></gpx>"#,
    );
    assert!(matches!(
        process_file(&invalid, &config),
        Err(TrackError::InvalidPoint { index: 1, .. })
    ));

    let missing = dir.path().join("missing.gpx");
    assert!(matches!(
        process_file(&missing, &config),
        Err(TrackError::Io { .. })
    ));
}

#[test]
fn test_point_limit_guards_derivation() {
    init_logging();
    let config = ProfileConfig {
        max_points: 10,
        ..ProfileConfig::default()
    };
    assert_eq!(
        process_bytes(hike_gpx().as_bytes(), &config).unwrap_err(),
        TrackError::TooManyPoints {
            point_count: 15,
            limit: 10
        }
    );
}

// ============================================================================
// Test: Parallel Batch
// ============================================================================

#[cfg(feature = "parallel")]
#[test]
fn test_process_files_parallel() {
    use track_profile::process_files_parallel;

    init_logging();
    let dir = TempDir::new().expect("failed to create temp dir");
    let good = write_gpx(&dir, "good.gpx", &hike_gpx());
    let bad = write_gpx(&dir, "bad.gpx", "<html></html>");

    let paths = vec![good.clone(), bad, good];
    let results = process_files_parallel(&paths, &ProfileConfig::default());

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(TrackError::MalformedTrack { .. })));
    assert_eq!(
        results[0].as_ref().unwrap().table,
        results[2].as_ref().unwrap().table
    );
}
