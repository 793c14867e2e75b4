//! GPX track loading.
//!
//! Streams the document with `quick-xml` and collects
//! `gpx > trk > trkseg > trkpt` into a [`Track`]. Multiple `<trk>` elements
//! are flattened in document order, one segment per `<trkseg>`.
//!
//! Loading is all-or-nothing: any malformed element, out-of-range coordinate
//! or empty document aborts with a [`TrackError`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OptionExt, Result, TrackError};
use crate::{RawPoint, Track, TrackBuilder};

/// Load a track from a GPX file on disk.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Track> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TrackError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    info!("[Loader] Reading {}", path.display());
    load_reader(file).map_err(|e| match e {
        TrackError::Io { message, .. } => TrackError::Io {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Load a track from any reader with a single blocking read.
pub fn load_reader<R: Read>(mut reader: R) -> Result<Track> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input).map_err(|e| TrackError::Io {
        path: "<stream>".to_string(),
        message: e.to_string(),
    })?;
    parse_gpx(&input)
}

/// Parse a GPX document held in memory.
///
/// # Example
/// ```
/// use track_profile::parse_gpx;
///
/// let gpx = br#"<gpx><trk><trkseg>
///     <trkpt lat="45.0" lon="7.0"><ele>812.4</ele></trkpt>
///     <trkpt lat="45.001" lon="7.0"/>
/// </trkseg></trk></gpx>"#;
///
/// let track = parse_gpx(gpx).unwrap();
/// assert_eq!(track.point_count(), 2);
/// assert_eq!(track.points()[0].elevation, Some(812.4));
/// assert_eq!(track.points()[1].elevation, None);
/// ```
pub fn parse_gpx(input: &[u8]) -> Result<Track> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut parser = GpxParser::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            TrackError::malformed(format!(
                "XML error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => parser.start(e)?,
            Event::Empty(ref e) => {
                parser.start(e)?;
                parser.end()?;
            }
            Event::End(_) => parser.end()?,
            Event::Text(ref e) => {
                if parser.collecting_text() {
                    let text = e
                        .unescape()
                        .map_err(|e| TrackError::malformed(format!("invalid text: {}", e)))?;
                    parser.text.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if parser.collecting_text() {
                    let text = std::str::from_utf8(e)
                        .map_err(|e| TrackError::malformed(format!("invalid CDATA: {}", e)))?;
                    parser.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    parser.finish()
}

/// Element context the parser cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Gpx,
    Trk,
    TrkName,
    TrkSeg,
    TrkPt,
    Ele,
    Time,
    Other,
}

#[derive(Debug, Default)]
struct GpxParser {
    stack: Vec<Element>,
    seen_root: bool,
    builder: TrackBuilder,
    /// Point currently being assembled inside `<trkpt>`
    pending: Option<RawPoint>,
    text: String,
}

impl GpxParser {
    fn parent(&self) -> Option<Element> {
        self.stack.last().copied()
    }

    fn collecting_text(&self) -> bool {
        matches!(
            self.parent(),
            Some(Element::Ele) | Some(Element::Time) | Some(Element::TrkName)
        )
    }

    /// Self-closing elements are followed by an explicit `end()` from the caller.
    fn start(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let name = e.local_name();
        let parent = self.parent();

        let element = match (parent, name.as_ref()) {
            (None, b"gpx") => Element::Gpx,
            (None, other) => {
                return Err(TrackError::malformed(format!(
                    "expected <gpx> root element, found <{}>",
                    String::from_utf8_lossy(other)
                )));
            }
            (Some(Element::Gpx), b"trk") => Element::Trk,
            (Some(Element::Trk), b"name") => Element::TrkName,
            (Some(Element::Trk), b"trkseg") => Element::TrkSeg,
            (Some(Element::TrkSeg), b"trkpt") => Element::TrkPt,
            (Some(Element::TrkPt), b"ele") => Element::Ele,
            (Some(Element::TrkPt), b"time") => Element::Time,
            _ => Element::Other,
        };

        match element {
            Element::Gpx => {
                if self.seen_root {
                    return Err(TrackError::malformed("multiple root elements"));
                }
                self.seen_root = true;
            }
            Element::TrkSeg => self.builder.begin_segment(),
            Element::TrkPt => self.pending = Some(parse_trkpt_attributes(e)?),
            Element::Ele | Element::Time | Element::TrkName => self.text.clear(),
            _ => {}
        }

        self.stack.push(element);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let element = self
            .stack
            .pop()
            .ok_or_malformed("closing tag without matching opening tag")?;

        match element {
            Element::TrkPt => {
                let point = self
                    .pending
                    .take()
                    .ok_or_malformed("trkpt closed without coordinates")?;
                self.builder.push_point(point)?;
            }
            Element::Ele => {
                let elevation = parse_elevation(&self.text)?;
                if let Some(point) = self.pending.as_mut() {
                    point.elevation = elevation;
                }
            }
            Element::Time => {
                let timestamp = parse_timestamp(&self.text)?;
                if let Some(point) = self.pending.as_mut() {
                    point.timestamp = timestamp;
                }
            }
            Element::TrkName => {
                let name = self.text.trim().to_string();
                self.builder.set_name(name);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Track> {
        if !self.seen_root {
            return Err(TrackError::malformed("document has no <gpx> root element"));
        }
        if !self.stack.is_empty() {
            return Err(TrackError::malformed(format!(
                "unexpected end of document with {} unclosed elements",
                self.stack.len()
            )));
        }

        debug!(
            "[Loader] Parsed {} points in {} segments",
            self.builder.point_count(),
            self.builder.segment_count()
        );
        self.builder.finish()
    }
}

fn parse_trkpt_attributes(e: &BytesStart<'_>) -> Result<RawPoint> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| TrackError::malformed(format!("invalid attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| TrackError::malformed(format!("invalid attribute value: {}", e)))?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate("lat", &value)?),
            b"lon" => lon = Some(parse_coordinate("lon", &value)?),
            _ => {}
        }
    }

    let latitude = lat.ok_or_malformed("trkpt missing lat attribute")?;
    let longitude = lon.ok_or_malformed("trkpt missing lon attribute")?;
    Ok(RawPoint::new(latitude, longitude))
}

fn parse_coordinate(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| TrackError::malformed(format!("trkpt {} is not a number: '{}'", name, value)))
}

/// Empty or non-finite elevation is treated as absent.
fn parse_elevation(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let value = text
        .parse::<f64>()
        .map_err(|_| TrackError::malformed(format!("ele is not a number: '{}'", text)))?;
    Ok(Some(value).filter(|v| v.is_finite()))
}

/// RFC 3339 instants, or offset-less ISO 8601 date-times taken as UTC.
fn parse_timestamp(text: &str) -> Result<Option<DateTime<Utc>>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| TrackError::malformed(format!("time is not an ISO 8601 instant: '{}'", text)))
}
