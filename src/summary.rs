//! Serializable overview of a parsed document.

use serde::Serialize;

use crate::bounds::TimeSpan;
use crate::datetime::format_gpx_time;
use crate::error::Result;
use crate::gpx_types::{Document, Track, TrackAggregates};

/// Counts, lengths, extent and time range of a whole document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxSummary {
    pub name: Option<String>,
    pub track_count: usize,
    pub segment_count: usize,
    pub point_count: usize,
    #[serde(rename = "length2d")]
    pub length_2d: f64,
    #[serde(rename = "length3d")]
    pub length_3d: f64,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bounds: Option<[f64; 4]>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_seconds: Option<f64>,
    pub tracks: Vec<TrackSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub name: Option<String>,
    pub segment_count: usize,
    pub point_count: usize,
    #[serde(rename = "length2d")]
    pub length_2d: f64,
    #[serde(rename = "length3d")]
    pub length_3d: f64,
    pub bounds: Option<[f64; 4]>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Evaluate every aggregate of `doc` and its tracks.
///
/// Fails with [`crate::GpxError::Timestamp`] when any track holds a
/// timestamp that cannot be parsed.
pub fn summarize(doc: &Document) -> Result<GpxSummary> {
    let tracks = doc
        .tracks
        .iter()
        .map(summarize_track)
        .collect::<Result<Vec<_>>>()?;

    let span = doc.time_span()?;
    let (start_time, end_time) = span_text(span);

    Ok(GpxSummary {
        name: doc.name.clone(),
        track_count: doc.tracks.len(),
        segment_count: doc.segments().count(),
        point_count: doc.point_count(),
        length_2d: doc.length_2d(),
        length_3d: doc.length_3d(),
        bounds: doc.bounds().to_bbox(),
        start_time,
        end_time,
        duration_seconds: span
            .duration()
            .map(|d| d.num_milliseconds() as f64 / 1000.0),
        tracks,
    })
}

fn summarize_track(track: &Track) -> Result<TrackSummary> {
    let (start_time, end_time) = span_text(track.time_span()?);

    Ok(TrackSummary {
        name: track.name.clone(),
        segment_count: track.segments.len(),
        point_count: track.point_count(),
        length_2d: track.length_2d(),
        length_3d: track.length_3d(),
        bounds: track.bounds().to_bbox(),
        start_time,
        end_time,
    })
}

fn span_text(span: &TimeSpan) -> (Option<String>, Option<String>) {
    (
        span.start().as_ref().map(format_gpx_time),
        span.end().as_ref().map(format_gpx_time),
    )
}
