use std::sync::OnceLock;

use chrono::{DateTime, Utc};

use crate::bounds::{Bounds, TimeSpan};
use crate::datetime::{self, TimePoint, TimestampError};
use crate::geom;

/// A recorded track point (`<trkpt>`).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    /// Decimal degrees, WGS84.
    pub latitude: f64,
    /// Decimal degrees, WGS84.
    pub longitude: f64,
    /// Meters. Zero when the point has no `<ele>`.
    pub elevation: f64,
    pub time: Option<TimePoint>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: 0.0,
            time: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_time(mut self, time: impl Into<TimePoint>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// The point's instant, parsing its timestamp text on first use.
    pub fn instant(&self) -> datetime::Result<Option<DateTime<Utc>>> {
        self.time.as_ref().map(TimePoint::value).transpose()
    }
}

/// Aggregates every container level answers.
///
/// Values are computed from the level below on first access and cached for
/// the container's lifetime. Mutating the children after a read leaves the
/// cached value stale.
pub trait TrackAggregates {
    /// Planar length in meters.
    fn length_2d(&self) -> f64;

    /// Length in meters including elevation changes.
    fn length_3d(&self) -> f64;

    fn bounds(&self) -> &Bounds;

    /// Fails when any timestamp below this level cannot be parsed. Failures
    /// are not cached.
    fn time_span(&self) -> Result<&TimeSpan, TimestampError>;
}

/// Unevaluated or cached state of the four aggregates.
#[derive(Debug, Clone, Default)]
struct AggregateCache {
    length_2d: OnceLock<f64>,
    length_3d: OnceLock<f64>,
    bounds: OnceLock<Bounds>,
    time_span: OnceLock<TimeSpan>,
}

impl AggregateCache {
    fn length_2d(&self, level: &'static str, compute: impl FnOnce() -> f64) -> f64 {
        *self.length_2d.get_or_init(|| {
            tracing::trace!(level, "computing length_2d");
            compute()
        })
    }

    fn length_3d(&self, level: &'static str, compute: impl FnOnce() -> f64) -> f64 {
        *self.length_3d.get_or_init(|| {
            tracing::trace!(level, "computing length_3d");
            compute()
        })
    }

    fn bounds(&self, level: &'static str, compute: impl FnOnce() -> Bounds) -> &Bounds {
        self.bounds.get_or_init(|| {
            tracing::trace!(level, "computing bounds");
            compute()
        })
    }

    fn time_span(
        &self,
        level: &'static str,
        compute: impl FnOnce() -> Result<TimeSpan, TimestampError>,
    ) -> Result<&TimeSpan, TimestampError> {
        if let Some(span) = self.time_span.get() {
            return Ok(span);
        }
        tracing::trace!(level, "computing time_span");
        let span = compute()?;
        Ok(self.time_span.get_or_init(|| span))
    }
}

fn sum_lengths<T>(children: &[T], length: impl Fn(&T) -> f64) -> f64 {
    children.iter().fold(0.0, |acc, child| acc + length(child))
}

fn join_bounds<T: TrackAggregates>(children: &[T]) -> Bounds {
    let mut bounds = Bounds::new();
    for child in children {
        bounds.add_bounds(child.bounds());
    }
    bounds
}

fn join_time_spans<T: TrackAggregates>(children: &[T]) -> Result<TimeSpan, TimestampError> {
    let mut span = TimeSpan::new();
    for child in children {
        span.add_span(child.time_span()?);
    }
    Ok(span)
}

/// A track segment (`<trkseg>`): points in recorded order.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    pub points: Vec<GeoPoint>,
    cache: AggregateCache,
}

impl Segment {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self {
            points,
            cache: AggregateCache::default(),
        }
    }

    fn path_length(&self, distance: fn(&GeoPoint, &GeoPoint) -> f64) -> f64 {
        self.points
            .windows(2)
            .fold(0.0, |acc, pair| acc + distance(&pair[0], &pair[1]))
    }
}

impl TrackAggregates for Segment {
    fn length_2d(&self) -> f64 {
        self.cache
            .length_2d("segment", || self.path_length(geom::distance_2d))
    }

    fn length_3d(&self) -> f64 {
        self.cache
            .length_3d("segment", || self.path_length(geom::distance_3d))
    }

    fn bounds(&self) -> &Bounds {
        self.cache.bounds("segment", || {
            let mut bounds = Bounds::new();
            bounds.add_points(&self.points);
            bounds
        })
    }

    fn time_span(&self) -> Result<&TimeSpan, TimestampError> {
        self.cache.time_span("segment", || {
            let mut span = TimeSpan::new();
            for point in &self.points {
                if let Some(instant) = point.instant()? {
                    span.add_instant(instant);
                }
            }
            Ok(span)
        })
    }
}

/// A track (`<trk>`).
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    pub segments: Vec<Segment>,
    cache: AggregateCache,
}

impl Track {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Default::default()
        }
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }
}

impl TrackAggregates for Track {
    fn length_2d(&self) -> f64 {
        self.cache
            .length_2d("track", || sum_lengths(&self.segments, Segment::length_2d))
    }

    fn length_3d(&self) -> f64 {
        self.cache
            .length_3d("track", || sum_lengths(&self.segments, Segment::length_3d))
    }

    fn bounds(&self) -> &Bounds {
        self.cache.bounds("track", || join_bounds(&self.segments))
    }

    fn time_span(&self) -> Result<&TimeSpan, TimestampError> {
        self.cache
            .time_span("track", || join_time_spans(&self.segments))
    }
}

/// A whole GPX document (`<gpx>`).
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub name: Option<String>,
    pub tracks: Vec<Track>,
    cache: AggregateCache,
}

impl Document {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            ..Default::default()
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.tracks.iter().flat_map(|t| t.segments.iter())
    }

    pub fn point_count(&self) -> usize {
        self.tracks.iter().map(Track::point_count).sum()
    }
}

impl TrackAggregates for Document {
    fn length_2d(&self) -> f64 {
        self.cache
            .length_2d("document", || sum_lengths(&self.tracks, Track::length_2d))
    }

    fn length_3d(&self) -> f64 {
        self.cache
            .length_3d("document", || sum_lengths(&self.tracks, Track::length_3d))
    }

    fn bounds(&self) -> &Bounds {
        self.cache.bounds("document", || join_bounds(&self.tracks))
    }

    fn time_span(&self) -> Result<&TimeSpan, TimestampError> {
        self.cache
            .time_span("document", || join_time_spans(&self.tracks))
    }
}
