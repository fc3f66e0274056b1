//! Covering accumulators for positions and instants.
//!
//! Both types form a join: adding points or merging accumulators is
//! commutative and associative, so folding in any order yields the same
//! result.

use chrono::{DateTime, TimeDelta, Utc};

use crate::gpx_types::GeoPoint;

/// Smallest latitude/longitude rectangle covering every point added so far.
///
/// `min` and `max` are either both present or both absent. Only latitude
/// and longitude are tracked; the corner points carry no elevation or time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    min: Option<GeoPoint>,
    max: Option<GeoPoint>,
}

impl Bounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds spanning the rectangle between two corners, in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let mut bounds = Self::new();
        bounds.add_point(&GeoPoint::new(a.0, a.1));
        bounds.add_point(&GeoPoint::new(b.0, b.1));
        bounds
    }

    pub fn min(&self) -> Option<&GeoPoint> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&GeoPoint> {
        self.max.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.min.is_some(), self.max.is_some());
        self.min.is_none()
    }

    pub fn add_point(&mut self, point: &GeoPoint) {
        if let (Some(min), Some(max)) = (self.min.as_mut(), self.max.as_mut()) {
            min.latitude = min.latitude.min(point.latitude);
            min.longitude = min.longitude.min(point.longitude);
            max.latitude = max.latitude.max(point.latitude);
            max.longitude = max.longitude.max(point.longitude);
            return;
        }

        let corner = GeoPoint::new(point.latitude, point.longitude);
        self.min = Some(corner.clone());
        self.max = Some(corner);
    }

    pub fn add_points<'a>(&mut self, points: impl IntoIterator<Item = &'a GeoPoint>) {
        for point in points {
            self.add_point(point);
        }
    }

    pub fn add_bounds(&mut self, other: &Bounds) {
        if let (Some(min), Some(max)) = (&other.min, &other.max) {
            self.add_point(min);
            self.add_point(max);
        }
    }

    /// Join of `self` and `other`, leaving both untouched.
    pub fn combined_with(&self, other: &Bounds) -> Bounds {
        let mut combined = self.clone();
        combined.add_bounds(other);
        combined
    }

    /// `[min_lon, min_lat, max_lon, max_lat]`, the RFC 7946 bbox order.
    pub fn to_bbox(&self) -> Option<[f64; 4]> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => Some([
                min.longitude,
                min.latitude,
                max.longitude,
                max.latitude,
            ]),
            _ => None,
        }
    }
}

/// Smallest interval covering every instant added so far.
///
/// `start` and `end` are either both present or both absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSpan {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl TimeSpan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Span covering both instants, in any order.
    pub fn between(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        let mut span = Self::new();
        span.add_instant(a);
        span.add_instant(b);
        span
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.start.is_some(), self.end.is_some());
        self.start.is_none()
    }

    /// True when both ends are known.
    pub fn is_range(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn add_instant(&mut self, instant: DateTime<Utc>) {
        self.start = Some(self.start.map_or(instant, |start| start.min(instant)));
        self.end = Some(self.end.map_or(instant, |end| end.max(instant)));
    }

    pub fn add_span(&mut self, other: &TimeSpan) {
        if let (Some(start), Some(end)) = (other.start, other.end) {
            self.add_instant(start);
            self.add_instant(end);
        }
    }

    /// Join of `self` and `other`, leaving both untouched.
    pub fn combined_with(&self, other: &TimeSpan) -> TimeSpan {
        let mut combined = *self;
        combined.add_span(other);
        combined
    }

    /// `end - start`, or `None` for an empty span.
    pub fn duration(&self) -> Option<TimeDelta> {
        Some(self.end? - self.start?)
    }
}
