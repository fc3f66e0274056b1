//! Distances between track points, in meters.
//!
//! Latitude and longitude in GPX files are always WGS84. Both functions use
//! the WGS84 semi-major axis as the Earth radius, which keeps the planar
//! approximation and its great-circle fallback consistent at the switch-over.

use std::f64::consts::PI;

use crate::gpx_types::GeoPoint;

/// WGS84 semi-major axis.
pub const EARTH_RADIUS: f64 = 6378.137 * 1000.0;

/// Length of one degree of arc on the equator (~111.319 km).
pub const ONE_DEGREE: f64 = (2.0 * PI * EARTH_RADIUS) / 360.0;

/// Largest latitude or longitude delta, in degrees, for which the planar
/// approximation is used.
pub const PLANAR_LIMIT_DEGREES: f64 = 0.2;

fn to_radians(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Great-circle distance between two points using the haversine formula.
pub fn great_circle_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Haversine distance over raw coordinates in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lon = to_radians(lon1 - lon2);
    let lat1 = to_radians(lat1);
    let lat2 = to_radians(lat2);
    let d_lat = lat1 - lat2;

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    EARTH_RADIUS * 2.0 * h.sqrt().asin()
}

/// Equirectangular distance between `a` and `b`.
///
/// The longitude delta is scaled by the cosine of `b`'s latitude. When either
/// delta exceeds [`PLANAR_LIMIT_DEGREES`] the small-angle approximation is
/// abandoned and [`great_circle_distance`] is returned instead, ignoring
/// elevation.
///
/// With `use_3d`, a difference in elevation is folded into the result as a
/// third axis. Equal elevations yield the 2D value.
pub fn planar_distance(a: &GeoPoint, b: &GeoPoint, use_3d: bool) -> f64 {
    if (b.latitude - a.latitude).abs() > PLANAR_LIMIT_DEGREES
        || (b.longitude - a.longitude).abs() > PLANAR_LIMIT_DEGREES
    {
        return great_circle_distance(b, a);
    }

    let coef = to_radians(b.latitude).cos();
    let x = b.latitude - a.latitude;
    let y = (b.longitude - a.longitude) * coef;
    let distance_2d = (x * x + y * y).sqrt() * ONE_DEGREE;

    if !use_3d || a.elevation == b.elevation {
        return distance_2d;
    }

    let elevation_diff = b.elevation - a.elevation;
    (distance_2d * distance_2d + elevation_diff * elevation_diff).sqrt()
}

/// Distance along the ground from `a` to `b`.
pub fn distance_2d(a: &GeoPoint, b: &GeoPoint) -> f64 {
    planar_distance(a, b, false)
}

/// Distance from `a` to `b` including the change in elevation.
pub fn distance_3d(a: &GeoPoint, b: &GeoPoint) -> f64 {
    planar_distance(a, b, true)
}
