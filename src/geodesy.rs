//! Great-circle helpers on a spherical earth.

use crate::models::GeoPoint;

/// Mean earth radius in meters
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Haversine distance in meters.
pub fn distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let d_phi = (p2.lat - p1.lat).to_radians();
    let d_lambda = (p2.lon - p1.lon).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` just above 1 for antipodal points
    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

/// Initial bearing from `p1` towards `p2`, degrees in [0, 360).
pub fn bearing(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let d_lambda = (p2.lon - p1.lon).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let theta = y.atan2(x).to_degrees();
    let b = (theta + 360.0) % 360.0;
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Distance in meters from `point` to the great circle through `start` and `end`.
pub fn cross_track_distance(start: GeoPoint, end: GeoPoint, point: GeoPoint) -> f64 {
    let angular = distance(start, point) / EARTH_RADIUS;
    let delta = (bearing(start, point) - bearing(start, end)).to_radians();
    ((angular.sin() * delta.sin()).asin() * EARTH_RADIUS).abs()
}
