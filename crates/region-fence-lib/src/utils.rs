//! Utility functions for coordinate validation and bounding box operations
//!
//! Geometry follows the `geo` convention: `x` is longitude and `y` is latitude,
//! both in WGS84 degrees.

use crate::{FenceError, Result};
use geo::{Coord, Rect};

/// Latitude bounds in degrees
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;

/// Longitude bounds in degrees
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Convert a (lat, lng) pair to a `geo` coordinate
#[inline(always)]
pub fn latlng_to_coord(lat: f64, lng: f64) -> Coord<f64> {
    Coord { x: lng, y: lat }
}

/// Check if a (lat, lng) pair is finite and within WGS84 bounds
#[inline(always)]
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (MIN_LATITUDE..=MAX_LATITUDE).contains(&lat)
        && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&lng)
}

/// Validate a (lat, lng) pair, returning the matching `geo` coordinate
pub fn validate_coordinate(lat: f64, lng: f64) -> Result<Coord<f64>> {
    if !is_valid_coordinate(lat, lng) {
        return Err(FenceError::InvalidCoordinate { lat, lng });
    }
    Ok(latlng_to_coord(lat, lng))
}

/// Rectangle covering the whole Earth in degrees
pub fn earth_bounds() -> Rect<f64> {
    Rect::new(
        Coord {
            x: MIN_LONGITUDE,
            y: MIN_LATITUDE,
        },
        Coord {
            x: MAX_LONGITUDE,
            y: MAX_LATITUDE,
        },
    )
}

/// Check if a coordinate lies inside a rectangle (edges included)
#[inline(always)]
pub fn rect_contains_coord(rect: &Rect<f64>, coord: Coord<f64>) -> bool {
    let min = rect.min();
    let max = rect.max();
    coord.x >= min.x && coord.x <= max.x && coord.y >= min.y && coord.y <= max.y
}

/// Check if two rectangles share at least one point (closed intervals)
#[inline(always)]
pub fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    let (amin, amax) = (a.min(), a.max());
    let (bmin, bmax) = (b.min(), b.max());
    !(amax.x < bmin.x || amin.x > bmax.x || amax.y < bmin.y || amin.y > bmax.y)
}

/// Check if `outer` fully contains `inner`
#[inline(always)]
pub fn rect_contains_rect(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    let (omin, omax) = (outer.min(), outer.max());
    let (imin, imax) = (inner.min(), inner.max());
    omin.x <= imin.x && omin.y <= imin.y && omax.x >= imax.x && omax.y >= imax.y
}

/// Planar area of a rectangle in square degrees
#[inline(always)]
pub fn rect_area(rect: &Rect<f64>) -> f64 {
    rect.width() * rect.height()
}
