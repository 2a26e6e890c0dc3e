//! Coordinate types and the map-widget projection contract.
//!
//! # Coordinate conventions
//!
//! - **Pixel coordinates** ([`PixelPoint`]): image pixels at the image's
//!   natural (unscaled) resolution, origin at the top-left corner, +X right,
//!   +Y down.
//! - **Geographic coordinates** ([`GeoPoint`]): WGS84 degrees. Range checks
//!   belong to the map widget, not this crate.
//! - **Screen coordinates** ([`ScreenPoint`]): on-screen pixels produced by
//!   the map widget's projection, +X right, +Y down. The 2-point rotation is
//!   computed here because lat/lng deltas are not isotropic on screen.

use std::f64::consts::PI;

/// Mean Earth radius in meters, used for degree/meter conversions.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (and of longitude at the equator).
pub fn meters_per_degree() -> f64 {
    EARTH_RADIUS_M * PI / 180.0
}

/// A point in image pixel space (natural resolution, +Y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another pixel point.
    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A geographic point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A point in on-screen pixel space as reported by the map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub southwest: GeoPoint,
    pub northeast: GeoPoint,
}

impl GeoBounds {
    /// Envelope of a set of geographic points.
    ///
    /// Returns `None` for an empty slice.
    pub fn envelope(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut min_lat = first.lat;
        let mut max_lat = first.lat;
        let mut min_lng = first.lng;
        let mut max_lng = first.lng;
        for p in &points[1..] {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }
        Some(Self {
            southwest: GeoPoint::new(min_lat, min_lng),
            northeast: GeoPoint::new(max_lat, max_lng),
        })
    }
}

/// Projection services the map widget must provide to the registration core.
///
/// The widget owns the actual projection (Web Mercator in practice); the core
/// only needs two operations: projecting a geographic point to the screen
/// (for the 2-point rotation, which must be measured in the same Euclidean
/// space as the image) and the ground distance between two points.
pub trait MapProjector {
    /// Project a geographic point to on-screen pixel coordinates.
    fn project(&self, p: &GeoPoint) -> ScreenPoint;

    /// Ground distance between two geographic points, in meters.
    fn distance(&self, a: &GeoPoint, b: &GeoPoint) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope() {
        let points = [
            GeoPoint::new(35.0, 139.0),
            GeoPoint::new(35.2, 138.8),
            GeoPoint::new(34.9, 139.1),
        ];
        let b = GeoBounds::envelope(&points).unwrap();
        assert_eq!(b.southwest, GeoPoint::new(34.9, 138.8));
        assert_eq!(b.northeast, GeoPoint::new(35.2, 139.1));
    }

    #[test]
    fn test_envelope_empty() {
        assert!(GeoBounds::envelope(&[]).is_none());
    }

    #[test]
    fn test_pixel_distance() {
        let a = PixelPoint::new(0.0, 0.0);
        let b = PixelPoint::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
