//! 2-point similarity transform: translation + uniform scale + rotation.
//!
//! Two correspondence pairs determine a similarity exactly, so the forward
//! map reproduces both pairs by construction. It is realized as a complex
//! multiplication `w = a·z + b` on y-up pixel coordinates mapped into the
//! (lng, lat) plane.
//!
//! The rotation angle used by the placement policy is computed separately,
//! in the map widget's projected screen space: a degree of longitude and a
//! degree of latitude span different numbers of on-screen pixels, so an
//! angle taken from raw lat/lng deltas would not match what the user sees.

use tracing::debug;

use crate::error::Error;
use crate::geo::{GeoPoint, MapProjector, PixelPoint};

use super::normalize_degrees;

const COINCIDENT_EPS: f64 = 1e-9;

/// Similarity transform solved from 2 correspondence pairs.
#[derive(Debug, Clone)]
pub struct SimilarityTransform {
    // Complex coefficients of w = a·z + b, with z = x + i·(-y) and
    // w = lng + i·lat.
    a_re: f64,
    a_im: f64,
    b_re: f64,
    b_im: f64,
    /// Rotation from image space to projected screen space, degrees,
    /// normalized to (-180, 180].
    pub rotation_degrees: f64,
    /// Ground scale in meters per natural image pixel.
    pub meters_per_pixel: f64,
}

impl SimilarityTransform {
    /// Solve the similarity from exactly 2 correspondence pairs.
    ///
    /// `image` points are in natural pixel space (screen clicks already
    /// divided by the display scale). Fails with
    /// [`Error::DegenerateGeometry`] if either the image points or the map
    /// points coincide — the scale is undefined in that case.
    pub fn from_pairs(
        image: &[PixelPoint; 2],
        map: &[GeoPoint; 2],
        projector: &dyn MapProjector,
    ) -> Result<Self, Error> {
        // Image-space vector, y-down as clicked
        let vx = image[1].x - image[0].x;
        let vy = image[1].y - image[0].y;
        let v_len = (vx * vx + vy * vy).sqrt();
        if v_len < COINCIDENT_EPS {
            return Err(Error::DegenerateGeometry("image points coincide"));
        }

        // Screen-space vector between the projected map points
        let s0 = projector.project(&map[0]);
        let s1 = projector.project(&map[1]);
        let sx = s1.x - s0.x;
        let sy = s1.y - s0.y;
        if (sx * sx + sy * sy).sqrt() < COINCIDENT_EPS {
            return Err(Error::DegenerateGeometry("map points coincide"));
        }

        let rotation_degrees =
            normalize_degrees((sy.atan2(sx) - vy.atan2(vx)).to_degrees());
        let meters_per_pixel = projector.distance(&map[0], &map[1]) / v_len;

        // Complex solve on y-up pixels: z = x - i·y, w = lng + i·lat
        let z0 = (image[0].x, -image[0].y);
        let z1 = (image[1].x, -image[1].y);
        let w0 = (map[0].lng, map[0].lat);
        let w1 = (map[1].lng, map[1].lat);

        let dz = (z1.0 - z0.0, z1.1 - z0.1);
        let dw = (w1.0 - w0.0, w1.1 - w0.1);

        // a = dw / dz
        let denom = dz.0 * dz.0 + dz.1 * dz.1;
        let a_re = (dw.0 * dz.0 + dw.1 * dz.1) / denom;
        let a_im = (dw.1 * dz.0 - dw.0 * dz.1) / denom;
        // b = w0 - a·z0
        let b_re = w0.0 - (a_re * z0.0 - a_im * z0.1);
        let b_im = w0.1 - (a_re * z0.1 + a_im * z0.0);

        debug!(
            "similarity solve: rotation={:.3}°, scale={:.4} m/px",
            rotation_degrees, meters_per_pixel
        );

        Ok(Self {
            a_re,
            a_im,
            b_re,
            b_im,
            rotation_degrees,
            meters_per_pixel,
        })
    }

    /// Map an image pixel point to a geographic point.
    pub fn apply(&self, p: &PixelPoint) -> GeoPoint {
        let zx = p.x;
        let zy = -p.y;
        let lng = self.a_re * zx - self.a_im * zy + self.b_re;
        let lat = self.a_re * zy + self.a_im * zx + self.b_im;
        GeoPoint::new(lat, lng)
    }
}
