//! 3-point affine transform: linear map + translation.
//!
//! Three correspondence pairs determine the 6 unknowns of
//!
//! ```text
//! lat = a·x + b·y + c
//! lng = d·x + e·y + f
//! ```
//!
//! exactly — one 3×3 solve per output coordinate, no least squares. Shear
//! and non-uniform scale fall out of the solve naturally, which is what
//! distinguishes this from the 2-point similarity.

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::error::Error;
use crate::geo::{GeoPoint, PixelPoint};

/// Determinant threshold below which the three image points are treated as
/// collinear. Pixel coordinates are O(10³), so an exactly-collinear triple
/// gives 0 and anything meaningfully non-collinear is far above this.
const COLLINEAR_EPS: f64 = 1e-9;

/// Affine transform solved from 3 correspondence pairs.
#[derive(Debug, Clone)]
pub struct AffineTransform {
    // lat = a·x + b·y + c
    a: f64,
    b: f64,
    c: f64,
    // lng = d·x + e·y + f
    d: f64,
    e: f64,
    f: f64,
}

impl AffineTransform {
    /// Solve the affine system from exactly 3 correspondence pairs.
    ///
    /// Fails with [`Error::DegenerateGeometry`] when the image points are
    /// collinear or duplicated; the caller must surface the error and let
    /// the user re-pick — never guess.
    pub fn from_pairs(image: &[PixelPoint; 3], map: &[GeoPoint; 3]) -> Result<Self, Error> {
        let m = Matrix3::new(
            image[0].x, image[0].y, 1.0, //
            image[1].x, image[1].y, 1.0, //
            image[2].x, image[2].y, 1.0,
        );

        if m.determinant().abs() < COLLINEAR_EPS {
            return Err(Error::DegenerateGeometry("collinear image points"));
        }

        let lu = m.lu();
        let lat_rhs = Vector3::new(map[0].lat, map[1].lat, map[2].lat);
        let lng_rhs = Vector3::new(map[0].lng, map[1].lng, map[2].lng);

        let lat_coeffs = lu
            .solve(&lat_rhs)
            .ok_or(Error::DegenerateGeometry("singular affine system"))?;
        let lng_coeffs = lu
            .solve(&lng_rhs)
            .ok_or(Error::DegenerateGeometry("singular affine system"))?;

        debug!(
            "affine solve: lat=[{:.3e}, {:.3e}, {:.3}], lng=[{:.3e}, {:.3e}, {:.3}]",
            lat_coeffs[0], lat_coeffs[1], lat_coeffs[2], lng_coeffs[0], lng_coeffs[1], lng_coeffs[2]
        );

        Ok(Self {
            a: lat_coeffs[0],
            b: lat_coeffs[1],
            c: lat_coeffs[2],
            d: lng_coeffs[0],
            e: lng_coeffs[1],
            f: lng_coeffs[2],
        })
    }

    /// Map an image pixel point to a geographic point.
    pub fn apply(&self, p: &PixelPoint) -> GeoPoint {
        GeoPoint::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }
}
