//! 4-point projective transform (homography) via the DLT formulation.
//!
//! Each correspondence pair contributes two linear equations; four pairs
//! give an 8×8 system in the homography entries with h₃₃ fixed to 1:
//!
//! ```text
//! [x y 1 0 0 0 -x·u -y·u] · h = u      u = lng
//! [0 0 0 x y 1 -x·v -y·v] · h = v      v = lat
//! ```
//!
//! This is the true 4-point solve. An earlier incarnation of the tool
//! approximated the 4-point path by fitting an affine transform to the
//! first 3 pairs and discarding the 4th; that shortcut is intentionally not
//! preserved here, so output bounds differ from it whenever the 4th pair
//! carries real perspective.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::Error;
use crate::geo::{GeoPoint, PixelPoint};

/// Twice-the-triangle-area threshold below which an image point triple is
/// treated as collinear.
const COLLINEAR_EPS: f64 = 1e-9;

/// Denominator guard for points mapped near the homography's line at
/// infinity. Corners of a sanely registered image never get close.
const HORIZON_EPS: f64 = 1e-12;

/// Projective transform solved from 4 correspondence pairs.
#[derive(Debug, Clone)]
pub struct ProjectiveTransform {
    /// Row-major homography mapping (x, y, 1) to homogeneous (u, v, w),
    /// with u = lng, v = lat. `h[2][2]` is always 1.
    h: [[f64; 3]; 3],
}

impl ProjectiveTransform {
    /// Solve the homography from exactly 4 correspondence pairs.
    ///
    /// Fails with [`Error::DegenerateGeometry`] when any three image points
    /// are collinear (the homography is not determined) or the linear
    /// system is otherwise singular (e.g. duplicated map points).
    pub fn from_pairs(image: &[PixelPoint; 4], map: &[GeoPoint; 4]) -> Result<Self, Error> {
        // Any collinear triple on the image side leaves the system rank
        // deficient; reject it up front with a clear reason.
        for i in 0..2 {
            for j in (i + 1)..3 {
                for k in (j + 1)..4 {
                    if triangle_area_x2(&image[i], &image[j], &image[k]) < COLLINEAR_EPS {
                        return Err(Error::DegenerateGeometry("collinear image points"));
                    }
                }
            }
        }

        let mut a = DMatrix::<f64>::zeros(8, 8);
        let mut b = DVector::<f64>::zeros(8);

        for (i, (ip, mp)) in image.iter().zip(map.iter()).enumerate() {
            let (x, y) = (ip.x, ip.y);
            let (u, v) = (mp.lng, mp.lat);

            // u equation
            a[(2 * i, 0)] = x;
            a[(2 * i, 1)] = y;
            a[(2 * i, 2)] = 1.0;
            a[(2 * i, 6)] = -x * u;
            a[(2 * i, 7)] = -y * u;
            b[2 * i] = u;

            // v equation
            a[(2 * i + 1, 3)] = x;
            a[(2 * i + 1, 4)] = y;
            a[(2 * i + 1, 5)] = 1.0;
            a[(2 * i + 1, 6)] = -x * v;
            a[(2 * i + 1, 7)] = -y * v;
            b[2 * i + 1] = v;
        }

        let h = a
            .lu()
            .solve(&b)
            .ok_or(Error::DegenerateGeometry("singular projective system"))?;

        debug!(
            "projective solve: h = [{:.4e} {:.4e} {:.4} | {:.4e} {:.4e} {:.4} | {:.4e} {:.4e} 1]",
            h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7]
        );

        Ok(Self {
            h: [
                [h[0], h[1], h[2]],
                [h[3], h[4], h[5]],
                [h[6], h[7], 1.0],
            ],
        })
    }

    /// Map an image pixel point to a geographic point.
    pub fn apply(&self, p: &PixelPoint) -> GeoPoint {
        let h = &self.h;
        let mut w = h[2][0] * p.x + h[2][1] * p.y + h[2][2];
        if w.abs() < HORIZON_EPS {
            w = HORIZON_EPS.copysign(w + HORIZON_EPS);
        }
        let lng = (h[0][0] * p.x + h[0][1] * p.y + h[0][2]) / w;
        let lat = (h[1][0] * p.x + h[1][1] * p.y + h[1][2]) / w;
        GeoPoint::new(lat, lng)
    }
}

/// Twice the area of the triangle spanned by three pixel points.
fn triangle_area_x2(a: &PixelPoint, b: &PixelPoint, c: &PixelPoint) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs()
}
