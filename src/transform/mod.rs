//! Geometric transforms from correspondence-point pairs.
//!
//! Given K pairs of (image pixel point, geographic point), K ∈ {2, 3, 4},
//! this module computes the transform that places the image on the map:
//!
//! 1. **Similarity** (K = 2) — translation + uniform scale + rotation. The
//!    rotation is measured in projected screen space, not raw lat/lng, since
//!    lat/lng deltas are anisotropic on screen.
//! 2. **Affine** (K = 3) — adds shear and non-uniform scale; exact 6-unknown
//!    linear solve, no least squares.
//! 3. **Projective** (K = 4) — full homography via the standard DLT
//!    formulation (2 equations per pair, 8 unknowns with h33 = 1).
//!
//! Each transform maps any [`PixelPoint`] to a [`GeoPoint`] and can compute
//! the geographic envelope of the image's four corners. Transforms are
//! immutable once computed; a new correspondence set produces a new
//! transform.

pub mod affine;
pub mod projective;
pub mod similarity;

pub use affine::AffineTransform;
pub use projective::ProjectiveTransform;
pub use similarity::SimilarityTransform;

use crate::geo::{GeoBounds, GeoPoint, PixelPoint};

/// Rotation magnitude (degrees) at which a 2-point placement switches from a
/// plain bounding box to raster pre-rotation. Below this the rotation is
/// visually negligible; above it the overlay would visibly misplace the
/// image, and the overlay primitive has no native rotation parameter.
///
/// Inherited tunable with no stronger rationale than "looks right"; kept as
/// a named constant so it can be revisited.
pub const ROTATION_RASTER_THRESHOLD_DEG: f64 = 5.0;

/// How many correspondence pairs the registration collects, and which
/// transform is solved from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    /// Similarity transform from 2 pairs.
    #[default]
    TwoPoint,
    /// Affine transform from 3 pairs.
    ThreePoint,
    /// Projective transform from 4 pairs.
    FourPoint,
}

impl TransformMode {
    /// Number of correspondence pairs (K) this mode requires.
    pub fn point_count(&self) -> usize {
        match self {
            TransformMode::TwoPoint => 2,
            TransformMode::ThreePoint => 3,
            TransformMode::FourPoint => 4,
        }
    }
}

/// A computed image-to-map transform.
///
/// Tagged by the mode that produced it; each variant carries its own solved
/// parameters. Created fresh from a completed correspondence set and
/// discarded on reset or mode change.
#[derive(Debug, Clone)]
pub enum Transform {
    Similarity(SimilarityTransform),
    Affine(AffineTransform),
    Projective(ProjectiveTransform),
}

impl Transform {
    /// Map an image pixel point to a geographic point. Pure.
    pub fn apply(&self, p: &PixelPoint) -> GeoPoint {
        match self {
            Transform::Similarity(t) => t.apply(p),
            Transform::Affine(t) => t.apply(p),
            Transform::Projective(t) => t.apply(p),
        }
    }

    /// Geographic min/max envelope of the image's four corners.
    pub fn bounding_box(&self, image_width: f64, image_height: f64) -> GeoBounds {
        let corners = [
            self.apply(&PixelPoint::new(0.0, 0.0)),
            self.apply(&PixelPoint::new(image_width, 0.0)),
            self.apply(&PixelPoint::new(0.0, image_height)),
            self.apply(&PixelPoint::new(image_width, image_height)),
        ];
        // Four corners, never empty
        GeoBounds::envelope(&corners).unwrap_or(GeoBounds {
            southwest: GeoPoint::new(0.0, 0.0),
            northeast: GeoPoint::new(0.0, 0.0),
        })
    }

    /// Rotation carried by the transform, in degrees.
    ///
    /// Only the similarity transform carries one; a plain bounding box would
    /// misrepresent a rotated 2-point placement, so the angle rides along
    /// for the placement policy. Affine and projective placements are
    /// rendered as envelopes and report 0.
    pub fn rotation_degrees(&self) -> f64 {
        match self {
            Transform::Similarity(t) => t.rotation_degrees,
            Transform::Affine(_) | Transform::Projective(_) => 0.0,
        }
    }
}

/// Normalize an angle in degrees to the interval (-180, 180].
pub(crate) fn normalize_degrees(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d <= -180.0 {
        d += 360.0;
    } else if d > 180.0 {
        d -= 360.0;
    }
    d
}
