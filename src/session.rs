//! Registration session: collects correspondence points and emits a placement.
//!
//! The session is a small state machine driving one registration cycle:
//!
//! ```text
//! Idle → CollectingImagePoints → CollectingMapPoints → Ready → Applied
//! ```
//!
//! All K image points are collected before any map point (the UI gates the
//! clicks the same way). `apply` solves the mode's transform and produces a
//! [`Placement`] for the external overlay renderer; `reset` starts a new
//! cycle.
//!
//! Everything here is synchronous and runs to completion on the caller's
//! thread. The two asynchronous collaborators — image decoding and raster
//! pre-rotation — are guarded by an epoch counter so that a completion
//! arriving after a reset, mode change, or image reload is recognized as
//! stale and dropped instead of corrupting the session.

use tracing::debug;

use crate::error::Error;
use crate::geo::{meters_per_degree, GeoBounds, GeoPoint, MapProjector, PixelPoint};
use crate::transform::{
    AffineTransform, ProjectiveTransform, SimilarityTransform, Transform, TransformMode,
    ROTATION_RASTER_THRESHOLD_DEG,
};

/// Where the session is in its collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No image loaded.
    Idle,
    /// Accepting clicks on the image, up to K.
    CollectingImagePoints,
    /// Image points complete; accepting clicks on the map, up to K.
    CollectingMapPoints,
    /// Both sets complete; `apply` is enabled. Points may still be dragged.
    Ready,
    /// A placement was produced. Terminal for this cycle; only `reset`
    /// leaves it.
    Applied,
}

/// The loaded image the session registers onto the map.
#[derive(Debug, Clone)]
pub struct ImageSource {
    /// Natural pixel width.
    pub width: f64,
    /// Natural pixel height.
    pub height: f64,
    /// On-screen pixels per natural pixel of the point-picking preview.
    /// Clicks arrive in screen space and are divided by this.
    pub display_scale: f64,
}

/// Ticket identifying one in-flight image decode.
///
/// Returned by [`RegistrationSession::begin_image_load`]; only the most
/// recently issued ticket is honored by `finish_image_load`, so an
/// out-of-order decode completion is dropped rather than installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTicket(u64);

/// Work order for the external raster-rotation helper.
///
/// Produced only when the 2-point rotation is large enough that a plain
/// bounding-box overlay would misplace the image. The helper rotates the
/// raster about its center onto a square canvas padded to the image
/// diagonal (so nothing clips), then checks
/// [`RegistrationSession::raster_still_wanted`] before delivering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRequest {
    /// Rotation to apply to the pixel content, degrees, screen convention
    /// (positive = clockwise with +Y down).
    pub rotation_degrees: f64,
    /// Padded canvas width in pixels.
    pub canvas_width: f64,
    /// Padded canvas height in pixels.
    pub canvas_height: f64,
    /// Session epoch at the time of the request.
    pub epoch: u64,
}

/// The computed placement handed to the overlay renderer.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Southwest/northeast envelope the overlay is stretched into.
    pub bounds: GeoBounds,
    /// Rotation of the placement, degrees. Informational when no raster
    /// override is present.
    pub rotation_degrees: f64,
    /// Pre-rotation the raster helper must perform before the overlay is
    /// rendered; `None` when the plain image can be used as-is.
    pub raster_override: Option<RasterRequest>,
}

/// One image-to-map registration cycle.
#[derive(Debug)]
pub struct RegistrationSession {
    mode: TransformMode,
    state: SessionState,
    image: Option<ImageSource>,
    image_points: Vec<PixelPoint>,
    map_points: Vec<GeoPoint>,
    transform: Option<Transform>,
    /// Bumped on reset, mode change, and image reload; stale async results
    /// carry an older value and are dropped.
    epoch: u64,
}

impl RegistrationSession {
    pub fn new(mode: TransformMode) -> Self {
        Self {
            mode,
            state: SessionState::Idle,
            image: None,
            image_points: Vec::new(),
            map_points: Vec::new(),
            transform: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    /// Image points collected so far, in natural pixel space.
    pub fn image_points(&self) -> &[PixelPoint] {
        &self.image_points
    }

    pub fn map_points(&self) -> &[GeoPoint] {
        &self.map_points
    }

    /// The transform solved by the last successful `apply`, if any.
    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Start loading a new image. Invalidates any decode or raster job
    /// still in flight.
    pub fn begin_image_load(&mut self) -> ImageTicket {
        self.epoch += 1;
        ImageTicket(self.epoch)
    }

    /// Install a decoded image. Returns `false` (and changes nothing) if a
    /// newer load superseded this ticket while the decode was in flight.
    pub fn finish_image_load(&mut self, ticket: ImageTicket, source: ImageSource) -> bool {
        if ticket.0 != self.epoch {
            debug!("dropping stale image decode (ticket {} != epoch {})", ticket.0, self.epoch);
            return false;
        }
        self.image = Some(source);
        self.image_points.clear();
        self.map_points.clear();
        self.transform = None;
        self.transition(SessionState::CollectingImagePoints);
        true
    }

    /// Append an image point from a click in screen coordinates.
    ///
    /// The point is converted to natural pixel space via the image's display
    /// scale. Clicks arriving outside the image-collection phase (no image,
    /// or the set is already full) fail with [`Error::CapacityExceeded`];
    /// the UI simply ignores those.
    pub fn add_image_point(&mut self, screen: PixelPoint) -> Result<(), Error> {
        let k = self.mode.point_count();
        if self.state != SessionState::CollectingImagePoints {
            return Err(Error::CapacityExceeded { capacity: k });
        }
        // state invariant: image is present whenever we are collecting
        let scale = self.image.as_ref().map_or(1.0, |img| img.display_scale);
        self.image_points
            .push(PixelPoint::new(screen.x / scale, screen.y / scale));
        if self.image_points.len() == k {
            self.transition(SessionState::CollectingMapPoints);
        }
        Ok(())
    }

    /// Append a map point from a map click.
    ///
    /// Valid only once the image points are complete; otherwise the click is
    /// a normal user-timing race and is silently ignored (returns `false`).
    pub fn add_map_point(&mut self, p: GeoPoint) -> bool {
        if self.state != SessionState::CollectingMapPoints {
            return false;
        }
        self.map_points.push(p);
        if self.map_points.len() == self.mode.point_count() {
            self.transition(SessionState::Ready);
        }
        true
    }

    /// Remove the most recently added point, map points before image points
    /// (reverse chronological order — map points were added last).
    ///
    /// Returns `false` if there was nothing to undo. No-op in `Applied`;
    /// use `reset` to leave that state.
    pub fn undo_last(&mut self) -> bool {
        if self.state == SessionState::Applied || self.state == SessionState::Idle {
            return false;
        }
        if self.map_points.pop().is_some() {
            self.transition(SessionState::CollectingMapPoints);
            true
        } else if self.image_points.pop().is_some() {
            self.transition(SessionState::CollectingImagePoints);
            true
        } else {
            false
        }
    }

    /// Replace an already-placed image point (drag correction). Screen
    /// coordinates, converted like `add_image_point`. Does not change state.
    pub fn move_image_point(&mut self, index: usize, screen: PixelPoint) -> bool {
        if self.state == SessionState::Applied || index >= self.image_points.len() {
            return false;
        }
        let scale = self.image.as_ref().map_or(1.0, |img| img.display_scale);
        self.image_points[index] = PixelPoint::new(screen.x / scale, screen.y / scale);
        true
    }

    /// Replace an already-placed map point (drag correction).
    pub fn move_map_point(&mut self, index: usize, p: GeoPoint) -> bool {
        if self.state == SessionState::Applied || index >= self.map_points.len() {
            return false;
        }
        self.map_points[index] = p;
        true
    }

    /// Switch the correspondence mode. Clears both point sets in any state
    /// (partial sets are not portable between K values) and invalidates
    /// outstanding async work.
    pub fn set_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
        self.clear_points();
    }

    /// Clear everything except the loaded image and start a new cycle.
    pub fn reset(&mut self) {
        self.clear_points();
    }

    fn clear_points(&mut self) {
        self.image_points.clear();
        self.map_points.clear();
        self.transform = None;
        self.epoch += 1;
        let next = if self.image.is_some() {
            SessionState::CollectingImagePoints
        } else {
            SessionState::Idle
        };
        self.transition(next);
    }

    /// Whether a raster job issued at `epoch` should still deliver its
    /// result.
    pub fn raster_still_wanted(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    /// Solve the mode's transform from the completed correspondence set and
    /// produce a placement.
    ///
    /// Requires `Ready`. On [`Error::DegenerateGeometry`] the session stays
    /// in `Ready` so the user can re-pick a point; on success it moves to
    /// `Applied`.
    pub fn apply(&mut self, projector: &dyn MapProjector) -> Result<Placement, Error> {
        let k = self.mode.point_count();
        if self.state != SessionState::Ready {
            return Err(Error::InsufficientPoints {
                expected: 2 * k,
                got: self.image_points.len() + self.map_points.len(),
            });
        }
        // state invariant: Ready implies an image and two complete sets
        let image = self.image.clone().ok_or(Error::InsufficientPoints {
            expected: 2 * k,
            got: 0,
        })?;

        let (transform, placement) = match self.mode {
            TransformMode::TwoPoint => {
                let ip = [self.image_points[0], self.image_points[1]];
                let mp = [self.map_points[0], self.map_points[1]];
                let t = SimilarityTransform::from_pairs(&ip, &mp, projector)?;
                let placement = self.two_point_placement(&t, &image, &ip, &mp);
                (Transform::Similarity(t), placement)
            }
            TransformMode::ThreePoint => {
                let ip = [self.image_points[0], self.image_points[1], self.image_points[2]];
                let mp = [self.map_points[0], self.map_points[1], self.map_points[2]];
                let t = Transform::Affine(AffineTransform::from_pairs(&ip, &mp)?);
                let placement = Placement {
                    bounds: t.bounding_box(image.width, image.height),
                    rotation_degrees: 0.0,
                    raster_override: None,
                };
                (t, placement)
            }
            TransformMode::FourPoint => {
                let ip = [
                    self.image_points[0],
                    self.image_points[1],
                    self.image_points[2],
                    self.image_points[3],
                ];
                let mp = [
                    self.map_points[0],
                    self.map_points[1],
                    self.map_points[2],
                    self.map_points[3],
                ];
                let t = Transform::Projective(ProjectiveTransform::from_pairs(&ip, &mp)?);
                let placement = Placement {
                    bounds: t.bounding_box(image.width, image.height),
                    rotation_degrees: 0.0,
                    raster_override: None,
                };
                (t, placement)
            }
        };

        self.transform = Some(transform);
        self.transition(SessionState::Applied);
        Ok(placement)
    }

    /// Placement policy for the 2-point mode.
    ///
    /// Below [`ROTATION_RASTER_THRESHOLD_DEG`] the rotation is treated as
    /// negligible: bounds are anchored at the first correspondence with the
    /// uniform ground scale, no pixel content is touched. At or above the
    /// threshold the raster must be pre-rotated (the overlay primitive has
    /// no rotation parameter), so the correspondence pixel positions are
    /// recomputed on the padded rotated canvas and bounds rebuilt from it.
    fn two_point_placement(
        &self,
        t: &SimilarityTransform,
        image: &ImageSource,
        image_points: &[PixelPoint; 2],
        map_points: &[GeoPoint; 2],
    ) -> Placement {
        let rot = t.rotation_degrees;
        if rot.abs() < ROTATION_RASTER_THRESHOLD_DEG {
            let bounds = anchored_bounds(
                &image_points[0],
                &map_points[0],
                t.meters_per_pixel,
                image.width,
                image.height,
            );
            return Placement {
                bounds,
                rotation_degrees: rot,
                raster_override: None,
            };
        }

        // Pad the canvas to the diagonal so the rotated image never clips.
        let diag = (image.width * image.width + image.height * image.height)
            .sqrt()
            .ceil();
        let theta = rot.to_radians();
        let (sin_t, cos_t) = theta.sin_cos();
        let cx = image.width / 2.0;
        let cy = image.height / 2.0;
        let rotate = |p: &PixelPoint| {
            let dx = p.x - cx;
            let dy = p.y - cy;
            PixelPoint::new(
                cos_t * dx - sin_t * dy + diag / 2.0,
                sin_t * dx + cos_t * dy + diag / 2.0,
            )
        };
        let anchor = rotate(&image_points[0]);
        let bounds = anchored_bounds(&anchor, &map_points[0], t.meters_per_pixel, diag, diag);

        debug!(
            "2-point placement: rotation {:.2}° ≥ {ROTATION_RASTER_THRESHOLD_DEG}°, \
             pre-rotating raster onto {diag}×{diag} canvas",
            rot
        );

        Placement {
            bounds,
            rotation_degrees: rot,
            raster_override: Some(RasterRequest {
                rotation_degrees: rot,
                canvas_width: diag,
                canvas_height: diag,
                epoch: self.epoch,
            }),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.state {
            debug!("session {:?} → {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Bounds of a `canvas_width` × `canvas_height` pixel canvas anchored so
/// that `anchor_px` lands on `anchor_geo`, at a uniform ground scale of
/// `meters_per_pixel`. Translate + scale only; the longitude scale carries
/// the cos(lat) correction so the footprint is square on the ground.
fn anchored_bounds(
    anchor_px: &PixelPoint,
    anchor_geo: &GeoPoint,
    meters_per_pixel: f64,
    canvas_width: f64,
    canvas_height: f64,
) -> GeoBounds {
    let deg_lat_per_px = meters_per_pixel / meters_per_degree();
    let deg_lng_per_px =
        meters_per_pixel / (meters_per_degree() * anchor_geo.lat.to_radians().cos());

    let corner = |x: f64, y: f64| {
        GeoPoint::new(
            anchor_geo.lat - (y - anchor_px.y) * deg_lat_per_px,
            anchor_geo.lng + (x - anchor_px.x) * deg_lng_per_px,
        )
    };
    let corners = [
        corner(0.0, 0.0),
        corner(canvas_width, 0.0),
        corner(0.0, canvas_height),
        corner(canvas_width, canvas_height),
    ];
    // Four corners, never empty
    GeoBounds::envelope(&corners).unwrap_or(GeoBounds {
        southwest: *anchor_geo,
        northeast: *anchor_geo,
    })
}
