//! # georef
//!
//! The algorithmic core of a scanned-map georeferencing tool.
//!
//! Given a small number of user-picked correspondence points between image
//! pixel space and geographic space, `georef` computes the transform that
//! places the image on an interactive map and the placement (bounding box,
//! rotation, optional raster pre-rotation request) an overlay renderer
//! needs. It also merges and sorts the normalized 8-column CSV files the
//! tool's pin workflow produces.
//!
//! ## Features
//!
//! - **2-point similarity** — translation + uniform scale + rotation, with
//!   the rotation measured in projected screen space
//! - **3-point affine** — exact linear solve, shear and non-uniform scale
//! - **4-point projective** — full DLT homography
//! - **Registration session** — the collect/undo/apply state machine, with
//!   staleness guards for async decode and raster jobs
//! - **CSV merge** — ward-aware composite sorting with numeric-aware
//!   tie-breaking, snapshot-based and idempotent
//!
//! ## Example
//!
//! ```no_run
//! use georef::{
//!     GeoPoint, ImageSource, MapProjector, PixelPoint, RegistrationSession,
//!     ScreenPoint, TransformMode,
//! };
//!
//! # struct Widget;
//! # impl MapProjector for Widget {
//! #     fn project(&self, p: &GeoPoint) -> ScreenPoint { ScreenPoint { x: p.lng, y: -p.lat } }
//! #     fn distance(&self, _: &GeoPoint, _: &GeoPoint) -> f64 { 1.0 }
//! # }
//! # let map_widget = Widget;
//! let mut session = RegistrationSession::new(TransformMode::TwoPoint);
//!
//! let ticket = session.begin_image_load();
//! session.finish_image_load(ticket, ImageSource {
//!     width: 1600.0,
//!     height: 1200.0,
//!     display_scale: 0.5,
//! });
//!
//! // Two clicks on the image, then two on the map
//! session.add_image_point(PixelPoint::new(120.0, 80.0)).unwrap();
//! session.add_image_point(PixelPoint::new(700.0, 530.0)).unwrap();
//! session.add_map_point(GeoPoint::new(35.6812, 139.7671));
//! session.add_map_point(GeoPoint::new(35.6586, 139.7454));
//!
//! let placement = session.apply(&map_widget).unwrap();
//! println!(
//!     "bounds SW ({}, {}), rotation {:.1}°",
//!     placement.bounds.southwest.lat,
//!     placement.bounds.southwest.lng,
//!     placement.rotation_degrees,
//! );
//! ```
//!
//! The map widget, image decoding, raster rotation, and all DOM concerns
//! are external collaborators behind narrow interfaces ([`MapProjector`],
//! [`ImageSource`], [`RasterRequest`]); this crate is pure data and math.

pub mod error;
pub mod geo;
pub mod merge;
pub mod pin;
pub mod session;
pub mod transform;

pub use error::{Error, Result};
pub use geo::{GeoBounds, GeoPoint, MapProjector, PixelPoint, ScreenPoint};
pub use merge::{parse_records, CsvMerger, NormalizedRow, RawRecord, SortMode, COLUMNS};
pub use pin::{Pin, PinStore};
pub use session::{
    ImageSource, ImageTicket, Placement, RasterRequest, RegistrationSession, SessionState,
};
pub use transform::{
    AffineTransform, ProjectiveTransform, SimilarityTransform, Transform, TransformMode,
    ROTATION_RASTER_THRESHOLD_DEG,
};
