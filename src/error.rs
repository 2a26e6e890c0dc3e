//! Error taxonomy for the registration and merge cores.
//!
//! Every variant is local and recoverable: the caller always has a path back
//! to a valid state (re-pick a point, add a source, undo). Collaborator
//! failures (image decode, network) are handled by the surrounding UI layer
//! and never surface here.

use thiserror::Error;

/// Errors produced by the registration session, transforms, and CSV merger.
#[derive(Debug, Error)]
pub enum Error {
    /// A transform was requested before the correspondence set was complete.
    /// UI code should prevent this by disabling the action; the core guards
    /// it anyway.
    #[error("insufficient correspondence points: expected {expected}, got {got}")]
    InsufficientPoints { expected: usize, got: usize },

    /// The correspondence points do not determine a transform (coincident or
    /// collinear picks). Recoverable: the user re-picks a point and the
    /// session stays in its current state.
    #[error("degenerate correspondence geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// A point was added past the mode's capacity K. Tolerated: the UI
    /// ignores extra clicks rather than surfacing this to the user.
    #[error("correspondence set already holds {capacity} points")]
    CapacityExceeded { capacity: usize },

    /// Export was requested with no rows in the dataset.
    #[error("dataset is empty; nothing to export")]
    EmptyDataset,

    /// CSV serialization failure (I/O into an in-memory buffer; not expected
    /// in practice).
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
