//! Interfaces to the external detection capabilities.
//!
//! Locating hands or faces in a raw image is not this crate's job; it is
//! delegated to detector implementations behind the traits defined here. The
//! pipeline only consumes the geometric primitives they return.

#[cfg(feature = "stub-detect")]
pub mod stub;

use crate::face::FaceDetection;
use crate::hand::HandDetection;
use crate::image::Image;

/// Locates hands in an image.
///
/// A detector may return zero or more hands per frame. The order of the
/// returned detections is not guaranteed to be stable across frames.
pub trait HandDetector: Send {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandDetection>>;
}

/// Locates faces in an image.
///
/// The position of a detection in the returned vector is reused as its
/// smoothing slot, see [`crate::face`].
pub trait FaceDetector: Send {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<FaceDetection>>;
}
