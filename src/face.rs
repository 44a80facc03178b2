//! Face detection types.
//!
//! A face's identity across frames is *positional*: the index of a detection
//! in the per-frame result vector doubles as its smoothing slot. If the
//! detector reorders its results between frames, a slot's smoothed state
//! silently follows a different physical face. [`crate::track`] offers an
//! overlap-based assignment strategy as a best-effort alternative.

use crate::image::Rect;

/// A detected face.
#[derive(Debug, Clone, Copy)]
pub struct FaceDetection {
    rect: Rect,
}

impl FaceDetection {
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }

    /// Returns the axis-aligned bounding rectangle containing the face, in
    /// pixel coordinates.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }
}
