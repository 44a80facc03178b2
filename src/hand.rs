//! Hand landmark types.

use nalgebra::Point2;

use crate::image::Rect;
use crate::resolution::Resolution;

/// Number of landmarks that make up a [`HandDetection`].
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Pairs of anatomically adjacent landmarks, connected by the skeletal overlay.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Surround the palm:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// A single detected hand.
///
/// Holds [`NUM_LANDMARKS`] landmark positions in normalized image coordinates
/// (each coordinate in `[0.0, 1.0]`), ordered as in [`LandmarkIdx`], with the
/// wrist first.
#[derive(Debug, Clone)]
pub struct HandDetection {
    landmarks: Box<[Point2<f32>]>,
}

impl HandDetection {
    /// Creates a hand detection from its landmark positions.
    ///
    /// # Panics
    ///
    /// This method panics if `landmarks` does not contain exactly
    /// [`NUM_LANDMARKS`] points.
    pub fn new(landmarks: Vec<Point2<f32>>) -> Self {
        assert_eq!(
            landmarks.len(),
            NUM_LANDMARKS,
            "a hand consists of {} landmarks, got {}",
            NUM_LANDMARKS,
            landmarks.len(),
        );
        Self {
            landmarks: landmarks.into_boxed_slice(),
        }
    }

    /// Returns the normalized landmark positions.
    pub fn landmarks(&self) -> &[Point2<f32>] {
        &self.landmarks
    }

    /// Returns a landmark's position in pixel coordinates.
    pub fn landmark_px(&self, idx: LandmarkIdx, res: Resolution) -> Point2<f32> {
        let lm = self.landmarks[idx as usize];
        Point2::new(lm.x * res.width() as f32, lm.y * res.height() as f32)
    }

    /// Returns an iterator over all landmark positions in pixel coordinates.
    pub fn landmarks_px(&self, res: Resolution) -> impl Iterator<Item = Point2<f32>> + '_ {
        let (w, h) = (res.width() as f32, res.height() as f32);
        self.landmarks
            .iter()
            .map(move |lm| Point2::new(lm.x * w, lm.y * h))
    }

    /// Computes the axis-aligned pixel-space bounding rectangle of all
    /// landmarks.
    pub fn bounding_rect(&self, res: Resolution) -> Rect {
        Rect::bounding(self.landmarks_px(res)).unwrap()
    }

    /// Returns whether every landmark lies strictly inside the frame.
    ///
    /// A landmark exactly on the frame boundary counts as outside, so hands
    /// touching the frame edge are rejected.
    pub fn fully_contained(&self, res: Resolution) -> bool {
        let b = self.bounding_rect(res);
        b.x() > 0.0
            && b.x() + b.width() < res.width() as f32
            && b.y() > 0.0
            && b.y() + b.height() < res.height() as f32
    }
}
