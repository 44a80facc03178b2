//! Synthetic detectors.
//!
//! These produce deterministic, smoothly moving detections without running
//! any actual inference, which makes them useful for exercising the full
//! pipeline and serving stack on machines without detection models.

use nalgebra::Point2;

use crate::face::FaceDetection;
use crate::hand::{HandDetection, NUM_LANDMARKS};
use crate::image::{Image, Rect};

use super::{FaceDetector, HandDetector};

/// Normalized landmark template of an upright right hand, wrist first,
/// in the unit square.
const HAND_TEMPLATE: [[f32; 2]; NUM_LANDMARKS] = [
    [0.50, 0.95], // wrist
    [0.35, 0.85],
    [0.25, 0.72],
    [0.18, 0.62],
    [0.12, 0.54], // thumb
    [0.38, 0.55],
    [0.36, 0.38],
    [0.35, 0.26],
    [0.34, 0.15], // index
    [0.50, 0.52],
    [0.50, 0.33],
    [0.50, 0.20],
    [0.50, 0.08], // middle
    [0.62, 0.55],
    [0.63, 0.38],
    [0.64, 0.26],
    [0.65, 0.16], // ring
    [0.73, 0.60],
    [0.76, 0.46],
    [0.78, 0.36],
    [0.80, 0.28], // pinky
];

/// Produces a single hand slowly orbiting the frame center.
#[derive(Default)]
pub struct StubHandDetector {
    tick: u32,
}

impl StubHandDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandDetector for StubHandDetector {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<HandDetection>> {
        let t = self.tick as f32;
        self.tick = self.tick.wrapping_add(1);

        let center_x = 0.5 + 0.18 * (t * 0.03).sin();
        let center_y = 0.5 + 0.12 * (t * 0.05).cos();
        let scale = 0.35;

        let landmarks = HAND_TEMPLATE
            .iter()
            .map(|[x, y]| {
                Point2::new(
                    center_x + (x - 0.5) * scale,
                    center_y + (y - 0.5) * scale,
                )
            })
            .collect();
        Ok(vec![HandDetection::new(landmarks)])
    }
}

/// Produces a single face box hovering near the frame center, with a bit of
/// per-frame jitter for the smoother to chew on.
#[derive(Default)]
pub struct StubFaceDetector {
    tick: u32,
}

impl StubFaceDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaceDetector for StubFaceDetector {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<FaceDetection>> {
        let t = self.tick as f32;
        self.tick = self.tick.wrapping_add(1);

        let (w, h) = (image.width() as f32, image.height() as f32);
        let cx = w * 0.5 + w * 0.08 * (t * 0.02).sin() + 3.0 * (t * 1.7).sin();
        let cy = h * 0.42 + h * 0.05 * (t * 0.03).cos() + 2.0 * (t * 2.3).cos();
        let bw = w * 0.22 + 2.0 * (t * 1.1).sin();
        let bh = h * 0.30 + 2.0 * (t * 0.9).cos();

        Ok(vec![FaceDetection::new(Rect::from_center(cx, cy, bw, bh))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_stays_normalized() {
        let mut detector = StubHandDetector::new();
        let image = Image::new(64, 64);
        for _ in 0..500 {
            for hand in detector.detect(&image).unwrap() {
                for lm in hand.landmarks() {
                    assert!(lm.x > 0.0 && lm.x < 1.0, "x out of range: {}", lm.x);
                    assert!(lm.y > 0.0 && lm.y < 1.0, "y out of range: {}", lm.y);
                }
            }
        }
    }

    #[test]
    fn face_box_is_sane() {
        let mut detector = StubFaceDetector::new();
        let image = Image::new(640, 480);
        for _ in 0..100 {
            let faces = detector.detect(&image).unwrap();
            assert_eq!(faces.len(), 1);
            assert!(faces[0].bounding_rect().width() > 0.0);
            assert!(faces[0].bounding_rect().height() > 0.0);
        }
    }
}
