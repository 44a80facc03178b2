//! End-to-end pipeline tests with scripted sources and detectors.

use std::collections::VecDeque;

use anyhow::bail;
use nalgebra::Point2;

use arcam::camera::FrameSource;
use arcam::detection::{FaceDetector, HandDetector};
use arcam::face::FaceDetection;
use arcam::hand::{HandDetection, NUM_LANDMARKS};
use arcam::image::{Image, Rect};
use arcam::overlay::Overlay;
use arcam::pipeline::{FramePipeline, PipelineOptions};
use arcam::resolution::Resolution;

const RES: Resolution = Resolution::RES_480P;

/// Yields a fixed list of black frames, then signals end of stream.
struct ScriptedSource {
    frames: VecDeque<Image>,
}

impl ScriptedSource {
    fn new(count: usize) -> Self {
        Self {
            frames: (0..count)
                .map(|_| Image::new(RES.width(), RES.height()))
                .collect(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> anyhow::Result<Option<Image>> {
        Ok(self.frames.pop_front())
    }
}

struct NoHands;

impl HandDetector for NoHands {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<HandDetection>> {
        Ok(Vec::new())
    }
}

struct NoFaces;

impl FaceDetector for NoFaces {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<FaceDetection>> {
        Ok(Vec::new())
    }
}

/// Returns the same hand every frame.
struct FixedHand {
    hand: HandDetection,
}

impl HandDetector for FixedHand {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<HandDetection>> {
        Ok(vec![self.hand.clone()])
    }
}

/// Plays back a scripted sequence of face boxes, one list per frame.
struct ScriptedFaces {
    frames: VecDeque<Vec<Rect>>,
}

impl FaceDetector for ScriptedFaces {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<FaceDetection>> {
        let rects = self.frames.pop_front().unwrap_or_default();
        Ok(rects.into_iter().map(FaceDetection::new).collect())
    }
}

struct FailingHands;

impl HandDetector for FailingHands {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<HandDetection>> {
        bail!("inference backend exploded")
    }
}

fn pipeline<H: HandDetector, F: FaceDetector>(
    frames: usize,
    hands: H,
    faces: F,
    options: PipelineOptions,
) -> FramePipeline<ScriptedSource, H, F> {
    FramePipeline::new(
        move || Ok(ScriptedSource::new(frames)),
        hands,
        faces,
        Overlay::new("test"),
        options,
    )
}

/// Decodes the JPEG payload out of a stream chunk.
fn decode_chunk(bytes: &[u8]) -> Image {
    let start = bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("missing header terminator")
        + 4;
    let payload = &bytes[start..bytes.len() - 2];
    Image::decode_jpeg(payload).unwrap()
}

/// Bounding box of all pixels matching `pred`, if any.
fn colored_extent(
    image: &Image,
    min_row: u32,
    pred: impl Fn(arcam::image::Color) -> bool,
) -> Option<(u32, u32, u32, u32)> {
    let mut extent: Option<(u32, u32, u32, u32)> = None;
    for y in min_row..image.height() {
        for x in 0..image.width() {
            if pred(image.get(x, y)) {
                extent = Some(match extent {
                    None => (x, y, x, y),
                    Some((min_x, min_y, max_x, max_y)) => {
                        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                    }
                });
            }
        }
    }
    extent
}

// Thresholds are generous because JPEG chroma subsampling dilutes thin
// strokes against the black background.
fn blueish(color: arcam::image::Color) -> bool {
    color.b() >= 110 && color.r() < 100 && color.g() < 100
}

fn greenish(color: arcam::image::Color) -> bool {
    color.g() >= 110 && color.r() < 100 && color.b() < 100
}

#[test]
fn stream_ends_after_source_is_exhausted() {
    let mut pipeline = pipeline(2, NoHands, NoFaces, PipelineOptions::default());
    assert!(pipeline.next_chunk().unwrap().is_some());
    assert!(pipeline.next_chunk().unwrap().is_some());
    assert!(pipeline.next_chunk().unwrap().is_none());
    // Closed is terminal.
    assert!(pipeline.next_chunk().unwrap().is_none());
}

#[test]
fn iterator_yields_each_frame_once() {
    let mut pipeline = pipeline(3, NoHands, NoFaces, PipelineOptions::default());
    let chunks: Vec<_> = pipeline.iter_mut().collect::<Result<_, _>>().unwrap();
    assert_eq!(chunks.len(), 3);
}

#[test]
fn camera_open_failure_closes_the_stream() {
    let mut pipeline = FramePipeline::new(
        || -> anyhow::Result<ScriptedSource> { bail!("device unavailable") },
        NoHands,
        NoFaces,
        Overlay::new("test"),
        PipelineOptions::default(),
    );
    assert!(pipeline.next_chunk().is_err());
    assert!(pipeline.next_chunk().unwrap().is_none());
}

#[test]
fn detector_failure_is_fatal_by_default() {
    let mut pipeline = pipeline(5, FailingHands, NoFaces, PipelineOptions::default());
    assert!(pipeline.next_chunk().is_err());
    assert!(pipeline.next_chunk().unwrap().is_none());
}

#[test]
fn lenient_mode_survives_detector_failure() {
    let mut pipeline = pipeline(
        2,
        FailingHands,
        NoFaces,
        PipelineOptions::default().lenient_detectors(true),
    );
    assert!(pipeline.next_chunk().unwrap().is_some());
    assert!(pipeline.next_chunk().unwrap().is_some());
    assert!(pipeline.next_chunk().unwrap().is_none());
}

#[test]
fn face_box_is_smoothed_across_frames() {
    // Three frames of slightly jittering detections for slot 0. With
    // alpha 0.2 for both position and size, the EMA chain gives
    // x = 10.48, y = 10.16, w = 50.16, h = 49.84 on the third frame,
    // so the rendered box is (10, 10)/50x49 after truncation.
    let faces = ScriptedFaces {
        frames: VecDeque::from([
            vec![Rect::from_top_left(10.0, 10.0, 50.0, 50.0)],
            vec![Rect::from_top_left(12.0, 11.0, 51.0, 49.0)],
            vec![Rect::from_top_left(11.0, 10.0, 50.0, 50.0)],
        ]),
    };
    let mut pipeline = pipeline(
        3,
        NoHands,
        faces,
        PipelineOptions::default().alpha_pos(0.2).alpha_size(0.2),
    );

    let mut last = None;
    while let Some(chunk) = pipeline.next_chunk().unwrap() {
        last = Some(chunk);
    }
    let image = decode_chunk(last.unwrap().as_bytes());

    // Skip the top rows where the "face" label is drawn; everything else
    // blue is the rectangle. JPEG compression smears colors a little, so
    // allow a small tolerance around the analytic result.
    let (min_x, min_y, max_x, max_y) = colored_extent(&image, 8, blueish).expect("no box drawn");
    let tolerance = 3;
    assert!((min_x as i32 - 10).abs() <= tolerance, "min_x = {min_x}");
    assert!((min_y as i32 - 10).abs() <= tolerance, "min_y = {min_y}");
    assert!((max_x as i32 - 60).abs() <= tolerance, "max_x = {max_x}");
    assert!((max_y as i32 - 59).abs() <= tolerance, "max_y = {max_y}");
}

#[test]
fn contained_hand_is_drawn_edge_hand_is_not() {
    let mut landmarks = Vec::with_capacity(NUM_LANDMARKS);
    for i in 0..NUM_LANDMARKS {
        let t = i as f32 / (NUM_LANDMARKS - 1) as f32;
        landmarks.push(Point2::new(0.3 + 0.3 * t, 0.6 - 0.2 * t));
    }

    // Fully inside the frame: landmark markers and connecting lines appear.
    let hands = FixedHand {
        hand: HandDetection::new(landmarks.clone()),
    };
    let mut p = pipeline(1, hands, NoFaces, PipelineOptions::default());
    let image = decode_chunk(p.next_chunk().unwrap().unwrap().as_bytes());
    assert!(colored_extent(&image, 0, greenish).is_some());

    // Identical hand, translated so one landmark sits at x = 0: nothing of
    // it is drawn.
    let offset = landmarks[0].x;
    for lm in &mut landmarks {
        lm.x -= offset;
    }
    let hands = FixedHand {
        hand: HandDetection::new(landmarks),
    };
    let mut p = pipeline(1, hands, NoFaces, PipelineOptions::default());
    let image = decode_chunk(p.next_chunk().unwrap().unwrap().as_bytes());
    assert!(colored_extent(&image, 0, greenish).is_none());
}
