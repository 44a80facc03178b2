//! The per-frame annotation pipeline.
//!
//! A [`FramePipeline`] turns a camera and a pair of detectors into a lazy
//! sequence of encoded stream chunks. Nothing happens until a chunk is
//! pulled: the camera is only opened on the first pull, and each pull runs
//! exactly one iteration of capture → detect → smooth → render → encode.
//!
//! The pipeline moves through three states: *idle* (camera not yet opened),
//! *streaming*, and the terminal *closed* state it enters when the source
//! runs out of frames or any stage fails. A closed pipeline stays closed;
//! callers wanting to continue must build a new one.

use crate::camera::FrameSource;
use crate::detection::{FaceDetector, HandDetector};
use crate::image::Rect;
use crate::overlay::Overlay;
use crate::resolution::Resolution;
use crate::stream::{self, StreamChunk};
use crate::timer::{FpsCounter, Timer};
use crate::track::{BoxSmoother, SlotAssignment};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    resolution: Resolution,
    alpha_pos: f32,
    alpha_size: f32,
    assignment: SlotAssignment,
    lenient_detectors: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::RES_480P,
            alpha_pos: BoxSmoother::DEFAULT_ALPHA_POS,
            alpha_size: BoxSmoother::DEFAULT_ALPHA_SIZE,
            assignment: SlotAssignment::Positional,
            lenient_detectors: false,
        }
    }
}

impl PipelineOptions {
    /// Sets the resolution frames are resized to before annotation.
    #[inline]
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the smoothing factor for face box positions.
    #[inline]
    pub fn alpha_pos(mut self, alpha: f32) -> Self {
        self.alpha_pos = alpha;
        self
    }

    /// Sets the smoothing factor for face box sizes.
    #[inline]
    pub fn alpha_size(mut self, alpha: f32) -> Self {
        self.alpha_size = alpha;
        self
    }

    /// Sets how detections are matched to smoothing slots.
    #[inline]
    pub fn assignment(mut self, assignment: SlotAssignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Treats a failing detector as having detected nothing, instead of
    /// ending the stream.
    ///
    /// Off by default: a detector error closes the pipeline.
    #[inline]
    pub fn lenient_detectors(mut self, lenient: bool) -> Self {
        self.lenient_detectors = lenient;
        self
    }
}

/// A lazy source of encoded stream chunks.
///
/// This is the seam between the annotation pipeline and transports; the
/// fan-out and serving layers only deal in `dyn ChunkStream`.
pub trait ChunkStream: Send {
    /// Produces the next chunk.
    ///
    /// Returns `Ok(None)` when the stream has ended. Any error is fatal: the
    /// stream is closed and subsequent calls return `Ok(None)`.
    fn next_chunk(&mut self) -> anyhow::Result<Option<StreamChunk>>;
}

enum State<C> {
    Idle(Box<dyn FnOnce() -> anyhow::Result<C> + Send>),
    Streaming(C),
    Closed,
}

/// Annotates camera frames and encodes them for streaming.
pub struct FramePipeline<C, H, F> {
    state: State<C>,
    hands: H,
    faces: F,
    smoother: BoxSmoother,
    overlay: Overlay,
    resolution: Resolution,
    lenient_detectors: bool,
    fps: FpsCounter,
    t_hands: Timer,
    t_faces: Timer,
    t_render: Timer,
    t_encode: Timer,
}

impl<C: FrameSource, H: HandDetector, F: FaceDetector> FramePipeline<C, H, F> {
    /// Creates a pipeline.
    ///
    /// `open` is invoked to acquire the camera when the first chunk is
    /// pulled, not before.
    pub fn new(
        open: impl FnOnce() -> anyhow::Result<C> + Send + 'static,
        hands: H,
        faces: F,
        overlay: Overlay,
        options: PipelineOptions,
    ) -> Self {
        let mut smoother = BoxSmoother::new(options.alpha_pos, options.alpha_size);
        smoother.set_assignment(options.assignment);
        Self {
            state: State::Idle(Box::new(open)),
            hands,
            faces,
            smoother,
            overlay,
            resolution: options.resolution,
            lenient_detectors: options.lenient_detectors,
            fps: FpsCounter::new("pipeline"),
            t_hands: Timer::new("hands"),
            t_faces: Timer::new("faces"),
            t_render: Timer::new("render"),
            t_encode: Timer::new("encode"),
        }
    }

    /// Runs one pipeline iteration and returns the resulting chunk.
    ///
    /// See [`ChunkStream::next_chunk`] for the contract.
    pub fn next_chunk(&mut self) -> anyhow::Result<Option<StreamChunk>> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Closed => return Ok(None),
            // First pull; acquire the camera. If that fails, the pipeline
            // stays closed.
            State::Idle(open) => self.state = State::Streaming(open()?),
            State::Streaming(source) => self.state = State::Streaming(source),
        }
        let State::Streaming(source) = &mut self.state else {
            unreachable!()
        };

        let frame = match source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!("frame source reached end of stream");
                self.state = State::Closed;
                return Ok(None);
            }
            Err(e) => {
                self.state = State::Closed;
                return Err(e);
            }
        };

        let mut frame = frame.resize(self.resolution);

        let hands = match self.t_hands.time(|| self.hands.detect(&frame)) {
            Ok(hands) => hands,
            Err(e) if self.lenient_detectors => {
                log::warn!("hand detector failed, skipping: {}", e);
                Vec::new()
            }
            Err(e) => {
                self.state = State::Closed;
                return Err(e);
            }
        };
        let faces = match self.t_faces.time(|| self.faces.detect(&frame)) {
            Ok(faces) => faces,
            Err(e) if self.lenient_detectors => {
                log::warn!("face detector failed, skipping: {}", e);
                Vec::new()
            }
            Err(e) => {
                self.state = State::Closed;
                return Err(e);
            }
        };

        let raw: Vec<Rect> = faces.iter().map(|f| f.bounding_rect()).collect();
        let slots = self.smoother.assign(&raw);
        let smoothed: Vec<Rect> = slots
            .iter()
            .zip(&raw)
            .map(|(&slot, &rect)| self.smoother.smooth(slot, rect))
            .collect();
        self.smoother.advance();

        self.t_render
            .time(|| self.overlay.draw(&mut frame, &hands, &smoothed));

        let chunk = match self.t_encode.time(|| stream::encode(&frame)) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.state = State::Closed;
                return Err(e);
            }
        };

        self.fps
            .tick_with([&self.t_hands, &self.t_faces, &self.t_render, &self.t_encode]);

        Ok(Some(chunk))
    }

    /// Returns a borrowing iterator over the chunks produced by this
    /// pipeline.
    ///
    /// The iterator ends when the pipeline closes; a fatal error is yielded
    /// as its last item.
    pub fn iter_mut(&mut self) -> IterMut<'_, C, H, F> {
        IterMut { pipeline: self }
    }
}

impl<C: FrameSource, H: HandDetector, F: FaceDetector> ChunkStream for FramePipeline<C, H, F> {
    fn next_chunk(&mut self) -> anyhow::Result<Option<StreamChunk>> {
        FramePipeline::next_chunk(self)
    }
}

/// A borrowing iterator over the chunks produced by a [`FramePipeline`].
pub struct IterMut<'a, C, H, F> {
    pipeline: &'a mut FramePipeline<C, H, F>,
}

impl<C: FrameSource, H: HandDetector, F: FaceDetector> Iterator for IterMut<'_, C, H, F> {
    type Item = anyhow::Result<StreamChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pipeline.next_chunk().transpose()
    }
}
