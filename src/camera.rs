//! Frame acquisition.

#[cfg(feature = "webcam")]
mod webcam;

#[cfg(feature = "webcam")]
pub use webcam::Webcam;

use crate::image::Image;

/// A source of video frames.
pub trait FrameSource: Send {
    /// Reads the next frame.
    ///
    /// If no frame is available yet, this method blocks until one is.
    /// Returns `Ok(None)` once the source has permanently run out of frames.
    fn read(&mut self) -> anyhow::Result<Option<Image>>;
}
