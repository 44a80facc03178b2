//! V4L2 webcam access.
//!
//! Currently, only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion
//! JPEG frames are supported.

use std::env;

use anyhow::bail;
use linuxvideo::{
    format::{PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device,
};

use crate::image::Image;
use crate::resolution::Resolution;

use super::FrameSource;

const ENV_VAR_WEBCAM_NAME: &str = "ARCAM_WEBCAM_NAME";

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
    width: u32,
    height: u32,
}

impl Webcam {
    /// Opens the first supported webcam found.
    ///
    /// `resolution` is the *preferred* capture resolution; the device may
    /// deliver a different one, which is fine since the pipeline rescales
    /// every frame anyway.
    ///
    /// Setting the `ARCAM_WEBCAM_NAME` environment variable restricts the
    /// search to devices with that name.
    ///
    /// This function can block for a significant amount of time while the
    /// webcam initializes (on the order of hundreds of milliseconds).
    pub fn open(resolution: Resolution) -> anyhow::Result<Self> {
        if let Ok(name) = env::var(ENV_VAR_WEBCAM_NAME) {
            log::debug!(
                "webcam override: `{}` is set to '{}'",
                ENV_VAR_WEBCAM_NAME,
                name,
            );
        }
        for res in linuxvideo::list()? {
            match res {
                Ok(dev) => match Self::open_impl(dev, resolution) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("{}", e);
                    }
                },
                Err(e) => {
                    log::warn!("{}", e);
                }
            }
        }

        bail!("no supported webcam device found")
    }

    fn open_impl(dev: Device, resolution: Resolution) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        if let Ok(name) = env::var(ENV_VAR_WEBCAM_NAME) {
            if caps.card() != name {
                return Ok(None);
            }
        }

        let cap_flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let mut pixel_format = None;
        for format in dev.formats(BufType::VIDEO_CAPTURE) {
            let format = format?;
            if format.pixel_format() == PixelFormat::JPEG
                || format.pixel_format() == PixelFormat::MJPG
            {
                pixel_format = Some(format.pixel_format());
                break;
            }
        }
        let Some(pixel_format) = pixel_format else {
            return Ok(None);
        };

        let capture = dev.video_capture(PixFormat::new(
            resolution.width(),
            resolution.height(),
            pixel_format,
        ))?;

        let format = capture.format();
        let width = format.width();
        let height = format.height();

        log::info!(
            "opened {} ({}), {}x{}",
            caps.card(),
            path.display(),
            width,
            height,
        );

        let stream = capture.into_stream()?;

        Ok(Some(Self {
            stream,
            width,
            height,
        }))
    }
}

impl FrameSource for Webcam {
    fn read(&mut self) -> anyhow::Result<Option<Image>> {
        self.stream
            .dequeue(|buf| {
                let image = match Image::decode_jpeg(&buf) {
                    Ok(image) => image,
                    Err(e) => {
                        // Even high-quality webcams produce occasional corrupted
                        // MJPG frames, presumably due to USB data corruption.
                        // Hand back a blank image instead of ending the stream;
                        // it is replaced by the next intact frame anyway.
                        log::error!("webcam decode error: {}", e);
                        Image::new(self.width, self.height)
                    }
                };
                Ok(image)
            })
            .map(Some)
            .map_err(Into::into)
    }
}
