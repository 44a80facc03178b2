//! Arcam live camera annotation library.
//!
//! Arcam captures webcam frames, runs external hand and face detectors on
//! them, stabilizes the detected boxes over time, draws overlays, and serves
//! the result as a motion-JPEG stream over HTTP.
//!
//! The crate is organized along that pipeline:
//!
//! - [`camera`] acquires frames, [`detection`] defines the detector
//!   capabilities.
//! - [`track`] smooths detection boxes across frames, [`overlay`] draws.
//! - [`pipeline`] ties one camera and its detectors into a lazy sequence of
//!   [`stream`] chunks.
//! - [`fanout`] shares one pipeline between viewers, [`serve`] puts it on
//!   the network.
//!
//! # Environment Variables
//!
//! Some parts of Arcam can be overridden by setting environment variables:
//!
//! * `ARCAM_WEBCAM_NAME`: Forces the device to use for
//!   [`Webcam`](camera::Webcam)s. If unset, the first device that supports a
//!   compatible image format will be used.

use log::LevelFilter;

pub mod camera;
pub mod detection;
pub mod face;
pub mod fanout;
pub mod filter;
pub mod hand;
pub mod image;
pub mod overlay;
pub mod pipeline;
pub mod resolution;
pub mod serve;
pub mod stream;
pub mod timer;
pub mod track;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and Arcam will log at *debug* level; the `RUST_LOG`
/// environment variable can override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
