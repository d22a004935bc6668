//! Depthcloud Capture - aligned depth + color frames
//!
//! This crate provides implementations of the [`FrameSource`] trait:
//!
//! - Intel RealSense cameras (via realsense-rust, requires `realsense` feature)
//! - A deterministic synthetic scene for tests and demos
//! - Replay of raw frames written by a previous capture
//!
//! Every source hands out depth frames already re-projected into the color
//! camera's pixel grid, so callers never deal with unaligned data.
//!
//! ## Example
//!
//! ```ignore
//! use depthcloud_capture::{FrameSource, StreamConfig, SyntheticSource};
//! use std::time::Duration;
//!
//! let mut source = SyntheticSource::open(StreamConfig::new(640, 480))?;
//! let pair = source.next_frame_pair(Duration::from_millis(5000))?;
//! let intrinsics = source.intrinsics_of(&pair.color);
//! ```

mod align;
mod intrinsics;
mod raw;
mod replay;
mod source;
mod synthetic;

#[cfg(feature = "realsense")]
mod realsense;

pub use align::align_depth_to_color;
pub use intrinsics::{Extrinsics, Intrinsics};
pub use raw::{CaptureMetadata, RawFrameError, RawFramePaths, load_raw_pair, save_raw_pair};
pub use replay::ReplaySource;
pub use source::{
    CaptureError, ColorFrame, DepthFrame, DepthImage, DeviceError, FramePair, FrameSource,
    StreamConfig,
};
pub use synthetic::SyntheticSource;

#[cfg(feature = "realsense")]
pub use realsense::RealSenseSource;
