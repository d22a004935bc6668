//! Wiring a [`CaptureConfig`] into a running session.

use crate::config::{CaptureConfig, SourceKind};
use crate::display::{AutoTrigger, FrameDisplay, TerminalDisplay};
use crate::errors::SessionError;
use crate::session::{CaptureOutcome, CaptureSession};
use depthcloud_capture::{DeviceError, FrameSource, ReplaySource, StreamConfig, SyntheticSource};
use tracing::info;

/// Open the configured source, then the display, and run one capture.
pub fn run_capture(config: &CaptureConfig) -> Result<CaptureOutcome, SessionError> {
    config.layout.ensure()?;
    let filename = config.output_filename(chrono::Local::now().naive_local());

    let source = open_source(config)?;
    info!(
        "Streaming {}x{} from {:?} source",
        source.resolution().0,
        source.resolution().1,
        config.source
    );
    let display = open_display(config)?;

    let mut session = CaptureSession::new(source, display, &config.layout)
        .with_filename(filename)
        .with_frame_timeout(config.frame_timeout)
        .with_build_options(config.build);
    session.run()
}

pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn FrameSource>, DeviceError> {
    match config.source {
        SourceKind::RealSense => open_realsense(config.stream),
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::open(config.stream)?)),
        SourceKind::Replay => Ok(Box::new(ReplaySource::open(&config.layout.raw_dir())?)),
    }
}

#[cfg(feature = "realsense")]
fn open_realsense(stream: StreamConfig) -> Result<Box<dyn FrameSource>, DeviceError> {
    Ok(Box::new(depthcloud_capture::RealSenseSource::open(stream)?))
}

#[cfg(not(feature = "realsense"))]
fn open_realsense(_stream: StreamConfig) -> Result<Box<dyn FrameSource>, DeviceError> {
    Err(DeviceError::Unsupported(
        "built without the `realsense` feature; rebuild with `--features realsense` or pass --source synthetic".to_string(),
    ))
}

fn open_display(config: &CaptureConfig) -> Result<Box<dyn FrameDisplay>, SessionError> {
    match config.capture_after {
        Some(frames) => Ok(Box::new(AutoTrigger::new(frames))),
        None => Ok(Box::new(TerminalDisplay::open().map_err(SessionError::Display)?)),
    }
}
