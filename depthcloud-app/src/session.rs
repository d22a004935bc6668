//! The capture loop: stream, preview, save on trigger, close.

use crate::config::ProjectLayout;
use crate::display::{DisplayCommand, FrameDisplay};
use crate::errors::SessionError;
use depthcloud_capture::{CaptureError, FramePair, FrameSource, RawFramePaths, save_raw_pair};
use depthcloud_recon::{BuildOptions, PinholeEngine, PointCloudBuilder, ReconstructionEngine};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Saving,
    Closed,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Captured {
        cloud_path: PathBuf,
        raw: RawFramePaths,
        points: usize,
    },
    Interrupted,
}

/// Drives one capture: pulls frames into the display until the user
/// triggers, then saves the raw pair and builds a single point cloud.
///
/// The source and display are closed when [`run`](Self::run) returns,
/// whatever the outcome.
pub struct CaptureSession<S, D, E = PinholeEngine>
where
    S: FrameSource,
    D: FrameDisplay,
    E: ReconstructionEngine,
{
    source: S,
    display: D,
    builder: PointCloudBuilder<E>,
    raw_dir: PathBuf,
    filename: String,
    frame_timeout: Duration,
    state: SessionState,
}

impl<S: FrameSource, D: FrameDisplay> CaptureSession<S, D> {
    pub fn new(source: S, display: D, layout: &ProjectLayout) -> Self {
        Self {
            source,
            display,
            builder: PointCloudBuilder::new(layout.processed_dir()),
            raw_dir: layout.raw_dir(),
            filename: crate::config::DEFAULT_FILENAME.to_string(),
            frame_timeout: Duration::from_millis(5000),
            state: SessionState::Idle,
        }
    }
}

impl<S, D, E> CaptureSession<S, D, E>
where
    S: FrameSource,
    D: FrameDisplay,
    E: ReconstructionEngine,
{
    /// Replace the builder; its output directory is kept as given.
    pub fn with_builder<F: ReconstructionEngine>(self, builder: PointCloudBuilder<F>) -> CaptureSession<S, D, F> {
        CaptureSession {
            source: self.source,
            display: self.display,
            builder,
            raw_dir: self.raw_dir,
            filename: self.filename,
            frame_timeout: self.frame_timeout,
            state: self.state,
        }
    }

    pub fn with_build_options(mut self, options: BuildOptions) -> Self {
        self.builder = self.builder.with_options(options);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until a capture completes or the user interrupts.
    ///
    /// Failed frame pulls are logged and retried. Save and build errors are
    /// returned after the source and display have been released.
    pub fn run(&mut self) -> Result<CaptureOutcome, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::SourceClosed);
        }

        let result = self.stream();
        self.release();
        result
    }

    fn stream(&mut self) -> Result<CaptureOutcome, SessionError> {
        self.state = SessionState::Streaming;
        info!("Press 'q' in the preview to capture and exit.");

        loop {
            let pair = match self.source.next_frame_pair(self.frame_timeout) {
                Ok(pair) => pair,
                Err(CaptureError::Closed) => return Err(SessionError::SourceClosed),
                Err(e) => {
                    warn!("Unable to get a frame: {}", e);
                    // Still honour an interrupt while the device is silent.
                    if self.poll()? == Some(DisplayCommand::Interrupt) {
                        return Ok(self.interrupted());
                    }
                    continue;
                }
            };
            debug!("Frame pair #{}", pair.color.frame_number);

            self.display
                .show(&pair.color.image)
                .map_err(SessionError::Display)?;

            match self.poll()? {
                Some(DisplayCommand::Capture) => return self.save(&pair),
                Some(DisplayCommand::Interrupt) => return Ok(self.interrupted()),
                None => {}
            }
        }
    }

    fn poll(&mut self) -> Result<Option<DisplayCommand>, SessionError> {
        self.display.poll_command().map_err(SessionError::Display)
    }

    fn interrupted(&self) -> CaptureOutcome {
        info!("Capture interrupted; nothing was saved");
        CaptureOutcome::Interrupted
    }

    fn save(&mut self, pair: &FramePair) -> Result<CaptureOutcome, SessionError> {
        self.state = SessionState::Saving;
        let intrinsics = self.source.intrinsics_of(&pair.color);

        let raw = save_raw_pair(&self.raw_dir, pair, &intrinsics)?;
        let (cloud_path, cloud) =
            self.builder
                .build_and_save(&pair.depth, &pair.color, &intrinsics, &self.filename)?;

        Ok(CaptureOutcome::Captured {
            cloud_path,
            raw,
            points: cloud.len(),
        })
    }

    fn release(&mut self) {
        self.source.close();
        self.display.close();
        self.state = SessionState::Closed;
        debug!("Capture session closed");
    }
}
