//! Depthcloud Application
//!
//! Drives a capture session against a depth camera, writes the raw frames and
//! the reconstructed point cloud under the project's `data/` tree, and views
//! saved clouds in the terminal.
//!
//! ## Modules
//!
//! - [`session`]: the capture state machine
//! - [`capture`]: opening sources and displays from a [`CaptureConfig`]
//! - [`display`]: preview surfaces (terminal, headless trigger)
//! - [`viewer`]: PLY reload and orbit view
//! - [`config`]: project layout and capture options

pub mod camera;
pub mod capture;
pub mod config;
pub mod display;
mod errors;
pub mod logging;
pub mod session;
pub mod terminal;
pub mod viewer;

pub use capture::run_capture;
pub use config::{CaptureConfig, DEFAULT_FILENAME, ProjectLayout, ROOT_ENV, SourceKind};
pub use display::{AutoTrigger, DisplayCommand, FrameDisplay, TerminalDisplay};
pub use errors::{SessionError, ViewerError};
pub use logging::LoggingConfig;
pub use session::{CaptureOutcome, CaptureSession, SessionState};
