//! Depthcloud Reconstruction Crate
//!
//! Turns one aligned depth + color frame pair into a colored point cloud with
//! normals, and writes it to disk.
//!
//! ## Modules
//!
//! - [`rgbd`]: depth/color fusion into an RGB-D image in meters
//! - [`engine`]: the [`ReconstructionEngine`] seam and its CPU implementation
//! - [`normals`]: k-nearest-neighbour normal estimation
//! - [`builder`]: the ordered build pipeline and PLY output

pub mod builder;
pub mod engine;
mod error;
pub mod normals;
pub mod rgbd;

pub use builder::{BuildOptions, PointCloudBuilder};
pub use engine::{PinholeEngine, ReconstructionEngine};
pub use error::ReconstructionError;
pub use normals::NormalEstimation;
pub use rgbd::{RgbdImage, RgbdOptions};
