//! Depthcloud Data Crate
//!
//! Point cloud types, rigid transforms and PLY reading/writing.
//! This crate knows nothing about sensors or reconstruction; it is the
//! on-disk and in-memory representation shared by the other crates.

pub mod ply;
pub mod transform;
pub mod types;

pub use ply::{PlyEncoding, PlyError, load_ply, save_ply, write_ply};
pub use transform::axis_flip;
pub use types::{Bounds, Point, PointCloud};
