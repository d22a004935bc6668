//! PLY file reading and writing

mod error;
mod reader;
mod writer;

pub use error::PlyError;
pub use reader::load_ply;
pub use writer::{PlyEncoding, save_ply, write_ply};
