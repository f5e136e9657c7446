//! Gaussian splat PLY import and export.
//!
//! Only `binary_little_endian` bodies are handled, the format every splat
//! trainer emits. Splat files are expected in the RDF convention.

mod de;
pub mod header;
mod read;
mod write;

pub use header::{ElementDef, PlyFormat, PlyHeader, PlyProperty, PropertyType, ScalarType};
pub use read::{load_splat_from_ply, read_ply, PLY_COORDINATE_SYSTEM};
pub use write::{save_splat_to_ply, write_ply};
