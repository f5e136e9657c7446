//! Reading and writing 3D Gaussian splats in the compressed SPZ format.
//!
//! Splats are loaded from the PLY files produced by Gaussian splatting
//! trainers, held in a [`GaussianCloud`], and packed into SPZ: a gzip stream
//! of quantized planar attribute blocks, roughly ten times smaller than the
//! PLY it came from.
//!
//! Each format has a fixed axis convention (RDF for PLY, RUB for SPZ).
//! [`PackOptions::from`] and [`UnpackOptions::to`] name the convention of the
//! in-memory cloud, and the data is converted on the way in and out.
//!
//! # Example
//!
//! ```rust
//! use spz_codec::{CoordinateSystem, GaussianCloud, PackOptions, UnpackOptions};
//!
//! let cloud = GaussianCloud {
//!     num_points: 1,
//!     sh_degree: 0,
//!     antialiased: true,
//!     positions: vec![[1.0, 2.0, 3.0]],
//!     scales: vec![[-2.0, -2.0, -2.0]],
//!     rotations: vec![[0.0, 0.0, 0.0, 1.0]],
//!     opacities: vec![0.5],
//!     colors: vec![[0.1, 0.2, 0.3]],
//!     sh: vec![],
//! };
//!
//! let bytes = spz_codec::save_spz_to_bytes(&cloud, &PackOptions::default()).unwrap();
//! let back = spz_codec::load_spz_from_bytes(&bytes, &UnpackOptions::default()).unwrap();
//! assert_eq!(back.num_points, 1);
//! assert!(back.antialiased);
//! assert!((back.positions[0][2] - 3.0).abs() < 1e-3);
//! ```

pub mod cloud;
pub mod coords;
mod error;
mod options;
mod persist;
pub mod ply;
pub mod spz;

pub use cloud::{sh_dim_for_degree, GaussianCloud};
pub use coords::{convert, CoordinateConverter, CoordinateSystem};
pub use error::SpzError;
pub use options::{PackOptions, UnpackOptions};
pub use ply::{load_splat_from_ply, read_ply, save_splat_to_ply, write_ply};
pub use spz::{decode, encode, load_spz, save_spz};

/// Encode a cloud to SPZ bytes in memory.
pub fn save_spz_to_bytes(cloud: &GaussianCloud, options: &PackOptions) -> Result<Vec<u8>, SpzError> {
    spz::encode(cloud, options)
}

/// Decode SPZ bytes held in memory.
pub fn load_spz_from_bytes(bytes: &[u8], options: &UnpackOptions) -> Result<GaussianCloud, SpzError> {
    spz::decode(bytes, options)
}
