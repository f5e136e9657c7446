//! The SPZ container: a gzip stream holding a 16 byte header followed by
//! planar quantized blocks (positions, alphas, colors, scales, rotations, SH).
//! See [`quant`] for the per-attribute error bounds.

use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::cloud::GaussianCloud;
use crate::{persist, PackOptions, SpzError, UnpackOptions};

pub mod header;
pub mod packed;
pub mod quant;

pub use header::PackedHeader;
pub use packed::{PackedGaussians, SPZ_COORDINATE_SYSTEM};

fn compress(packed: &PackedGaussians) -> Result<Vec<u8>, SpzError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    packed.write(&mut encoder)?;
    Ok(encoder.finish()?)
}

fn decompress<R: Read>(reader: R) -> Result<Vec<u8>, SpzError> {
    let mut data = Vec::new();
    GzDecoder::new(reader)
        .read_to_end(&mut data)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidInput
            | std::io::ErrorKind::InvalidData
            | std::io::ErrorKind::UnexpectedEof => {
                SpzError::format(format!("Invalid gzip stream: {e}"))
            }
            _ => SpzError::Io(e),
        })?;
    Ok(data)
}

/// Encode a cloud into a compressed SPZ stream.
pub fn encode(cloud: &GaussianCloud, options: &PackOptions) -> Result<Vec<u8>, SpzError> {
    compress(&PackedGaussians::pack(cloud, options)?)
}

/// Decode a compressed SPZ stream.
pub fn decode(bytes: &[u8], options: &UnpackOptions) -> Result<GaussianCloud, SpzError> {
    read_spz(bytes, options)
}

/// Decode a compressed SPZ stream from any reader.
pub fn read_spz<R: Read>(reader: R, options: &UnpackOptions) -> Result<GaussianCloud, SpzError> {
    let data = decompress(reader)?;
    PackedGaussians::read(&data)?.unpack(options)
}

/// Encode a cloud and write it to `writer`.
pub fn write_spz<W: Write>(
    cloud: &GaussianCloud,
    options: &PackOptions,
    mut writer: W,
) -> Result<(), SpzError> {
    writer.write_all(&encode(cloud, options)?)?;
    Ok(())
}

/// Save a cloud as an SPZ file. The stream is fully encoded in memory and
/// the destination is only replaced once the file has been written out.
pub fn save_spz(
    cloud: &GaussianCloud,
    options: &PackOptions,
    path: impl AsRef<Path>,
) -> Result<(), SpzError> {
    let path = path.as_ref();
    let bytes = encode(cloud, options)?;
    persist::write_atomic(path, |file| Ok(file.write_all(&bytes)?))?;
    log::debug!(
        "Saved {} gaussians ({} bytes) to {}",
        cloud.num_points,
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Load an SPZ file.
pub fn load_spz(path: impl AsRef<Path>, options: &UnpackOptions) -> Result<GaussianCloud, SpzError> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let cloud = read_spz(BufReader::new(file), options)?;
    log::debug!(
        "Loaded {} gaussians (SH degree {}) from {}",
        cloud.num_points,
        cloud.sh_degree,
        path.display()
    );
    Ok(cloud)
}
