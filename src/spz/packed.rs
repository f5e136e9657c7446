use std::io::Write;

use crate::cloud::{sh_dim_for_degree, GaussianCloud};
use crate::spz::header::{
    checked_num_points, PackedHeader, FLAG_ANTIALIASED, HEADER_SIZE, LATEST_VERSION,
};
use crate::spz::quant::{self, FRACTIONAL_BITS};
use crate::{CoordinateConverter, CoordinateSystem, PackOptions, SpzError, UnpackOptions};

/// Convention SPZ streams are stored in.
pub const SPZ_COORDINATE_SYSTEM: CoordinateSystem = CoordinateSystem::RUB;

/// A cloud in its quantized, planar on-disk form, before compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedGaussians {
    pub header: PackedHeader,
    pub positions: Vec<u8>,
    pub alphas: Vec<u8>,
    pub colors: Vec<u8>,
    pub scales: Vec<u8>,
    pub rotations: Vec<u8>,
    pub sh: Vec<u8>,
}

/// Byte sizes of each block for a given header.
struct BlockSizes {
    positions: usize,
    alphas: usize,
    colors: usize,
    scales: usize,
    rotations: usize,
    sh: usize,
}

impl BlockSizes {
    fn new(header: &PackedHeader) -> Result<Self, SpzError> {
        let n = header.num_points as usize;
        let sh_dim = sh_dim_for_degree(header.sh_degree)
            .map_err(|_| SpzError::format("Invalid SH degree in header"))?;
        Ok(Self {
            positions: n * 3 * if header.version == 1 { 2 } else { 3 },
            alphas: n,
            colors: n * 3,
            scales: n * 3,
            rotations: n * if header.version >= 3 { 4 } else { 3 },
            sh: n * sh_dim * 3,
        })
    }

    fn total(&self) -> usize {
        self.positions + self.alphas + self.colors + self.scales + self.rotations + self.sh
    }
}

impl PackedGaussians {
    /// Quantize a cloud into the latest stream version.
    pub fn pack(cloud: &GaussianCloud, options: &PackOptions) -> Result<Self, SpzError> {
        Self::pack_version(cloud, options, LATEST_VERSION)
    }

    /// Quantize for a specific stream version, 2 or 3.
    pub(crate) fn pack_version(
        cloud: &GaussianCloud,
        options: &PackOptions,
        version: u32,
    ) -> Result<Self, SpzError> {
        cloud.validate()?;
        if !(2..=LATEST_VERSION).contains(&version) {
            return Err(SpzError::unsupported(format!(
                "Cannot write SPZ version {version}"
            )));
        }

        let n = cloud.num_points;
        let sh_dim = cloud.sh_dim()?;
        let converter = CoordinateConverter::new(options.from, SPZ_COORDINATE_SYSTEM);

        let header = PackedHeader {
            version,
            num_points: checked_num_points(n)?,
            sh_degree: cloud.sh_degree,
            fractional_bits: FRACTIONAL_BITS,
            flags: if cloud.antialiased { FLAG_ANTIALIASED } else { 0 },
        };

        let mut positions = Vec::with_capacity(n * 9);
        let mut clamped = 0usize;
        for &p in &cloud.positions {
            for v in converter.position(p) {
                let (bytes, was_clamped) = quant::quantize_position(v, FRACTIONAL_BITS);
                clamped += was_clamped as usize;
                positions.extend_from_slice(&bytes);
            }
        }
        if clamped > 0 {
            log::warn!("{clamped} position components were out of range and have been clamped");
        }

        let alphas = cloud
            .opacities
            .iter()
            .map(|&a| quant::quantize_alpha(a))
            .collect();
        let colors = cloud
            .colors
            .iter()
            .flat_map(|c| c.map(quant::quantize_color))
            .collect();
        let scales = cloud
            .scales
            .iter()
            .flat_map(|s| s.map(quant::quantize_scale))
            .collect();

        let mut rotations = Vec::with_capacity(n * 4);
        let mut degenerate = 0usize;
        for &q in &cloud.rotations {
            degenerate += quant::is_degenerate_quat(q) as usize;
            let q = converter.rotation(q);
            if version >= 3 {
                rotations.extend(quant::pack_quat_smallest_three(q));
            } else {
                rotations.extend(quant::pack_quat_first_three(q));
            }
        }
        if degenerate > 0 {
            log::warn!("{degenerate} rotations could not be normalized and were stored as identity");
        }

        let mut sh = Vec::with_capacity(n * sh_dim * 3);
        if sh_dim > 0 {
            for point in cloud.sh.chunks_exact(sh_dim) {
                for (j, &rgb) in point.iter().enumerate() {
                    let bits = quant::sh_bits_for_coefficient(j);
                    let rgb = converter.sh_coefficient(j, rgb);
                    sh.extend(rgb.map(|v| quant::quantize_sh(v, bits)));
                }
            }
        }

        Ok(Self {
            header,
            positions,
            alphas,
            colors,
            scales,
            rotations,
            sh,
        })
    }

    /// Reconstruct the cloud, converting into `options.to`.
    pub fn unpack(&self, options: &UnpackOptions) -> Result<GaussianCloud, SpzError> {
        let header = &self.header;
        let n = header.num_points as usize;
        let sizes = BlockSizes::new(header)?;
        if self.positions.len() != sizes.positions
            || self.alphas.len() != sizes.alphas
            || self.colors.len() != sizes.colors
            || self.scales.len() != sizes.scales
            || self.rotations.len() != sizes.rotations
            || self.sh.len() != sizes.sh
        {
            return Err(SpzError::format("Block sizes disagree with the header"));
        }

        let mut cloud = GaussianCloud::with_capacity(header.sh_degree, n)?;
        cloud.num_points = n;
        cloud.antialiased = header.antialiased();

        if header.version == 1 {
            cloud.positions.extend(self.positions.chunks_exact(6).map(|c| {
                [0, 1, 2].map(|i| {
                    let half = u16::from_le_bytes([c[2 * i], c[2 * i + 1]]);
                    quant::half_to_f32(half)
                })
            }));
        } else {
            let bits = header.fractional_bits;
            cloud.positions.extend(self.positions.chunks_exact(9).map(|c| {
                [0, 1, 2].map(|i| {
                    quant::unquantize_position([c[3 * i], c[3 * i + 1], c[3 * i + 2]], bits)
                })
            }));
        }

        cloud
            .opacities
            .extend(self.alphas.iter().map(|&a| quant::unquantize_alpha(a)));
        cloud.colors.extend(
            self.colors
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]].map(quant::unquantize_color)),
        );
        cloud.scales.extend(
            self.scales
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]].map(quant::unquantize_scale)),
        );

        if header.version >= 3 {
            cloud.rotations.extend(
                self.rotations
                    .chunks_exact(4)
                    .map(|c| quant::unpack_quat_smallest_three([c[0], c[1], c[2], c[3]])),
            );
        } else {
            cloud.rotations.extend(
                self.rotations
                    .chunks_exact(3)
                    .map(|c| quant::unpack_quat_first_three([c[0], c[1], c[2]])),
            );
        }

        cloud.sh.extend(
            self.sh
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]].map(quant::unquantize_sh)),
        );

        cloud.apply(&CoordinateConverter::new(SPZ_COORDINATE_SYSTEM, options.to));
        Ok(cloud)
    }

    /// Serialize header and blocks, uncompressed.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), SpzError> {
        self.header.write(&mut writer)?;
        for block in [
            &self.positions,
            &self.alphas,
            &self.colors,
            &self.scales,
            &self.rotations,
            &self.sh,
        ] {
            writer.write_all(block)?;
        }
        Ok(())
    }

    /// Parse an uncompressed stream. Trailing bytes are ignored.
    pub fn read(data: &[u8]) -> Result<Self, SpzError> {
        let header = PackedHeader::read(data)?;
        let sizes = BlockSizes::new(&header)?;
        let body = &data[HEADER_SIZE..];
        if body.len() < sizes.total() {
            return Err(SpzError::format(format!(
                "Truncated SPZ data: expected {} bytes for {} points, found {}",
                sizes.total(),
                header.num_points,
                body.len()
            )));
        }

        let mut rest = body;
        let mut take = |len: usize| {
            let (block, tail) = rest.split_at(len);
            rest = tail;
            block.to_vec()
        };
        Ok(Self {
            header,
            positions: take(sizes.positions),
            alphas: take(sizes.alphas),
            colors: take(sizes.colors),
            scales: take(sizes.scales),
            rotations: take(sizes.rotations),
            sh: take(sizes.sh),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> GaussianCloud {
        GaussianCloud {
            num_points: 2,
            sh_degree: 1,
            antialiased: true,
            positions: vec![[0.5, -1.25, 3.0], [100.0, 0.0, -7.5]],
            scales: vec![[-1.0, -2.0, -3.0], [0.5, 0.0, -0.5]],
            rotations: vec![[0.0, 0.0, 0.0, 1.0], [0.3, -0.4, 0.5, 0.7]],
            opacities: vec![1.5, -2.0],
            colors: vec![[0.2, -0.1, 1.0], [0.0, 0.0, 0.0]],
            sh: vec![[0.1, 0.2, 0.3], [-0.1, -0.2, -0.3], [0.0, 0.5, -0.5]]
                .into_iter()
                .cycle()
                .take(6)
                .collect(),
        }
    }

    #[test]
    fn test_planar_block_sizes() {
        let packed = PackedGaussians::pack(&cloud(), &PackOptions::default()).unwrap();
        assert_eq!(packed.header.version, LATEST_VERSION);
        assert_eq!(packed.positions.len(), 2 * 9);
        assert_eq!(packed.alphas.len(), 2);
        assert_eq!(packed.colors.len(), 2 * 3);
        assert_eq!(packed.scales.len(), 2 * 3);
        assert_eq!(packed.rotations.len(), 2 * 4);
        assert_eq!(packed.sh.len(), 2 * 3 * 3);

        let mut buf = Vec::new();
        packed.write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + 18 + 2 + 6 + 6 + 8 + 18);
        assert_eq!(PackedGaussians::read(&buf).unwrap(), packed);
    }

    #[test]
    fn test_version_2_unpacks() {
        let original = cloud();
        let packed = PackedGaussians::pack_version(&original, &PackOptions::default(), 2).unwrap();
        assert_eq!(packed.rotations.len(), 2 * 3);

        let mut buf = Vec::new();
        packed.write(&mut buf).unwrap();
        let back = PackedGaussians::read(&buf)
            .unwrap()
            .unpack(&UnpackOptions::default())
            .unwrap();
        assert_eq!(back.num_points, 2);
        assert!(back.antialiased);
        for (a, b) in back.positions.iter().flatten().zip(original.positions.iter().flatten()) {
            assert!((a - b).abs() <= 1.0 / 8192.0);
        }
    }

    #[test]
    fn test_version_1_half_positions() {
        let header = PackedHeader {
            version: 1,
            num_points: 1,
            sh_degree: 0,
            fractional_bits: 0,
            flags: 0,
        };
        let positions = [1.0f32, -2.5, 0.125]
            .iter()
            .flat_map(|&v| quant::f32_to_half(v).to_le_bytes())
            .collect();
        let packed = PackedGaussians {
            header,
            positions,
            alphas: vec![128],
            colors: vec![128; 3],
            scales: vec![160; 3],
            rotations: vec![128, 128, 128],
            sh: vec![],
        };
        let cloud = packed.unpack(&UnpackOptions::default()).unwrap();
        assert_eq!(cloud.positions, vec![[1.0, -2.5, 0.125]]);
        assert_eq!(cloud.scales, vec![[0.0; 3]]);
    }

    #[test]
    fn test_truncated_body() {
        let packed = PackedGaussians::pack(&cloud(), &PackOptions::default()).unwrap();
        let mut buf = Vec::new();
        packed.write(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(matches!(PackedGaussians::read(&buf), Err(SpzError::Format(_))));
    }

    #[test]
    fn test_pack_rejects_invalid_cloud() {
        let mut bad = cloud();
        bad.rotations.pop();
        assert!(matches!(
            PackedGaussians::pack(&bad, &PackOptions::default()),
            Err(SpzError::Validation(_))
        ));
    }
}
