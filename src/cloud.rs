use serde::{Deserialize, Serialize};

use crate::{CoordinateConverter, CoordinateSystem, SpzError};

pub const MAX_SH_DEGREE: u8 = 3;

/// Number of SH coefficients per colour channel, excluding the DC term.
pub fn sh_dim_for_degree(degree: u8) -> Result<usize, SpzError> {
    match degree {
        0 => Ok(0),
        1 => Ok(3),
        2 => Ok(8),
        3 => Ok(15),
        _ => Err(SpzError::validation(format!(
            "Unsupported SH degree: {degree}"
        ))),
    }
}

/// Inverse of [`sh_dim_for_degree`].
pub fn degree_for_sh_dim(dim: usize) -> Option<u8> {
    match dim {
        0 => Some(0),
        3 => Some(1),
        8 => Some(2),
        15 => Some(3),
        _ => None,
    }
}

/// A set of gaussian splats stored as parallel arrays.
///
/// Values are kept in the representation trainers write to PLY: scales are
/// natural logs, opacities are logits and colours are the SH DC term.
/// Rotations are quaternions in `[x, y, z, w]` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianCloud {
    pub num_points: usize,
    pub sh_degree: u8,
    pub antialiased: bool,
    pub positions: Vec<[f32; 3]>,
    pub scales: Vec<[f32; 3]>,
    pub rotations: Vec<[f32; 4]>,
    pub opacities: Vec<f32>,
    pub colors: Vec<[f32; 3]>,
    /// `num_points * sh_dim` RGB triples, all coefficients of a point together.
    pub sh: Vec<[f32; 3]>,
}

impl GaussianCloud {
    /// An empty cloud with room for `capacity` points.
    pub fn with_capacity(sh_degree: u8, capacity: usize) -> Result<Self, SpzError> {
        let sh_dim = sh_dim_for_degree(sh_degree)?;
        Ok(Self {
            num_points: 0,
            sh_degree,
            antialiased: false,
            positions: Vec::with_capacity(capacity),
            scales: Vec::with_capacity(capacity),
            rotations: Vec::with_capacity(capacity),
            opacities: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
            sh: Vec::with_capacity(capacity * sh_dim),
        })
    }

    pub fn sh_dim(&self) -> Result<usize, SpzError> {
        sh_dim_for_degree(self.sh_degree)
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// The SH coefficients of point `index`.
    pub fn sh_coefficients(&self, index: usize) -> &[[f32; 3]] {
        let dim = self.sh.len().checked_div(self.num_points).unwrap_or(0);
        &self.sh[index * dim..(index + 1) * dim]
    }

    /// Check that every array agrees with `num_points` and `sh_degree`.
    pub fn validate(&self) -> Result<(), SpzError> {
        let sh_dim = self.sh_dim()?;
        let n = self.num_points;

        let check = |name: &str, len: usize, expected: usize| {
            if len == expected {
                Ok(())
            } else {
                Err(SpzError::validation(format!(
                    "{name} has {len} entries, expected {expected}"
                )))
            }
        };
        check("positions", self.positions.len(), n)?;
        check("scales", self.scales.len(), n)?;
        check("rotations", self.rotations.len(), n)?;
        check("opacities", self.opacities.len(), n)?;
        check("colors", self.colors.len(), n)?;
        check("sh", self.sh.len(), n * sh_dim)?;

        if n > u32::MAX as usize {
            return Err(SpzError::validation(format!("Too many points: {n}")));
        }
        Ok(())
    }

    /// Re-express the cloud in another axis convention, in place.
    pub fn convert_coordinates(&mut self, from: CoordinateSystem, to: CoordinateSystem) {
        self.apply(&CoordinateConverter::new(from, to));
    }

    pub(crate) fn apply(&mut self, converter: &CoordinateConverter) {
        if converter.is_identity() {
            return;
        }
        for p in &mut self.positions {
            *p = converter.position(*p);
        }
        for q in &mut self.rotations {
            *q = converter.rotation(*q);
        }
        let dim = self.sh.len().checked_div(self.num_points).unwrap_or(0);
        if dim > 0 {
            for point in self.sh.chunks_exact_mut(dim) {
                for (j, coeff) in point.iter_mut().enumerate() {
                    *coeff = converter.sh_coefficient(j, *coeff);
                }
            }
        }
    }

    /// Rotate the scene half a turn about x, which swaps RUB and RDF data.
    pub fn rotate_180_deg_about_x(&mut self) {
        self.convert_coordinates(CoordinateSystem::RUB, CoordinateSystem::RDF);
    }

    /// Median ellipsoid volume, `4/3 * pi * sx * sy * sz`. Zero when empty.
    pub fn median_volume(&self) -> f32 {
        if self.scales.is_empty() {
            return 0.0;
        }
        // Scales are logs, so the sum orders the same as the volume.
        let mut log_sums: Vec<f32> = self.scales.iter().map(|s| s[0] + s[1] + s[2]).collect();
        let mid = log_sums.len() / 2;
        let (_, median, _) = log_sums.select_nth_unstable_by(mid, f32::total_cmp);
        std::f32::consts::PI * 4.0 / 3.0 * median.exp()
    }
}
