//! Axis conventions and conversion between them.
//!
//! A convention is named by three letters giving the positive direction of
//! the x, y and z axes: **L**eft/**R**ight, **D**own/**U**p, **B**ack/**F**ront.
//! All eight conventions share the same axis order, so converting between two
//! of them is a pure per-axis sign flip and is exactly invertible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SpzError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoordinateSystem {
    /// No known convention. Conversions to or from it are the identity.
    #[default]
    Unspecified,
    LDB,
    RDB,
    LUB,
    RUB,
    LDF,
    RDF,
    LUF,
    RUF,
}

impl CoordinateSystem {
    pub const ALL: [CoordinateSystem; 8] = [
        CoordinateSystem::LDB,
        CoordinateSystem::RDB,
        CoordinateSystem::LUB,
        CoordinateSystem::RUB,
        CoordinateSystem::LDF,
        CoordinateSystem::RDF,
        CoordinateSystem::LUF,
        CoordinateSystem::RUF,
    ];

    /// Sign of the right, up and front directions along x, y and z.
    fn axis_signs(self) -> Option<[f32; 3]> {
        use CoordinateSystem::*;
        let signs = match self {
            Unspecified => return None,
            LDB => [-1.0, -1.0, -1.0],
            RDB => [1.0, -1.0, -1.0],
            LUB => [-1.0, 1.0, -1.0],
            RUB => [1.0, 1.0, -1.0],
            LDF => [-1.0, -1.0, 1.0],
            RDF => [1.0, -1.0, 1.0],
            LUF => [-1.0, 1.0, 1.0],
            RUF => [1.0, 1.0, 1.0],
        };
        Some(signs)
    }

    pub fn as_str(self) -> &'static str {
        use CoordinateSystem::*;
        match self {
            Unspecified => "UNSPECIFIED",
            LDB => "LDB",
            RDB => "RDB",
            LUB => "LUB",
            RUB => "RUB",
            LDF => "LDF",
            RDF => "RDF",
            LUF => "LUF",
            RUF => "RUF",
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinateSystem {
    type Err = SpzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        std::iter::once(CoordinateSystem::Unspecified)
            .chain(CoordinateSystem::ALL)
            .find(|cs| cs.as_str() == upper)
            .ok_or_else(|| SpzError::validation(format!("Unknown coordinate system: {s}")))
    }
}

/// Sign flips taking data from one convention to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    flip_p: [f32; 3],
    flip_q: [f32; 3],
    flip_sh: [f32; 15],
}

impl CoordinateConverter {
    pub const IDENTITY: CoordinateConverter = CoordinateConverter {
        flip_p: [1.0; 3],
        flip_q: [1.0; 3],
        flip_sh: [1.0; 15],
    };

    pub fn new(from: CoordinateSystem, to: CoordinateSystem) -> Self {
        let (Some(a), Some(b)) = (from.axis_signs(), to.axis_signs()) else {
            if from != to {
                log::debug!("No coordinate conversion between {from} and {to}");
            }
            return Self::IDENTITY;
        };

        let [x, y, z] = [a[0] * b[0], a[1] * b[1], a[2] * b[2]];
        Self {
            flip_p: [x, y, z],
            // Rotation axis is a pseudovector: each component flips with the
            // product of the other two axes.
            flip_q: [y * z, x * z, x * y],
            // Parity of the real SH basis functions, degrees 1 to 3.
            flip_sh: [
                y,
                z,
                x,
                x * y,
                y * z,
                1.0,
                x * z,
                1.0,
                y,
                x * y * z,
                y,
                z,
                x,
                z,
                x,
            ],
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn position(&self, p: [f32; 3]) -> [f32; 3] {
        [
            p[0] * self.flip_p[0],
            p[1] * self.flip_p[1],
            p[2] * self.flip_p[2],
        ]
    }

    /// Normals are direction vectors and flip exactly like positions.
    pub fn normal(&self, n: [f32; 3]) -> [f32; 3] {
        self.position(n)
    }

    /// Quaternion in `[x, y, z, w]` order. The norm is preserved.
    pub fn rotation(&self, q: [f32; 4]) -> [f32; 4] {
        [
            q[0] * self.flip_q[0],
            q[1] * self.flip_q[1],
            q[2] * self.flip_q[2],
            q[3],
        ]
    }

    /// Flip the RGB triple of the `index`th non-DC SH coefficient.
    pub fn sh_coefficient(&self, index: usize, rgb: [f32; 3]) -> [f32; 3] {
        let s = self.flip_sh[index];
        [rgb[0] * s, rgb[1] * s, rgb[2] * s]
    }
}

/// Convert a slice of points (or normals) between two conventions.
pub fn convert(points: &[[f32; 3]], from: CoordinateSystem, to: CoordinateSystem) -> Vec<[f32; 3]> {
    let converter = CoordinateConverter::new(from, to);
    if converter.is_identity() {
        return points.to_vec();
    }
    points.iter().map(|&p| converter.position(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rub_to_rdf_flips_y_and_z() {
        let c = CoordinateConverter::new(CoordinateSystem::RUB, CoordinateSystem::RDF);
        assert_eq!(c.position([1.0, 2.0, 3.0]), [1.0, -2.0, -3.0]);
        // 180 degrees about x leaves the x component of the rotation axis alone.
        assert_eq!(c.rotation([0.1, 0.2, 0.3, 0.9]), [0.1, -0.2, -0.3, 0.9]);
    }

    #[test]
    fn test_unspecified_is_identity() {
        for cs in CoordinateSystem::ALL {
            assert!(CoordinateConverter::new(CoordinateSystem::Unspecified, cs).is_identity());
            assert!(CoordinateConverter::new(cs, CoordinateSystem::Unspecified).is_identity());
            assert!(CoordinateConverter::new(cs, cs).is_identity());
        }
    }

    #[test]
    fn test_mirror_flips_quaternion_odd_components() {
        // Mirroring x alone is a reflection: y and z of the axis flip.
        let c = CoordinateConverter::new(CoordinateSystem::RUB, CoordinateSystem::LUB);
        assert_eq!(c.position([1.0, 1.0, 1.0]), [-1.0, 1.0, 1.0]);
        assert_eq!(c.rotation([1.0, 1.0, 1.0, 1.0]), [1.0, -1.0, -1.0, 1.0]);
        assert_eq!(c.sh_coefficient(2, [1.0, 2.0, 3.0]), [-1.0, -2.0, -3.0]);
        assert_eq!(c.sh_coefficient(0, [1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("rub".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::RUB);
        assert_eq!(" RDF ".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::RDF);
        assert_eq!(
            "unspecified".parse::<CoordinateSystem>().unwrap(),
            CoordinateSystem::Unspecified
        );
        assert!("XYZ".parse::<CoordinateSystem>().is_err());
    }
}
