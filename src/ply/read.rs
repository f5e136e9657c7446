use std::fmt;
use std::fs;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::cloud::{degree_for_sh_dim, GaussianCloud};
use crate::ply::de::RowDeserializer;
use crate::ply::header::{ElementDef, PlyFormat, PlyHeader, PropertyType};
use crate::{CoordinateConverter, CoordinateSystem, SpzError, UnpackOptions};

/// Convention trainers write PLY splats in.
pub const PLY_COORDINATE_SYSTEM: CoordinateSystem = CoordinateSystem::RDF;

const MAX_SH_REST: usize = 45;

const REQUIRED_PROPERTIES: [&str; 14] = [
    "x", "y", "z", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
    "opacity", "f_dc_0", "f_dc_1", "f_dc_2",
];

/// Which splat attribute a PLY property feeds.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SplatProperty {
    Position(usize),
    Scale(usize),
    /// PLY order: `rot_0` is w.
    Rotation(usize),
    Opacity,
    Dc(usize),
    Rest(usize),
    Other,
}

impl SplatProperty {
    fn from_name(name: &str) -> Self {
        let indexed = |prefix: &str, limit: usize| {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.parse::<usize>().ok())
                .filter(|&i| i < limit)
        };
        match name {
            "x" => return SplatProperty::Position(0),
            "y" => return SplatProperty::Position(1),
            "z" => return SplatProperty::Position(2),
            "opacity" => return SplatProperty::Opacity,
            _ => {}
        }
        if let Some(i) = indexed("scale_", 3) {
            SplatProperty::Scale(i)
        } else if let Some(i) = indexed("rot_", 4) {
            SplatProperty::Rotation(i)
        } else if let Some(i) = indexed("f_dc_", 3) {
            SplatProperty::Dc(i)
        } else if let Some(i) = indexed("f_rest_", MAX_SH_REST) {
            SplatProperty::Rest(i)
        } else {
            SplatProperty::Other
        }
    }
}

impl<'de> Deserialize<'de> for SplatProperty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameVisitor;

        impl Visitor<'_> for NameVisitor {
            type Value = SplatProperty;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a PLY property name")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<SplatProperty, E> {
                Ok(SplatProperty::from_name(v))
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<SplatProperty, E> {
                Ok(std::str::from_utf8(v)
                    .map(SplatProperty::from_name)
                    .unwrap_or(SplatProperty::Other))
            }
        }

        deserializer.deserialize_identifier(NameVisitor)
    }
}

/// Any PLY scalar widened to `f32`.
struct Scalar(f32);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a numeric PLY property")
            }

            fn visit_i8<E>(self, v: i8) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_u8<E>(self, v: u8) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_i16<E>(self, v: i16) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_u16<E>(self, v: u16) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_i32<E>(self, v: i32) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_u32<E>(self, v: u32) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_i64<E>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_u64<E>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
            fn visit_f32<E>(self, v: f32) -> Result<Scalar, E> {
                Ok(Scalar(v))
            }
            fn visit_f64<E>(self, v: f64) -> Result<Scalar, E> {
                Ok(Scalar(v as f32))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// One vertex row of a splat PLY, in PLY layout.
struct SplatRow {
    position: [f32; 3],
    scale: [f32; 3],
    rotation_wxyz: [f32; 4],
    opacity: f32,
    dc: [f32; 3],
    rest: [f32; MAX_SH_REST],
}

impl<'de> Deserialize<'de> for SplatRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = SplatRow;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a gaussian splat vertex")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SplatRow, A::Error> {
                let mut row = SplatRow {
                    position: [0.0; 3],
                    scale: [0.0; 3],
                    rotation_wxyz: [0.0; 4],
                    opacity: 0.0,
                    dc: [0.0; 3],
                    rest: [0.0; MAX_SH_REST],
                };
                while let Some(key) = map.next_key::<SplatProperty>()? {
                    let slot = match key {
                        SplatProperty::Position(i) => &mut row.position[i],
                        SplatProperty::Scale(i) => &mut row.scale[i],
                        SplatProperty::Rotation(i) => &mut row.rotation_wxyz[i],
                        SplatProperty::Opacity => &mut row.opacity,
                        SplatProperty::Dc(i) => &mut row.dc[i],
                        SplatProperty::Rest(i) => &mut row.rest[i],
                        SplatProperty::Other => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };
                    *slot = map.next_value::<Scalar>()?.0;
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Load a splat PLY file.
pub fn load_splat_from_ply(
    path: impl AsRef<Path>,
    options: &UnpackOptions,
) -> Result<GaussianCloud, SpzError> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let cloud = read_ply(BufReader::new(file), options)?;
    log::debug!(
        "Loaded {} gaussians (SH degree {}) from {}",
        cloud.num_points,
        cloud.sh_degree,
        path.display()
    );
    Ok(cloud)
}

/// Read a binary little endian splat PLY.
pub fn read_ply<R: Read>(mut reader: R, options: &UnpackOptions) -> Result<GaussianCloud, SpzError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut cursor = Cursor::new(data.as_slice());
    let (header, header_len) = PlyHeader::parse(&mut cursor)?;

    if header.format != PlyFormat::BinaryLittleEndian {
        return Err(SpzError::unsupported(format!(
            "Only binary_little_endian PLY is supported, found {}",
            header.format
        )));
    }

    let vertex = header
        .get_element("vertex")
        .ok_or_else(|| SpzError::format("Missing vertex element"))?;

    // Skip any fixed width elements stored ahead of the vertices.
    let mut offset = header_len;
    for element in header.elements.iter().take_while(|e| e.name != "vertex") {
        let row_size = element.row_size().ok_or_else(|| {
            SpzError::unsupported(format!(
                "Variable size element '{}' before vertex data",
                element.name
            ))
        })?;
        offset = row_size
            .checked_mul(element.row_count)
            .and_then(|size| offset.checked_add(size))
            .ok_or_else(|| {
                SpzError::format(format!("Element '{}' size overflows", element.name))
            })?;
    }

    let sh_degree = check_vertex_properties(vertex)?;
    let row_size = vertex.row_size().ok_or_else(|| {
        SpzError::unsupported("List properties in the vertex element are not supported")
    })?;

    let body = data.get(offset..).unwrap_or_default();
    let needed = row_size
        .checked_mul(vertex.row_count)
        .ok_or_else(|| SpzError::format("Vertex count overflows"))?;
    if body.len() < needed {
        return Err(SpzError::format(format!(
            "Truncated vertex data: expected {needed} bytes for {} vertices, found {}",
            vertex.row_count,
            body.len()
        )));
    }

    let mut cloud = GaussianCloud::with_capacity(sh_degree, vertex.row_count)?;
    let sh_dim = cloud.sh_dim()?;
    let mut rows = RowDeserializer::new(&body[..needed], vertex);

    for _ in 0..vertex.row_count {
        let row = SplatRow::deserialize(&mut rows)?;
        let [w, x, y, z] = row.rotation_wxyz;

        cloud.positions.push(row.position);
        cloud.scales.push(row.scale);
        cloud.rotations.push([x, y, z, w]);
        cloud.opacities.push(row.opacity);
        cloud.colors.push(row.dc);
        // PLY stores every red coefficient, then green, then blue.
        cloud.sh.extend((0..sh_dim).map(|j| {
            [
                row.rest[j],
                row.rest[sh_dim + j],
                row.rest[2 * sh_dim + j],
            ]
        }));
    }
    cloud.num_points = vertex.row_count;

    cloud.apply(&CoordinateConverter::new(PLY_COORDINATE_SYSTEM, options.to));
    Ok(cloud)
}

/// Check the splat properties are present and infer the SH degree.
fn check_vertex_properties(vertex: &ElementDef) -> Result<u8, SpzError> {
    if let Some(missing) = REQUIRED_PROPERTIES
        .iter()
        .find(|name| !vertex.has_property(name))
    {
        return Err(SpzError::format(format!(
            "Missing required vertex property '{missing}'"
        )));
    }

    let mut rest = 0;
    for prop in &vertex.properties {
        if !prop.name.starts_with("f_rest_") {
            continue;
        }
        if !matches!(prop.property_type, PropertyType::Scalar(_)) {
            return Err(SpzError::format(format!("'{}' must be a scalar", prop.name)));
        }
        rest += 1;
    }

    let degree = (rest % 3 == 0)
        .then(|| degree_for_sh_dim(rest / 3))
        .flatten()
        .ok_or_else(|| SpzError::format(format!("Unsupported number of f_rest properties: {rest}")))?;

    // Every f_rest index must land inside the declared count.
    for i in 0..rest {
        if !vertex.has_property(&format!("f_rest_{i}")) {
            return Err(SpzError::format(format!("Missing property 'f_rest_{i}'")));
        }
    }
    Ok(degree)
}
