use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::cloud::GaussianCloud;
use crate::ply::header::{ElementDef, PlyFormat, PlyHeader, PlyProperty, ScalarType};
use crate::ply::read::PLY_COORDINATE_SYSTEM;
use crate::{persist, CoordinateConverter, PackOptions, SpzError};

fn splat_header(num_points: usize, sh_dim: usize) -> PlyHeader {
    let mut names: Vec<String> = ["x", "y", "z", "nx", "ny", "nz", "f_dc_0", "f_dc_1", "f_dc_2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    names.extend((0..sh_dim * 3).map(|i| format!("f_rest_{i}")));
    names.extend(
        [
            "opacity", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    PlyHeader {
        format: PlyFormat::BinaryLittleEndian,
        version: "1.0".to_string(),
        elements: vec![ElementDef {
            name: "vertex".to_string(),
            row_count: num_points,
            properties: names
                .into_iter()
                .map(|name| PlyProperty::scalar(name, ScalarType::F32))
                .collect(),
        }],
        comments: vec![],
        obj_info: vec![],
    }
}

/// Write a cloud as a binary little endian splat PLY.
pub fn write_ply<W: Write>(
    cloud: &GaussianCloud,
    options: &PackOptions,
    writer: W,
) -> Result<(), SpzError> {
    cloud.validate()?;
    let sh_dim = cloud.sh_dim()?;
    let converter = CoordinateConverter::new(options.from, PLY_COORDINATE_SYSTEM);

    let mut writer = BufWriter::new(writer);
    splat_header(cloud.num_points, sh_dim).write(&mut writer)?;

    let mut row = Vec::with_capacity(17 + sh_dim * 3);
    for i in 0..cloud.num_points {
        let [x, y, z, w] = converter.rotation(cloud.rotations[i]);
        let sh = cloud.sh_coefficients(i);

        row.clear();
        row.extend(converter.position(cloud.positions[i]));
        row.extend([0.0; 3]);
        row.extend(cloud.colors[i]);
        // Channel-major: all red coefficients first.
        for channel in 0..3 {
            row.extend(
                sh.iter()
                    .enumerate()
                    .map(|(j, &rgb)| converter.sh_coefficient(j, rgb)[channel]),
            );
        }
        row.push(cloud.opacities[i]);
        row.extend(cloud.scales[i]);
        row.extend([w, x, y, z]);

        for &v in &row {
            writer.write_f32::<LittleEndian>(v)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Save a cloud to a PLY file. The destination is only replaced once the
/// whole file has been written.
pub fn save_splat_to_ply(
    cloud: &GaussianCloud,
    options: &PackOptions,
    path: impl AsRef<Path>,
) -> Result<(), SpzError> {
    let path = path.as_ref();
    persist::write_atomic(path, |file| write_ply(cloud, options, file))?;
    log::debug!("Saved {} gaussians to {}", cloud.num_points, path.display());
    Ok(())
}
