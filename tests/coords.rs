use spz_codec::{convert, CoordinateConverter, CoordinateSystem, GaussianCloud};

fn bits3(v: [f32; 3]) -> [u32; 3] {
    v.map(f32::to_bits)
}

fn bits4(v: [f32; 4]) -> [u32; 4] {
    v.map(f32::to_bits)
}

#[test]
fn test_same_system_is_identity() {
    for system in CoordinateSystem::ALL {
        assert!(CoordinateConverter::new(system, system).is_identity());
    }
}

#[test]
fn test_unspecified_never_converts() {
    for system in CoordinateSystem::ALL {
        assert!(CoordinateConverter::new(CoordinateSystem::Unspecified, system).is_identity());
        assert!(CoordinateConverter::new(system, CoordinateSystem::Unspecified).is_identity());
    }
}

#[test]
fn test_conversion_inverse_is_exact() {
    let p = [0.123, -4.5, 77.25];
    let q = [0.1, -0.7, 0.3, 0.64];
    let rgb = [0.25, -0.125, 0.5];

    for a in CoordinateSystem::ALL {
        for b in CoordinateSystem::ALL {
            let there = CoordinateConverter::new(a, b);
            let back = CoordinateConverter::new(b, a);

            assert_eq!(bits3(back.position(there.position(p))), bits3(p));
            assert_eq!(bits3(back.normal(there.normal(p))), bits3(p));
            assert_eq!(bits4(back.rotation(there.rotation(q))), bits4(q));
            for i in 0..15 {
                let flipped = back.sh_coefficient(i, there.sh_coefficient(i, rgb));
                assert_eq!(bits3(flipped), bits3(rgb), "{a} -> {b}, coefficient {i}");
            }
        }
    }
}

#[test]
fn test_conversion_preserves_magnitudes() {
    let p = [1.0, -2.0, 3.0];
    let q = [0.5, 0.5, -0.5, 0.5];
    for a in CoordinateSystem::ALL {
        for b in CoordinateSystem::ALL {
            let c = CoordinateConverter::new(a, b);
            assert_eq!(c.position(p).map(f32::abs), p.map(f32::abs));
            assert_eq!(c.rotation(q).map(f32::abs), q.map(f32::abs));
            // The real part never changes.
            assert_eq!(c.rotation(q)[3], q[3]);
        }
    }
}

#[test]
fn test_left_handed_to_right_handed() {
    let c = CoordinateConverter::new(CoordinateSystem::LUF, CoordinateSystem::RUB);
    assert_eq!(c.position([1.0, 2.0, 3.0]), [-1.0, 2.0, -3.0]);
    assert_eq!(c.rotation([1.0, 1.0, 1.0, 1.0]), [-1.0, 1.0, -1.0, 1.0]);
    // Degree 1 basis is (y, z, x).
    assert_eq!(c.sh_coefficient(0, [1.0; 3]), [1.0; 3]);
    assert_eq!(c.sh_coefficient(1, [1.0; 3]), [-1.0; 3]);
    assert_eq!(c.sh_coefficient(2, [1.0; 3]), [-1.0; 3]);
}

#[test]
fn test_convert_points() {
    let points = vec![[1.0, 2.0, 3.0], [-4.0, 0.0, 6.5]];
    let rdf = convert(&points, CoordinateSystem::RUB, CoordinateSystem::RDF);
    assert_eq!(rdf, vec![[1.0, -2.0, -3.0], [-4.0, -0.0, -6.5]]);
    assert_eq!(
        convert(&rdf, CoordinateSystem::RDF, CoordinateSystem::RUB),
        points
    );
    assert_eq!(
        convert(&points, CoordinateSystem::Unspecified, CoordinateSystem::RDF),
        points
    );
}

#[test]
fn test_cloud_conversion_roundtrip() {
    let cloud = GaussianCloud {
        num_points: 2,
        sh_degree: 3,
        antialiased: true,
        positions: vec![[1.0, 2.0, 3.0], [0.5, -0.5, 8.0]],
        scales: vec![[-1.0, -2.0, -3.0], [0.0, 0.0, 0.0]],
        rotations: vec![[0.1, 0.2, 0.3, 0.9], [0.0, 0.6, 0.0, 0.8]],
        opacities: vec![0.25, -3.0],
        colors: vec![[0.1, 0.2, 0.3], [-0.4, 0.0, 0.4]],
        sh: (0..30).map(|i| [i as f32 * 0.01, 0.5, -0.25]).collect(),
    };

    for a in CoordinateSystem::ALL {
        for b in CoordinateSystem::ALL {
            let mut converted = cloud.clone();
            converted.convert_coordinates(a, b);
            // Only signs move.
            assert_eq!(converted.scales, cloud.scales);
            assert_eq!(converted.colors, cloud.colors);
            assert_eq!(converted.opacities, cloud.opacities);

            converted.convert_coordinates(b, a);
            assert_eq!(converted, cloud, "{a} -> {b}");
        }
    }
}

#[test]
fn test_rotate_180_twice_is_identity() {
    let mut cloud = GaussianCloud {
        num_points: 1,
        sh_degree: 1,
        antialiased: false,
        positions: vec![[1.0, 2.0, 3.0]],
        scales: vec![[0.0; 3]],
        rotations: vec![[0.0, 0.0, 0.0, 1.0]],
        opacities: vec![0.0],
        colors: vec![[0.0; 3]],
        sh: vec![[1.0; 3], [2.0; 3], [3.0; 3]],
    };
    let original = cloud.clone();

    cloud.rotate_180_deg_about_x();
    assert_eq!(cloud.positions[0], [1.0, -2.0, -3.0]);
    cloud.rotate_180_deg_about_x();
    assert_eq!(cloud, original);
}

#[test]
fn test_parse_and_display() {
    for system in CoordinateSystem::ALL {
        let text = system.to_string();
        assert_eq!(text.parse::<CoordinateSystem>().unwrap(), system);
        assert_eq!(
            text.to_lowercase().parse::<CoordinateSystem>().unwrap(),
            system
        );
    }
    assert!("XYZ".parse::<CoordinateSystem>().is_err());
    assert_eq!(CoordinateSystem::default(), CoordinateSystem::Unspecified);
}
