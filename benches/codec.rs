use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::io::Cursor;

use spz_codec::{CoordinateSystem, GaussianCloud, PackOptions, UnpackOptions};

fn generate_cloud(num_points: usize) -> GaussianCloud {
    let mut cloud = GaussianCloud::with_capacity(3, num_points).unwrap();
    cloud.num_points = num_points;
    for i in 0..num_points {
        let i_f = i as f32;
        cloud.positions.push([
            (i_f * 0.1) % 40.0 - 20.0,
            (i_f * 0.13) % 10.0,
            (i_f * 0.17) % 10.0,
        ]);
        cloud.scales.push([-4.0, -3.5, -5.0 + (i_f * 0.01).sin()]);
        cloud.rotations.push([0.0, 0.0, 0.707, 0.707]);
        cloud.opacities.push((i_f * 0.3).cos() * 4.0);
        cloud.colors.push([0.5, (i_f * 0.05).sin(), -0.25]);
        for j in 0..15 {
            let val = (j as f32 * 0.01 * i_f.sin()).clamp(-0.1, 0.1);
            cloud.sh.push([val, -val, val * 0.5]);
        }
    }
    cloud
}

fn bench_spz(c: &mut Criterion) {
    let num_points = 100_000;
    let cloud = generate_cloud(num_points);
    let bytes = spz_codec::encode(&cloud, &PackOptions::default()).unwrap();

    let mut group = c.benchmark_group("spz");
    group.throughput(Throughput::Elements(num_points as u64));

    group.bench_function("encode", |b| {
        b.iter(|| spz_codec::encode(black_box(&cloud), &PackOptions::default()).unwrap())
    });
    group.bench_function("decode", |b| {
        b.iter(|| spz_codec::decode(black_box(&bytes), &UnpackOptions::default()).unwrap())
    });

    group.finish();
}

fn bench_ply(c: &mut Criterion) {
    let num_points = 100_000;
    let cloud = generate_cloud(num_points);
    let options = PackOptions::from_system(CoordinateSystem::RDF);
    let mut data = Vec::new();
    spz_codec::write_ply(&cloud, &options, &mut data).unwrap();

    let mut group = c.benchmark_group("ply");
    group.throughput(Throughput::Elements(num_points as u64));

    group.bench_with_input("read", &data, |b, data| {
        b.iter(|| {
            let cloud = spz_codec::read_ply(
                Cursor::new(black_box(data)),
                &UnpackOptions::to_system(CoordinateSystem::RUB),
            )
            .unwrap();
            black_box(cloud)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_spz, bench_ply);
criterion_main!(benches);
