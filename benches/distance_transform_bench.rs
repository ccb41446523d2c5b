// Distance transform benchmark - two-pass chamfer scan cost per resolution
//
// Run with: cargo bench --bench distance_transform_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use frameflow_common::{Channels, ColorModel, FrameBuffer, PixelDepth};
use frameflow_distance_field::{
    distance_transform, normalize_field, DistanceFieldConfig, DistanceMetric, Neighborhood,
};

/// Sparse dot mask, roughly one active pixel per 64
fn dot_mask(size: u32) -> FrameBuffer {
    let mut mask = FrameBuffer::zeroed(size, size, Channels::One, PixelDepth::U8, ColorModel::Gray);
    let px = mask.bytes_mut().unwrap();
    for y in (0..size).step_by(8) {
        for x in (0..size).step_by(8) {
            px[(y * size + x) as usize] = 255;
        }
    }
    mask
}

fn bench_distance_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance_transform");

    let configs = [
        ("l1_3x3", DistanceMetric::L1, Neighborhood::ThreeByThree),
        ("l2_3x3", DistanceMetric::L2, Neighborhood::ThreeByThree),
        ("l2_5x5", DistanceMetric::L2, Neighborhood::FiveByFive),
    ];

    for size in [256u32, 512, 1024] {
        let mask = dot_mask(size);
        for (name, metric, neighborhood) in configs {
            let config = DistanceFieldConfig {
                metric,
                neighborhood,
                invert_gray: false,
            };
            group.bench_with_input(
                BenchmarkId::new(name, format!("{size}x{size}")),
                &mask,
                |b, mask| {
                    let mut field = None;
                    b.iter(|| {
                        distance_transform(black_box(mask), config, &mut field).unwrap();
                        black_box(&field);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_field");

    for size in [256u32, 512, 1024] {
        let mask = dot_mask(size);
        let mut field = None;
        distance_transform(
            &mask,
            DistanceFieldConfig::default(),
            &mut field,
        )
        .unwrap();
        let field = field.unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}x{size}")),
            &field,
            |b, field| {
                let mut gray = None;
                b.iter(|| {
                    normalize_field(black_box(field), false, &mut gray);
                    black_box(&gray);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_distance_transform, bench_normalize);
criterion_main!(benches);
