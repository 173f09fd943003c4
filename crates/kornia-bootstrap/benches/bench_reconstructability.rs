use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kornia_bootstrap::linalg::mat33_mul_vec3;
use kornia_bootstrap::pose::{ransac_rotation, RansacParams};
use kornia_bootstrap::{CameraModel, ReconstructabilityScorer, RotationOnlyScorer};

/// Generate pixel correspondences of a scene seen from two cameras.
fn generate_views(n: usize, angle: f64, baseline: f64) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let cam = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
    let (s, c) = angle.sin_cos();
    let r = [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]];
    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    for i in 0..n {
        let fi = i as f64;
        let p = [
            (fi * 0.37).sin() * 1.5,
            (fi * 0.61).cos(),
            2.0 + (fi * 0.618_034).fract() * 8.0,
        ];
        let q = mat33_mul_vec3(&r, &p);
        if let (Some(a), Some(b)) = (cam.project(&p), cam.project(&[q[0] - baseline, q[1], q[2]]))
        {
            x1.push(a);
            x2.push(b);
        }
    }
    (x1, x2)
}

fn bench_ransac_rotation(c: &mut Criterion) {
    let cam = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
    let mut group = c.benchmark_group("ransac_rotation");
    for &n in &[50, 200, 1000] {
        let (x1, x2) = generate_views(n, 0.05, 1.0);
        let b1 = cam.pixel_bearing_many(&x1);
        let b2 = cam.pixel_bearing_many(&x2);
        let params = RansacParams {
            max_iterations: 500,
            min_inliers: 0,
            random_seed: Some(42),
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = std::hint::black_box(ransac_rotation(&b1, &b2, 0.016, &params));
            });
        });
    }
    group.finish();
}

fn bench_reconstructability(c: &mut Criterion) {
    let cam = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
    let scorer = RotationOnlyScorer::default();
    let mut group = c.benchmark_group("reconstructability");
    for (name, baseline) in [("rotation", 0.0), ("translation", 1.0)] {
        let (x1, x2) = generate_views(200, 0.05, baseline);
        group.bench_function(name, |b| {
            b.iter(|| {
                std::hint::black_box(scorer.score(&x1, &x2, &cam, &cam, 0.016));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ransac_rotation, bench_reconstructability);
criterion_main!(benches);
