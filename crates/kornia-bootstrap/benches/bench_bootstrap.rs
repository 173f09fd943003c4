use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kornia_bootstrap::{
    BootstrapReconstructor, CameraModel, CorrespondenceSet, FrameId, TrackGraph,
    TwoViewReconstructor,
};

/// Generate a two-view track graph and its pixel arrays.
fn generate_pair(n: usize) -> (TrackGraph, Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let cam = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
    let mut set = CorrespondenceSet::default();
    for i in 0..n {
        let fi = i as f64;
        let p = [
            (fi * 0.37).sin() * 1.5,
            (fi * 0.61).cos(),
            2.0 + (fi * 0.618_034).fract() * 8.0,
        ];
        let (Some(a), Some(b)) = (cam.project(&p), cam.project(&[p[0] - 1.0, p[1], p[2]])) else {
            continue;
        };
        let row = set.len();
        set.points_a.push([a[0], a[1], 1.0]);
        set.points_b.push([b[0], b[1], 1.0]);
        set.descriptors_a.push(Vec::new());
        set.descriptors_b.push(Vec::new());
        set.colors_a.push([0.0; 3]);
        set.colors_b.push([0.0; 3]);
        set.matches.push([row, row]);
    }
    let (x1, x2) = (set.pixels_a(), set.pixels_b());
    let graph = TrackGraph::from_correspondences(&FrameId::from(0u64), &FrameId::from(1u64), &set)
        .expect("two distinct frames");
    (graph, x1, x2)
}

fn bench_track_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_graph_subgraph");
    for &n in &[100, 1000] {
        let (graph, _, _) = generate_pair(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                std::hint::black_box(graph.subgraph(graph.tracks().step_by(2)));
            });
        });
    }
    group.finish();
}

fn bench_two_view_reconstructor(c: &mut Criterion) {
    let cam = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
    let reconstructor = TwoViewReconstructor::default();
    let (f0, f1) = (FrameId::from(0u64), FrameId::from(1u64));
    let mut group = c.benchmark_group("two_view_reconstructor");
    for &n in &[50, 200, 500] {
        let (graph, x1, x2) = generate_pair(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = std::hint::black_box(reconstructor.bootstrap_reconstruction(
                    &graph,
                    &f0,
                    &f1,
                    ("cam", &cam),
                    &x1,
                    &x2,
                ));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_track_graph, bench_two_view_reconstructor);
criterion_main!(benches);
