use argh::FromArgs;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;

use kornia_bootstrap::{
    CameraModel, FeatureSet, InMemoryStore, InitContext, Initializer, InitializerConfig,
    PrecomputedMatcher, TwoViewReconstructor,
};

#[derive(FromArgs)]
/// Bootstrap a two-view map from a synthetic scene
struct Args {
    /// number of scene points
    #[argh(option, default = "100")]
    num_points: usize,

    /// baseline between the two cameras along x
    #[argh(option, default = "1.0")]
    baseline: f64,

    /// yaw of the second camera in radians
    #[argh(option, default = "0.02")]
    yaw: f64,

    /// move the second camera by a pure rotation
    #[argh(switch)]
    rotation_only: bool,

    /// pixel noise amplitude
    #[argh(option, default = "0.5")]
    noise: f64,

    /// relative pose threshold in radians
    #[argh(option)]
    threshold: Option<f64>,

    /// seed of the synthetic scene
    #[argh(option, default = "0")]
    seed: u64,

    /// path to a JSON initializer configuration
    #[argh(option)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => InitializerConfig::from_json_file(path)?,
        None => InitializerConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.five_point_algo_threshold = threshold;
    }

    let camera = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
    let baseline = if args.rotation_only { 0.0 } else { args.baseline };
    let (features_a, features_b) =
        synthesize_frames(&camera, args.num_points, args.yaw, baseline, args.noise, args.seed)?;
    println!(
        "Synthetic scene: #{} / #{} features",
        features_a.len(),
        features_b.len()
    );

    let matches: Vec<[usize; 2]> = (0..features_a.len()).map(|i| [i, i]).collect();
    let mut store = InMemoryStore::new();
    store.insert_camera("synthetic", camera);
    store.insert_features("F0", features_a);
    store.insert_features("F1", features_b);
    let mut matcher = PrecomputedMatcher::new();
    matcher.insert("F0", "F1", matches);

    let reconstructor = TwoViewReconstructor::new(config.reconstructor_config());
    let context = InitContext::new(&store, &store, &matcher, &reconstructor);

    let mut initializer = Initializer::new(&config)?;
    initializer.set_initial_frame("F0");
    let outcome = initializer.initialize("F1", &context)?;

    if let Some(score) = &outcome.score {
        println!("Reconstructability: {}", serde_json::to_string(score)?);
    }
    if let Some(report) = &outcome.report {
        println!("Report: {}", serde_json::to_string_pretty(report)?);
    }
    match &outcome.reconstruction {
        Some(rec) => {
            println!(
                "Initialized: #{} shots, #{} points",
                rec.shots.len(),
                rec.points.len()
            );
            for shot in rec.shots.values() {
                println!("  {}: {:?}", shot.frame, shot.pose.translation);
            }
        }
        None if outcome.is_rejected() => println!("Pair rejected"),
        None => println!("Pair accepted but not reconstructed"),
    }

    Ok(())
}

/// Project a random scene into a reference camera and a second camera moved by a yaw and a
/// translation along x.
fn synthesize_frames(
    camera: &CameraModel,
    num_points: usize,
    yaw: f64,
    baseline: f64,
    noise: f64,
    seed: u64,
) -> Result<(FeatureSet, FeatureSet), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (s, c) = yaw.sin_cos();

    let mut points_a = Vec::with_capacity(num_points);
    let mut points_b = Vec::with_capacity(num_points);
    let mut colors = Vec::with_capacity(num_points);
    while points_a.len() < num_points {
        let p = [
            rng.random_range(-3.0..3.0),
            rng.random_range(-2.0..2.0),
            rng.random_range(3.0..12.0),
        ];
        let q = [c * p[0] + s * p[2] - baseline, p[1], -s * p[0] + c * p[2]];
        let (Some(a), Some(b)) = (camera.project(&p), camera.project(&q)) else {
            continue;
        };
        let mut jitter = || {
            if noise > 0.0 {
                rng.random_range(-noise..noise)
            } else {
                0.0
            }
        };
        points_a.push([a[0] + jitter(), a[1] + jitter(), 1.0]);
        points_b.push([b[0] + jitter(), b[1] + jitter(), 1.0]);
        colors.push([128.0, 128.0, 128.0]);
    }

    let descriptors = vec![Vec::new(); num_points];
    let features_a = FeatureSet::new(points_a, descriptors.clone(), colors.clone())?;
    let features_b = FeatureSet::new(points_b, descriptors, colors)?;
    log::debug!("synthesized {num_points} correspondences");
    Ok((features_a, features_b))
}
