use std::collections::BTreeMap;
use std::time::Instant;

use crate::camera::CameraModel;
use crate::frame::FrameId;
use crate::linalg;
use crate::pose::{decompose_essential, ransac_essential, RansacParams};
use crate::reconstruction::{
    BootstrapError, BootstrapOutcome, BootstrapReconstructor, BootstrapReport, Landmark, Pose,
    Reconstruction, Shot,
};
use crate::track_graph::{TrackGraph, TrackGraphError, TrackId};

/// Name reported by [`TwoViewReconstructor`].
pub const TWO_VIEW_METHOD: &str = "linear_two_view";

/// Relative pose solves with fewer inliers than this are discarded.
const MIN_RELATIVE_POSE_INLIERS: usize = 6;

/// Configuration of the reference two-view reconstructor.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TwoViewReconstructorConfig {
    /// RANSAC settings for the essential matrix.
    pub ransac: RansacParams,
    /// Relative pose inlier threshold, an angle in radians.
    pub five_point_algo_threshold: f64,
    /// Maximum angular reprojection error of a triangulated point, in radians.
    pub triangulation_threshold: f64,
    /// Minimum parallax angle (degrees) for triangulated points.
    pub min_parallax_deg: f64,
    /// Minimum number of triangulated points for a successful reconstruction.
    pub min_inliers: usize,
}

impl Default for TwoViewReconstructorConfig {
    fn default() -> Self {
        Self {
            ransac: RansacParams::default(),
            five_point_algo_threshold: 0.004,
            triangulation_threshold: 0.006,
            min_parallax_deg: 1.0,
            min_inliers: 20,
        }
    }
}

/// Bootstrap reconstructor based on a linear essential matrix solve and DLT triangulation.
///
/// The reference frame is placed at the origin and the candidate at the recovered unit
/// baseline.
#[derive(Clone, Debug, Default)]
pub struct TwoViewReconstructor {
    config: TwoViewReconstructorConfig,
}

impl TwoViewReconstructor {
    /// Create a reconstructor with the given configuration.
    pub fn new(config: TwoViewReconstructorConfig) -> Self {
        Self { config }
    }

    /// The reconstructor configuration.
    pub fn config(&self) -> &TwoViewReconstructorConfig {
        &self.config
    }
}

struct TriangulateParams<'a> {
    rotation: &'a [[f64; 3]; 3],
    translation: &'a [f64; 3],
    min_parallax_deg: f64,
    max_angular_error: f64,
}

impl BootstrapReconstructor for TwoViewReconstructor {
    fn bootstrap_reconstruction(
        &self,
        graph: &TrackGraph,
        frame_a: &FrameId,
        frame_b: &FrameId,
        camera: (&str, &CameraModel),
        points_a: &[[f64; 2]],
        points_b: &[[f64; 2]],
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let start = Instant::now();
        let (camera_name, camera) = camera;

        for frame in [frame_a, frame_b] {
            if !graph.contains(&frame.clone().into()) {
                return Err(TrackGraphError::UnknownFrame(frame.clone()).into());
            }
        }
        let tracks: Vec<TrackId> = graph.tracks().collect();
        if points_a.len() != points_b.len() || points_a.len() != tracks.len() {
            return Err(BootstrapError::MismatchedInput {
                points_a: points_a.len(),
                points_b: points_b.len(),
                tracks: tracks.len(),
            });
        }

        let mut report = BootstrapReport {
            image_pair: (frame_a.clone(), frame_b.clone()),
            method: TWO_VIEW_METHOD.to_string(),
            num_candidates: tracks.len(),
            ..Default::default()
        };
        let rejected = |mut report: BootstrapReport, decision: &str| {
            log::debug!("bootstrap {frame_a}-{frame_b}: {decision}");
            report.decision = decision.to_string();
            report.wall_time = start.elapsed().as_secs_f64();
            BootstrapOutcome {
                reconstruction: None,
                inlier_graph: graph.subgraph(std::iter::empty()),
                report,
            }
        };

        let x1: Vec<_> = points_a.iter().map(|p| camera.pixel_to_normalized(p)).collect();
        let x2: Vec<_> = points_b.iter().map(|p| camera.pixel_to_normalized(p)).collect();

        let relative = match ransac_essential(
            &x1,
            &x2,
            self.config.five_point_algo_threshold,
            &self.config.ransac,
        ) {
            Ok(res) if res.inlier_count >= MIN_RELATIVE_POSE_INLIERS => res,
            Ok(res) => {
                report.num_inliers = res.inlier_count;
                return Ok(rejected(report, "Could not find initial motion"));
            }
            Err(err) => {
                log::debug!("relative pose failed: {err}");
                return Ok(rejected(report, "Could not find initial motion"));
            }
        };
        report.num_inliers = relative.inlier_count;

        let mut best: Option<(Pose, Vec<(usize, [f64; 3])>)> = None;
        for (rotation, translation) in decompose_essential(&relative.model) {
            let params = TriangulateParams {
                rotation: &rotation,
                translation: &translation,
                min_parallax_deg: self.config.min_parallax_deg,
                max_angular_error: self.config.triangulation_threshold,
            };
            let points = triangulate_inliers(&x1, &x2, &relative.inliers, &params);
            log::trace!("pose candidate triangulates {} points", points.len());
            if best.as_ref().map_or(true, |(_, b)| points.len() > b.len()) {
                best = Some((
                    Pose {
                        rotation,
                        translation,
                    },
                    points,
                ));
            }
        }

        let (pose, points) = match best {
            Some((pose, points)) if points.len() >= self.config.min_inliers => (pose, points),
            Some((_, points)) => {
                report.num_triangulated = points.len();
                return Ok(rejected(
                    report,
                    "Initial motion did not generate enough points",
                ));
            }
            None => return Ok(rejected(report, "Could not find initial motion")),
        };

        let mut reconstruction = Reconstruction {
            cameras: BTreeMap::from([(camera_name.to_string(), camera.clone())]),
            ..Default::default()
        };
        for (frame, pose) in [(frame_a, Pose::identity()), (frame_b, pose)] {
            reconstruction.shots.insert(
                frame.clone(),
                Shot {
                    frame: frame.clone(),
                    camera: camera_name.to_string(),
                    pose,
                },
            );
        }
        for (row, position) in &points {
            let track = tracks[*row];
            let color = graph
                .observation(frame_a, track)
                .map_or([0.0; 3], |obs| obs.color);
            reconstruction.points.insert(
                track,
                Landmark {
                    track,
                    position: *position,
                    color,
                },
            );
        }

        let inlier_graph = graph.subgraph(points.iter().map(|(row, _)| tracks[*row]));

        report.num_triangulated = points.len();
        report.decision = "Success".to_string();
        report.wall_time = start.elapsed().as_secs_f64();
        log::debug!(
            "bootstrap {frame_a}-{frame_b}: {} relative pose inliers, {} points",
            report.num_inliers,
            report.num_triangulated
        );

        Ok(BootstrapOutcome {
            reconstruction: Some(reconstruction),
            inlier_graph,
            report,
        })
    }
}

/// Triangulate the inlier rows; returns `(row, point in reference camera frame)`.
fn triangulate_inliers(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    inliers: &[bool],
    params: &TriangulateParams<'_>,
) -> Vec<(usize, [f64; 3])> {
    let center2 = Pose {
        rotation: *params.rotation,
        translation: *params.translation,
    }
    .origin();

    let mut points = Vec::new();
    for i in 0..x1.len() {
        if !inliers[i] {
            continue;
        }
        let Some(x) = triangulate_point_linear(&x1[i], &x2[i], params.rotation, params.translation)
        else {
            continue;
        };

        let x_cam2 = {
            let p = linalg::mat33_mul_vec3(params.rotation, &x);
            [
                p[0] + params.translation[0],
                p[1] + params.translation[1],
                p[2] + params.translation[2],
            ]
        };
        if x[2] <= 0.0 || x_cam2[2] <= 0.0 {
            continue;
        }

        let ray2 = [x[0] - center2[0], x[1] - center2[1], x[2] - center2[2]];
        if !parallax_ok(&x, &ray2, params.min_parallax_deg) {
            continue;
        }
        if angle_between(&[x1[i][0], x1[i][1], 1.0], &x) > params.max_angular_error
            || angle_between(&[x2[i][0], x2[i][1], 1.0], &x_cam2) > params.max_angular_error
        {
            continue;
        }

        points.push((i, x));
    }
    points
}

fn angle_between(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    linalg::angle_between_vec3(a, b).unwrap_or(f64::INFINITY)
}

fn parallax_ok(ray1: &[f64; 3], ray2: &[f64; 3], min_parallax_deg: f64) -> bool {
    let angle = angle_between(ray1, ray2);
    angle.is_finite() && angle.to_degrees() >= min_parallax_deg
}

/// Linear (DLT) triangulation of normalized coordinates with `P1 = [I | 0]`, `P2 = [R | t]`.
fn triangulate_point_linear(
    x1: &[f64; 2],
    x2: &[f64; 2],
    r: &[[f64; 3]; 3],
    t: &[f64; 3],
) -> Option<[f64; 3]> {
    let p1 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    let p2 = [
        [r[0][0], r[0][1], r[0][2], t[0]],
        [r[1][0], r[1][1], r[1][2], t[1]],
        [r[2][0], r[2][1], r[2][2], t[2]],
    ];

    let mut a = faer::Mat::<f64>::zeros(4, 4);
    write_dlt_row(&mut a, 0, x1[0], &p1[2], &p1[0]);
    write_dlt_row(&mut a, 1, x1[1], &p1[2], &p1[1]);
    write_dlt_row(&mut a, 2, x2[0], &p2[2], &p2[0]);
    write_dlt_row(&mut a, 3, x2[1], &p2[2], &p2[1]);

    let xh = linalg::smallest_right_singular_vector(&a);
    let w = xh[3];
    if w.abs() < 1e-12 {
        return None;
    }
    Some([xh[0] / w, xh[1] / w, xh[2] / w])
}

fn write_dlt_row(a: &mut faer::Mat<f64>, row: usize, x: f64, p3: &[f64; 4], p1: &[f64; 4]) {
    for j in 0..4 {
        a.write(row, j, x * p3[j] - p1[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::CorrespondenceSet;
    use approx::assert_relative_eq;

    fn camera() -> CameraModel {
        CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0)
    }

    fn scene(n: usize) -> Vec<[f64; 3]> {
        (0..n)
            .map(|i| {
                let fi = i as f64;
                [
                    (fi * 0.37).sin() * 1.5,
                    (fi * 0.61).cos() * 1.0,
                    2.0 + (fi * 0.618_034).fract() * 8.0,
                ]
            })
            .collect()
    }

    fn setup(
        n: usize,
        translation: [f64; 3],
    ) -> (TrackGraph, Vec<[f64; 2]>, Vec<[f64; 2]>, FrameId, FrameId) {
        let cam = camera();
        let points = scene(n);
        let a: Vec<_> = points.iter().map(|p| cam.project(p).unwrap()).collect();
        let b: Vec<_> = points
            .iter()
            .map(|p| {
                cam.project(&[
                    p[0] + translation[0],
                    p[1] + translation[1],
                    p[2] + translation[2],
                ])
                .unwrap()
            })
            .collect();

        let set = CorrespondenceSet {
            points_a: a.iter().map(|p| [p[0], p[1], 1.0]).collect(),
            points_b: b.iter().map(|p| [p[0], p[1], 1.0]).collect(),
            descriptors_a: vec![vec![]; n],
            descriptors_b: vec![vec![]; n],
            colors_a: vec![[10.0, 20.0, 30.0]; n],
            colors_b: vec![[0.0; 3]; n],
            matches: (0..n).map(|i| [i, i]).collect(),
        };
        let (f0, f1) = (FrameId::from("F0"), FrameId::from("F1"));
        let graph = TrackGraph::from_correspondences(&f0, &f1, &set).unwrap();
        (graph, a, b, f0, f1)
    }

    #[test]
    fn test_triangulate_point_linear_exact() {
        let r = linalg::IDENTITY_MAT33;
        let t = [-1.0, 0.0, 0.0];
        let x = [0.3, -0.2, 4.0];
        let x1 = [x[0] / x[2], x[1] / x[2]];
        let x2 = [(x[0] + t[0]) / x[2], x[1] / x[2]];
        let est = triangulate_point_linear(&x1, &x2, &r, &t).unwrap();
        for i in 0..3 {
            assert_relative_eq!(est[i], x[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bootstrap_success() -> Result<(), BootstrapError> {
        let (graph, a, b, f0, f1) = setup(50, [-1.0, 0.0, 0.0]);
        let out = TwoViewReconstructor::default().bootstrap_reconstruction(
            &graph,
            &f0,
            &f1,
            ("cam", &camera()),
            &a,
            &b,
        )?;

        let rec = out.reconstruction.expect("reconstruction");
        assert_eq!(out.report.decision, "Success");
        assert_eq!(rec.shots.len(), 2);
        assert_eq!(rec.points.len(), out.inlier_graph.num_tracks());
        assert!(rec.points.len() >= 20);
        assert_eq!(rec.pose(&f0), Some(&Pose::identity()));

        // unit baseline along -x
        let t = rec.pose(&f1).unwrap().translation;
        assert_relative_eq!(t[0], -1.0, epsilon = 1e-6);

        let landmark = rec.points.values().next().unwrap();
        assert_eq!(landmark.color, [10.0, 20.0, 30.0]);
        Ok(())
    }

    #[test]
    fn test_bootstrap_too_few_points() -> Result<(), BootstrapError> {
        let (graph, a, b, f0, f1) = setup(12, [-1.0, 0.0, 0.0]);
        let out = TwoViewReconstructor::default().bootstrap_reconstruction(
            &graph,
            &f0,
            &f1,
            ("cam", &camera()),
            &a,
            &b,
        )?;
        assert!(out.reconstruction.is_none());
        assert_eq!(out.inlier_graph.num_tracks(), 0);
        assert_eq!(
            out.report.decision,
            "Initial motion did not generate enough points"
        );
        Ok(())
    }

    #[test]
    fn test_bootstrap_mismatched_input() {
        let (graph, a, b, f0, f1) = setup(12, [-1.0, 0.0, 0.0]);
        let res = TwoViewReconstructor::default().bootstrap_reconstruction(
            &graph,
            &f0,
            &f1,
            ("cam", &camera()),
            &a[..10],
            &b,
        );
        assert!(matches!(
            res,
            Err(BootstrapError::MismatchedInput {
                points_a: 10,
                points_b: 12,
                tracks: 12
            })
        ));
    }
}
