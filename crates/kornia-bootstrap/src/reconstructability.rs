//! # Reconstructability
//!
//! Decides whether a frame pair is worth triangulating by checking how much of the
//! observed motion a pure rotation explains. A pair whose correspondences are mostly
//! consistent with a rotation has no usable baseline.

use crate::camera::CameraModel;
use crate::pose::{ransac_essential, ransac_rotation, RansacParams};

/// Share of correspondences a rotation must fail to explain for the pair to be accepted.
pub const DEFAULT_MIN_OUTLIER_RATIO: f64 = 0.3;

/// Parameters of the rotation-only reconstructability test.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReconstructabilityParams {
    /// RANSAC settings shared by both motion models.
    pub ransac: RansacParams,
    /// Minimum ratio of rotation outliers for a non-zero score.
    pub min_outlier_ratio: f64,
}

impl Default for ReconstructabilityParams {
    fn default() -> Self {
        Self {
            ransac: RansacParams::default(),
            min_outlier_ratio: DEFAULT_MIN_OUTLIER_RATIO,
        }
    }
}

/// Score of a frame pair. Zero means the pair must not be used for initialization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReconstructabilityScore {
    /// The score; higher favors triangulation.
    pub score: f64,
    /// Correspondences explained by a rotation-only motion.
    pub rotation_inliers: usize,
    /// Correspondences explained by a general epipolar motion.
    pub epipolar_inliers: usize,
    /// Correspondences evaluated.
    pub num_correspondences: usize,
}

impl ReconstructabilityScore {
    /// A zero score for `num_correspondences` correspondences.
    pub fn rejected(num_correspondences: usize) -> Self {
        Self {
            score: 0.0,
            rotation_inliers: 0,
            epipolar_inliers: 0,
            num_correspondences,
        }
    }

    /// Whether the score allows reconstruction.
    pub fn is_reconstructable(&self) -> bool {
        self.score > 0.0
    }
}

/// Computes the reconstructability of a set of pixel correspondences.
pub trait ReconstructabilityScorer: Send + Sync {
    /// Score the aligned correspondences `points_a[i] <-> points_b[i]`.
    ///
    /// `threshold` is an angle in radians. Must be deterministic for fixed inputs.
    fn score(
        &self,
        points_a: &[[f64; 2]],
        points_b: &[[f64; 2]],
        camera_a: &CameraModel,
        camera_b: &CameraModel,
        threshold: f64,
    ) -> ReconstructabilityScore;
}

/// Score from the number of correspondences not explained by a rotation.
///
/// Returns that number when it is at least `min_outlier_ratio` of `common_tracks`, and
/// zero otherwise or when there are no correspondences.
pub fn pairwise_reconstructability(
    common_tracks: usize,
    rotation_inliers: usize,
    min_outlier_ratio: f64,
) -> f64 {
    if common_tracks == 0 {
        return 0.0;
    }
    let outliers = common_tracks.saturating_sub(rotation_inliers);
    let outlier_ratio = outliers as f64 / common_tracks as f64;
    if outlier_ratio >= min_outlier_ratio {
        outliers as f64
    } else {
        0.0
    }
}

/// Reconstructability of a pair of pixel sets observed with the given cameras.
///
/// Fits a rotation-only model to the bearings and scores the pair with
/// [`pairwise_reconstructability`]. An epipolar model is fit as well for diagnostics.
pub fn compute_pair_reconstructability(
    points_a: &[[f64; 2]],
    points_b: &[[f64; 2]],
    camera_a: &CameraModel,
    camera_b: &CameraModel,
    threshold: f64,
    params: &ReconstructabilityParams,
) -> ReconstructabilityScore {
    let n = points_a.len().min(points_b.len());
    if n < 2 || points_a.len() != points_b.len() {
        return ReconstructabilityScore::rejected(n);
    }

    let bearings_a = camera_a.pixel_bearing_many(points_a);
    let bearings_b = camera_b.pixel_bearing_many(points_b);

    let rotation_inliers = match ransac_rotation(&bearings_a, &bearings_b, threshold, &params.ransac)
    {
        Ok(res) => res.inlier_count,
        Err(err) => {
            log::debug!("rotation-only model could not be fit: {err}");
            return ReconstructabilityScore::rejected(n);
        }
    };

    let normalized_a: Vec<_> = points_a.iter().map(|p| camera_a.pixel_to_normalized(p)).collect();
    let normalized_b: Vec<_> = points_b.iter().map(|p| camera_b.pixel_to_normalized(p)).collect();
    let epipolar_inliers =
        match ransac_essential(&normalized_a, &normalized_b, threshold, &params.ransac) {
            Ok(res) => res.inlier_count,
            Err(err) => {
                log::trace!("epipolar model could not be fit: {err}");
                0
            }
        };

    let score = pairwise_reconstructability(n, rotation_inliers, params.min_outlier_ratio);
    log::debug!(
        "reconstructability: {n} correspondences, {rotation_inliers} rotation inliers, \
         {epipolar_inliers} epipolar inliers, score {score}"
    );

    ReconstructabilityScore {
        score,
        rotation_inliers,
        epipolar_inliers,
        num_correspondences: n,
    }
}

/// The default scorer: rejects pairs whose motion is mostly a pure rotation.
#[derive(Debug, Clone, Default)]
pub struct RotationOnlyScorer {
    params: ReconstructabilityParams,
}

impl RotationOnlyScorer {
    /// Create a scorer with the given parameters.
    pub fn new(params: ReconstructabilityParams) -> Self {
        Self { params }
    }

    /// The scorer parameters.
    pub fn params(&self) -> &ReconstructabilityParams {
        &self.params
    }
}

impl ReconstructabilityScorer for RotationOnlyScorer {
    fn score(
        &self,
        points_a: &[[f64; 2]],
        points_b: &[[f64; 2]],
        camera_a: &CameraModel,
        camera_b: &CameraModel,
        threshold: f64,
    ) -> ReconstructabilityScore {
        compute_pair_reconstructability(
            points_a,
            points_b,
            camera_a,
            camera_b,
            threshold,
            &self.params,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg;

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

    fn views(
        points: &[[f64; 3]],
        r: &[[f64; 3]; 3],
        t: &[f64; 3],
    ) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
        let cam = camera();
        let a = points.iter().map(|p| cam.project(p).unwrap()).collect();
        let b = points
            .iter()
            .map(|p| {
                let q = linalg::mat33_mul_vec3(r, p);
                cam.project(&[q[0] + t[0], q[1] + t[1], q[2] + t[2]]).unwrap()
            })
            .collect();
        (a, b)
    }

    fn yaw(angle: f64) -> [[f64; 3]; 3] {
        let (s, c) = angle.sin_cos();
        [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]
    }

    #[test]
    fn test_pairwise_reconstructability() {
        assert_eq!(pairwise_reconstructability(0, 0, 0.3), 0.0);
        assert_eq!(pairwise_reconstructability(100, 80, 0.3), 0.0);
        assert_eq!(pairwise_reconstructability(100, 70, 0.3), 30.0);
        assert_eq!(pairwise_reconstructability(100, 10, 0.3), 90.0);
    }

    #[test]
    fn test_empty_correspondences_score_zero() {
        let score = compute_pair_reconstructability(
            &[],
            &[],
            &camera(),
            &camera(),
            0.024,
            &ReconstructabilityParams::default(),
        );
        assert_eq!(score.score, 0.0);
        assert!(!score.is_reconstructable());
        assert_eq!(score.num_correspondences, 0);
    }

    #[test]
    fn test_pure_rotation_is_rejected() {
        let (a, b) = views(&scene(50), &yaw(0.1), &[0.0; 3]);
        let score = RotationOnlyScorer::default().score(&a, &b, &camera(), &camera(), 0.024);
        assert_eq!(score.rotation_inliers, 50);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_translation_is_accepted() {
        let (a, b) = views(&scene(50), &yaw(0.02), &[-1.5, 0.0, 0.0]);
        let score = RotationOnlyScorer::default().score(&a, &b, &camera(), &camera(), 0.024);
        assert!(score.is_reconstructable(), "{score:?}");
        assert_eq!(score.epipolar_inliers, 50);
        assert_eq!(score.score, (50 - score.rotation_inliers) as f64);
    }

    #[test]
    fn test_score_is_deterministic() {
        let (a, b) = views(&scene(40), &yaw(0.05), &[-0.7, 0.1, 0.0]);
        let scorer = RotationOnlyScorer::default();
        let first = scorer.score(&a, &b, &camera(), &camera(), 0.024);
        for _ in 0..3 {
            assert_eq!(scorer.score(&a, &b, &camera(), &camera(), 0.024), first);
        }
    }
}
