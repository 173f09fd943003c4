//! # Relative pose models
//!
//! Minimal solvers and RANSAC estimators for the two motion models compared during
//! initialization:
//!
//! - rotation-only motion between unit bearings (2-point Procrustes solve)
//! - general epipolar motion through the essential matrix (normalized 8-point solve)

use rand::prelude::*;

use crate::linalg;

/// Errors returned by the relative pose estimators.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PoseError {
    /// Input correspondences are invalid or insufficient.
    #[error("Need at least {required} correspondences and equal lengths, got {actual}")]
    InvalidInput {
        /// Minimum required correspondences for the chosen model.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },
    /// The minimal solver hit a degenerate configuration.
    #[error("Degenerate configuration: {0}")]
    Degenerate(&'static str),
    /// RANSAC failed to find a valid model.
    #[error("RANSAC failed to find a valid model")]
    RansacFailure,
}

/// Parameters for RANSAC model estimation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Minimum number of inliers required for acceptance.
    pub min_inliers: usize,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            min_inliers: 0,
            random_seed: Some(0),
        }
    }
}

/// Result of a RANSAC model fit.
#[derive(Clone, Debug)]
pub struct RansacResult<M> {
    /// Estimated model, refit on all inliers when possible.
    pub model: M,
    /// Per-point inlier mask.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Sum of inlier errors (lower is better).
    pub score: f64,
}

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// Solves `x2^T F x1 = 0`. Points may be pixels or normalized image coordinates; in the
/// latter case the result is an essential matrix up to the singular value constraint.
pub fn fundamental_8point(x1: &[[f64; 2]], x2: &[[f64; 2]]) -> Result<[[f64; 3]; 3], PoseError> {
    if x1.len() != x2.len() || x1.len() < 8 {
        return Err(PoseError::InvalidInput {
            required: 8,
            actual: x1.len().min(x2.len()),
        });
    }

    // Normalize points with similarity transforms T1, T2 to have zero mean and avg sqrt(2) distance
    let (x1n, t1) = normalize_points_2d(x1);
    let (x2n, t2) = normalize_points_2d(x2);

    let n = x1n.len();
    let mut a = faer::Mat::<f64>::zeros(n.max(9), 9);
    for i in 0..n {
        let (x, y) = (x1n[i][0], x1n[i][1]);
        let (xp, yp) = (x2n[i][0], x2n[i][1]);
        a.write(i, 0, xp * x);
        a.write(i, 1, xp * y);
        a.write(i, 2, xp);
        a.write(i, 3, yp * x);
        a.write(i, 4, yp * y);
        a.write(i, 5, yp);
        a.write(i, 6, x);
        a.write(i, 7, y);
        a.write(i, 8, 1.0);
    }

    let fvec = linalg::smallest_right_singular_vector(&a);
    let f = [
        [fvec[0], fvec[1], fvec[2]],
        [fvec[3], fvec[4], fvec[5]],
        [fvec[6], fvec[7], fvec[8]],
    ];

    // rank-2 constraint
    let (u, mut s, v) = linalg::svd3(&f);
    if s[1] <= 1e-12 {
        return Err(PoseError::Degenerate("fundamental matrix has rank < 2"));
    }
    s[2] = 0.0;
    let f_rank2 = linalg::compose_svd3(&u, &s, &v);

    // F = T2^T * F * T1
    let f_denorm = linalg::mat33_mul(
        &linalg::mat33_transpose(&t2),
        &linalg::mat33_mul(&f_rank2, &t1),
    );
    Ok(normalize_mat33(&f_denorm))
}

fn normalize_points_2d(x: &[[f64; 2]]) -> (Vec<[f64; 2]>, [[f64; 3]; 3]) {
    let n = x.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in x {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;

    let mut mean_dist = 0.0;
    for p in x {
        let dx = p[0] - mx;
        let dy = p[1] - my;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;
    let scale = if mean_dist > 0.0 {
        (2.0f64).sqrt() / mean_dist
    } else {
        1.0
    };

    let xn = x
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();
    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    (xn, t)
}

fn normalize_mat33(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let norm = m.iter().flatten().map(|v| v * v).sum::<f64>().sqrt();
    if norm <= 1e-15 {
        return *m;
    }
    let mut out = *m;
    out.iter_mut().flatten().for_each(|v| *v /= norm);
    out
}

/// First-order geometric (Sampson) error of a correspondence under `x2^T F x1 = 0`.
///
/// The value is a squared distance in the units of the input points.
pub fn sampson_distance(f: &[[f64; 3]; 3], x1: &[f64; 2], x2: &[f64; 2]) -> f64 {
    let p1 = [x1[0], x1[1], 1.0];
    let p2 = [x2[0], x2[1], 1.0];
    let fx1 = linalg::mat33_mul_vec3(f, &p1);
    let ftx2 = linalg::mat33_mul_vec3(&linalg::mat33_transpose(f), &p2);
    let num = linalg::dot_product3(&p2, &fx1);
    let den = fx1[0] * fx1[0] + fx1[1] * fx1[1] + ftx2[0] * ftx2[0] + ftx2[1] * ftx2[1];
    if den <= 1e-300 {
        return f64::INFINITY;
    }
    num * num / den
}

/// Enforce the (1, 1, 0) singular value constraint on an essential matrix.
pub fn enforce_essential_constraints(e: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let (u, _, v) = linalg::svd3(e);
    linalg::compose_svd3(&u, &[1.0, 1.0, 0.0], &v)
}

/// Decompose an essential matrix into its four `(R, t)` candidates.
///
/// `t` is a unit vector; the relative motion maps reference camera coordinates to the
/// candidate camera as `X2 = R * X1 + t`.
pub fn decompose_essential(e: &[[f64; 3]; 3]) -> [([[f64; 3]; 3], [f64; 3]); 4] {
    let (mut u, _, mut v) = linalg::svd3(e);
    if linalg::det_mat33(&u) < 0.0 {
        u.iter_mut().for_each(|row| row[2] = -row[2]);
    }
    if linalg::det_mat33(&v) < 0.0 {
        v.iter_mut().for_each(|row| row[2] = -row[2]);
    }

    let w = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    let vt = linalg::mat33_transpose(&v);
    let r1 = linalg::mat33_mul(&u, &linalg::mat33_mul(&w, &vt));
    let r2 = linalg::mat33_mul(&u, &linalg::mat33_mul(&linalg::mat33_transpose(&w), &vt));

    let t = [u[0][2], u[1][2], u[2][2]];
    let t_neg = [-t[0], -t[1], -t[2]];

    [(r1, t), (r1, t_neg), (r2, t), (r2, t_neg)]
}

/// Least-squares rotation `R` such that `b2 ≈ R * b1` for paired unit bearings.
///
/// Procrustes solve through the SVD of the cross-covariance, with the reflection fixed so
/// that `det(R) = 1`. Needs two non-parallel bearings.
pub fn fit_rotation(b1: &[[f64; 3]], b2: &[[f64; 3]]) -> Result<[[f64; 3]; 3], PoseError> {
    if b1.len() != b2.len() || b1.len() < 2 {
        return Err(PoseError::InvalidInput {
            required: 2,
            actual: b1.len().min(b2.len()),
        });
    }

    let mut h = [[0.0; 3]; 3];
    for (p, q) in b1.iter().zip(b2.iter()) {
        for i in 0..3 {
            for j in 0..3 {
                h[i][j] += p[i] * q[j];
            }
        }
    }

    let (u, s, v) = linalg::svd3(&h);
    if s[1] <= 1e-12 {
        return Err(PoseError::Degenerate("parallel bearings"));
    }

    let ut = linalg::mat33_transpose(&u);
    let d = linalg::det_mat33(&linalg::mat33_mul(&v, &ut)).signum();
    let mut vd = v;
    vd.iter_mut().for_each(|row| row[2] *= d);
    Ok(linalg::mat33_mul(&vd, &ut))
}

/// Angular residual `1 - cos(angle)` between `R * b1` and `b2`.
pub fn rotation_error(r: &[[f64; 3]; 3], b1: &[f64; 3], b2: &[f64; 3]) -> f64 {
    1.0 - linalg::dot_product3(&linalg::mat33_mul_vec3(r, b1), b2)
}

/// Estimate a rotation-only motion between unit bearings with RANSAC.
///
/// `threshold` is an angle in radians; a bearing pair is an inlier when the angle
/// between `R * b1` and `b2` does not exceed it.
pub fn ransac_rotation(
    b1: &[[f64; 3]],
    b2: &[[f64; 3]],
    threshold: f64,
    params: &RansacParams,
) -> Result<RansacResult<[[f64; 3]; 3]>, PoseError> {
    if b1.len() != b2.len() || b1.len() < 2 {
        return Err(PoseError::InvalidInput {
            required: 2,
            actual: b1.len().min(b2.len()),
        });
    }

    let max_error = 1.0 - threshold.cos();
    let fit = |idx: &[usize]| {
        let s1: Vec<_> = idx.iter().map(|&i| b1[i]).collect();
        let s2: Vec<_> = idx.iter().map(|&i| b2[i]).collect();
        fit_rotation(&s1, &s2).ok()
    };
    let error = |r: &[[f64; 3]; 3], i: usize| rotation_error(r, &b1[i], &b2[i]);

    run_ransac(b1.len(), 2, params, max_error, fit, error)
}

/// Estimate an essential matrix between normalized image coordinates with RANSAC.
///
/// `threshold` bounds the Sampson distance in normalized coordinates, so for small
/// errors it is an angle in radians.
pub fn ransac_essential(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    threshold: f64,
    params: &RansacParams,
) -> Result<RansacResult<[[f64; 3]; 3]>, PoseError> {
    if x1.len() != x2.len() || x1.len() < 8 {
        return Err(PoseError::InvalidInput {
            required: 8,
            actual: x1.len().min(x2.len()),
        });
    }

    let fit = |idx: &[usize]| {
        let s1: Vec<_> = idx.iter().map(|&i| x1[i]).collect();
        let s2: Vec<_> = idx.iter().map(|&i| x2[i]).collect();
        fundamental_8point(&s1, &s2)
            .ok()
            .map(|e| enforce_essential_constraints(&e))
    };
    let error = |e: &[[f64; 3]; 3], i: usize| sampson_distance(e, &x1[i], &x2[i]);

    run_ransac(x1.len(), 8, params, threshold * threshold, fit, error)
}

fn run_ransac<F, E>(
    n: usize,
    sample_size: usize,
    params: &RansacParams,
    max_error: f64,
    fit: F,
    error: E,
) -> Result<RansacResult<[[f64; 3]; 3]>, PoseError>
where
    F: Fn(&[usize]) -> Option<[[f64; 3]; 3]>,
    E: Fn(&[[f64; 3]; 3], usize) -> f64,
{
    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    };

    let evaluate = |model: &[[f64; 3]; 3]| {
        let mut inliers = vec![false; n];
        let mut count = 0usize;
        let mut score = 0.0f64;
        for (i, inlier) in inliers.iter_mut().enumerate() {
            let d = error(model, i);
            if d <= max_error {
                *inlier = true;
                count += 1;
                score += d;
            }
        }
        (inliers, count, score)
    };

    let mut best: Option<RansacResult<[[f64; 3]; 3]>> = None;

    for iteration in 0..params.max_iterations {
        let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
        let Some(model) = fit(&sample) else {
            continue;
        };

        let (inliers, count, score) = evaluate(&model);
        let improves = match &best {
            Some(b) => count > b.inlier_count || (count == b.inlier_count && score < b.score),
            None => true,
        };
        if improves {
            log::trace!("ransac iteration {iteration}: {count}/{n} inliers");
            best = Some(RansacResult {
                model,
                inliers,
                inlier_count: count,
                score,
            });
        }
        if count == n {
            break;
        }
    }

    let mut best = match best {
        Some(b) if b.inlier_count >= params.min_inliers.max(sample_size) => b,
        _ => return Err(PoseError::RansacFailure),
    };

    // refit on the consensus set and keep it when it does not lose support
    let support: Vec<usize> = (0..n).filter(|&i| best.inliers[i]).collect();
    if let Some(refined) = fit(&support) {
        let (inliers, count, score) = evaluate(&refined);
        if count >= best.inlier_count {
            best = RansacResult {
                model: refined,
                inliers,
                inlier_count: count,
                score,
            };
        }
    }

    Ok(best)
}
