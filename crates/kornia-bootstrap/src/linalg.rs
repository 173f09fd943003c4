//! Small fixed-size linear algebra helpers on row-major `[[f64; 3]; 3]` arrays.
//!
//! Decompositions are delegated to `faer`; everything else is plain array arithmetic.

/// 3x3 identity matrix.
pub const IDENTITY_MAT33: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Dot product of two 3-vectors.
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3-vectors.
pub fn cross_vec3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean norm of a 3-vector.
pub fn norm_vec3(a: &[f64; 3]) -> f64 {
    dot_product3(a, a).sqrt()
}

/// Scale a 3-vector to unit length. Returns `None` for (near) zero vectors.
pub fn normalize_vec3(a: &[f64; 3]) -> Option<[f64; 3]> {
    let n = norm_vec3(a);
    if n <= 1e-12 {
        return None;
    }
    Some([a[0] / n, a[1] / n, a[2] / n])
}

/// Angle in radians between two 3-vectors, `None` if either is zero.
pub fn angle_between_vec3(a: &[f64; 3], b: &[f64; 3]) -> Option<f64> {
    let a = normalize_vec3(a)?;
    let b = normalize_vec3(b)?;
    Some(dot_product3(&a, &b).clamp(-1.0, 1.0).acos())
}

/// Matrix product `a * b`.
pub fn mat33_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Matrix-vector product `m * v`.
pub fn mat33_mul_vec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        dot_product3(&m[0], v),
        dot_product3(&m[1], v),
        dot_product3(&m[2], v),
    ]
}

/// Transpose of a 3x3 matrix.
pub fn mat33_transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            out[j][i] = *val;
        }
    }
    out
}

/// Determinant of a 3x3 matrix.
pub fn det_mat33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Skew-symmetric matrix `[t]_x` such that `[t]_x * v = t x v`.
pub fn skew_mat33(t: &[f64; 3]) -> [[f64; 3]; 3] {
    [[0.0, -t[2], t[1]], [t[2], 0.0, -t[0]], [-t[1], t[0], 0.0]]
}

/// Singular value decomposition of a 3x3 matrix.
///
/// Returns `(u, s, v)` with `m = u * diag(s) * v^T` and `s` sorted in decreasing order.
pub fn svd3(m: &[[f64; 3]; 3]) -> ([[f64; 3]; 3], [f64; 3], [[f64; 3]; 3]) {
    let mut a = faer::Mat::<f64>::zeros(3, 3);
    for (i, row) in m.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            a.write(i, j, *val);
        }
    }

    let svd = a.svd();
    let (u_mat, v_mat, s_diag) = (svd.u(), svd.v(), svd.s_diagonal());

    let mut u = [[0.0; 3]; 3];
    let mut v = [[0.0; 3]; 3];
    let mut s = [0.0; 3];
    for i in 0..3 {
        s[i] = s_diag.read(i);
        for j in 0..3 {
            u[i][j] = u_mat.read(i, j);
            v[i][j] = v_mat.read(i, j);
        }
    }
    (u, s, v)
}

/// Compose `u * diag(s) * v^T`.
pub fn compose_svd3(u: &[[f64; 3]; 3], s: &[f64; 3], v: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut us = *u;
    for row in us.iter_mut() {
        for (j, val) in row.iter_mut().enumerate() {
            *val *= s[j];
        }
    }
    mat33_mul(&us, &mat33_transpose(v))
}

/// Right null vector of a tall (or square) matrix: the right singular vector of the
/// smallest singular value.
pub(crate) fn smallest_right_singular_vector(a: &faer::Mat<f64>) -> Vec<f64> {
    let svd = a.svd();
    let v = svd.v();
    let last = v.ncols() - 1;
    (0..v.nrows()).map(|i| v.read(i, last)).collect()
}
