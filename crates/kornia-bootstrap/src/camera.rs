use std::collections::BTreeMap;

use crate::provider::ProviderError;

/// Number of fixed-point iterations used to invert the radial distortion.
const UNDISTORT_ITERATIONS: usize = 10;

/// A perspective camera with two-coefficient radial distortion.
///
/// Pixel coordinates follow the usual convention: `u = fx * xd + cx`, `v = fy * yd + cy`,
/// where `(xd, yd)` are the distorted normalized coordinates
/// `(x, y) * (1 + k1 * r^2 + k2 * r^4)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraModel {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
    /// Second order radial distortion coefficient.
    #[serde(default)]
    pub k1: f64,
    /// Fourth order radial distortion coefficient.
    #[serde(default)]
    pub k2: f64,
}

impl CameraModel {
    /// Create an undistorted pinhole camera.
    pub fn pinhole(width: u32, height: u32, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
            k1: 0.0,
            k2: 0.0,
        }
    }

    /// Undistorted normalized image coordinates of a pixel.
    pub fn pixel_to_normalized(&self, pixel: &[f64; 2]) -> [f64; 2] {
        let xd = (pixel[0] - self.cx) / self.fx;
        let yd = (pixel[1] - self.cy) / self.fy;
        if self.k1 == 0.0 && self.k2 == 0.0 {
            return [xd, yd];
        }

        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let d = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
            x = xd / d;
            y = yd / d;
        }
        [x, y]
    }

    /// Unit bearing vector of a pixel in the camera frame.
    pub fn pixel_bearing(&self, pixel: &[f64; 2]) -> [f64; 3] {
        let [x, y] = self.pixel_to_normalized(pixel);
        let l = (x * x + y * y + 1.0).sqrt();
        [x / l, y / l, 1.0 / l]
    }

    /// Unit bearing vectors for a set of pixels.
    pub fn pixel_bearing_many(&self, pixels: &[[f64; 2]]) -> Vec<[f64; 3]> {
        pixels.iter().map(|p| self.pixel_bearing(p)).collect()
    }

    /// Project a point expressed in the camera frame to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, point: &[f64; 3]) -> Option<[f64; 2]> {
        if point[2] <= 1e-12 {
            return None;
        }
        let x = point[0] / point[2];
        let y = point[1] / point[2];
        let r2 = x * x + y * y;
        let d = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        Some([self.fx * d * x + self.cx, self.fy * d * y + self.cy])
    }
}

/// Policy used to pick the single camera model shared by both frames of a pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSelection {
    /// The first camera in lexicographic name order.
    #[default]
    First,
    /// The camera registered under the given name.
    Named(String),
}

impl CameraSelection {
    /// Pick a camera from the registry according to the policy.
    pub fn select<'a>(
        &self,
        cameras: &'a BTreeMap<String, CameraModel>,
    ) -> Result<(&'a str, &'a CameraModel), ProviderError> {
        match self {
            CameraSelection::First => cameras
                .iter()
                .next()
                .map(|(name, camera)| (name.as_str(), camera))
                .ok_or(ProviderError::NoCameraModels),
            CameraSelection::Named(name) => cameras
                .get_key_value(name)
                .map(|(name, camera)| (name.as_str(), camera))
                .ok_or_else(|| ProviderError::UnknownCamera(name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg;
    use approx::assert_relative_eq;

    fn camera() -> CameraModel {
        CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0)
    }

    #[test]
    fn test_principal_point_bearing() {
        let b = camera().pixel_bearing(&[320.0, 240.0]);
        assert_relative_eq!(b[0], 0.0);
        assert_relative_eq!(b[1], 0.0);
        assert_relative_eq!(b[2], 1.0);
    }

    #[test]
    fn test_project_then_bearing() {
        let mut cam = camera();
        cam.k1 = -0.05;
        cam.k2 = 0.01;
        let point = [0.3, -0.2, 2.0];
        let pixel = cam.project(&point).unwrap();
        let err = linalg::angle_between_vec3(&cam.pixel_bearing(&pixel), &point).unwrap();
        assert!(err < 1e-6, "angular error {err}");
    }

    #[test]
    fn test_project_behind_camera() {
        assert!(camera().project(&[0.0, 0.0, -1.0]).is_none());
    }

    #[test]
    fn test_camera_selection() {
        let mut cameras = BTreeMap::new();
        cameras.insert("b".to_string(), camera());
        cameras.insert("a".to_string(), CameraModel::pinhole(10, 10, 1.0, 1.0, 5.0, 5.0));

        let (name, cam) = CameraSelection::First.select(&cameras).unwrap();
        assert_eq!(name, "a");
        assert_eq!(cam.width, 10);

        let (name, _) = CameraSelection::Named("b".into()).select(&cameras).unwrap();
        assert_eq!(name, "b");

        assert!(matches!(
            CameraSelection::Named("c".into()).select(&cameras),
            Err(ProviderError::UnknownCamera(_))
        ));
        assert!(matches!(
            CameraSelection::First.select(&BTreeMap::new()),
            Err(ProviderError::NoCameraModels)
        ));
    }
}
