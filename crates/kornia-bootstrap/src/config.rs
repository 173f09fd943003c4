use std::path::Path;

use crate::camera::CameraSelection;
use crate::pose::RansacParams;
use crate::reconstructability::{ReconstructabilityParams, DEFAULT_MIN_OUTLIER_RATIO};
use crate::strategy::InitMethod;
use crate::twoview::TwoViewReconstructorConfig;

/// Default relative pose inlier threshold, an angle in radians.
pub const DEFAULT_FIVE_POINT_ALGO_THRESHOLD: f64 = 0.004;

/// Default factor between the relative pose threshold and the reconstructability threshold.
///
/// The rotation-only test runs before any pose is known, so it uses a wider tolerance than
/// the relative pose solve.
pub const DEFAULT_RECONSTRUCTABILITY_THRESHOLD_SCALE: f64 = 4.0;

/// Errors raised while loading or validating a configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid JSON for [`InitializerConfig`].
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// A numeric option is out of range.
    #[error("Invalid value {value} for `{field}`")]
    Invalid {
        /// Name of the option.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}

/// Configuration of the initializer.
///
/// Option names follow the reconstruction pipeline configuration. Missing options take
/// their default value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InitializerConfig {
    /// Initialization algorithm.
    pub method: InitMethod,
    /// How the camera shared by both frames is chosen.
    pub camera_selection: CameraSelection,
    /// Relative pose inlier threshold, an angle in radians.
    pub five_point_algo_threshold: f64,
    /// Minimum number of triangulated points of a successful bootstrap.
    pub five_point_algo_min_inliers: usize,
    /// Factor applied to `five_point_algo_threshold` for the reconstructability test.
    pub reconstructability_threshold_scale: f64,
    /// Minimum ratio of rotation outliers for a pair to be reconstructable.
    pub min_outlier_ratio: f64,
    /// Maximum angular reprojection error of a triangulated point, in radians.
    pub triangulation_threshold: f64,
    /// Minimum parallax angle (degrees) for triangulated points.
    pub min_parallax_deg: f64,
    /// RANSAC settings shared by the geometric estimators.
    pub ransac: RansacParams,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            method: InitMethod::default(),
            camera_selection: CameraSelection::default(),
            five_point_algo_threshold: DEFAULT_FIVE_POINT_ALGO_THRESHOLD,
            five_point_algo_min_inliers: 20,
            reconstructability_threshold_scale: DEFAULT_RECONSTRUCTABILITY_THRESHOLD_SCALE,
            min_outlier_ratio: DEFAULT_MIN_OUTLIER_RATIO,
            triangulation_threshold: 0.006,
            min_parallax_deg: 1.0,
            ransac: RansacParams::default(),
        }
    }
}

impl InitializerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that every numeric option is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("five_point_algo_threshold", self.five_point_algo_threshold),
            (
                "reconstructability_threshold_scale",
                self.reconstructability_threshold_scale,
            ),
            ("triangulation_threshold", self.triangulation_threshold),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.min_outlier_ratio) {
            return Err(ConfigError::Invalid {
                field: "min_outlier_ratio",
                value: self.min_outlier_ratio,
            });
        }
        if !self.min_parallax_deg.is_finite() || self.min_parallax_deg < 0.0 {
            return Err(ConfigError::Invalid {
                field: "min_parallax_deg",
                value: self.min_parallax_deg,
            });
        }
        if self.ransac.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "ransac.max_iterations",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Threshold of the reconstructability test.
    pub fn reconstructability_threshold(&self) -> f64 {
        self.reconstructability_threshold_scale * self.five_point_algo_threshold
    }

    /// Parameters of the rotation-only reconstructability test.
    pub fn reconstructability_params(&self) -> ReconstructabilityParams {
        ReconstructabilityParams {
            ransac: self.ransac,
            min_outlier_ratio: self.min_outlier_ratio,
        }
    }

    /// Configuration of the reference two-view reconstructor.
    pub fn reconstructor_config(&self) -> TwoViewReconstructorConfig {
        TwoViewReconstructorConfig {
            ransac: self.ransac,
            five_point_algo_threshold: self.five_point_algo_threshold,
            triangulation_threshold: self.triangulation_threshold,
            min_parallax_deg: self.min_parallax_deg,
            min_inliers: self.five_point_algo_min_inliers,
        }
    }
}
