//! Initialization algorithms and the data they run on.

mod two_view;

pub use two_view::TwoViewGeometric;

use std::fmt;

use crate::error::InitializerError;
use crate::frame::FrameId;
use crate::provider::{CameraModelRegistry, FeatureStore, FrameMatcher};
use crate::reconstructability::ReconstructabilityScore;
use crate::reconstruction::{BootstrapReconstructor, BootstrapReport, Reconstruction};
use crate::track_graph::TrackGraph;

/// Enumeration of the initialization algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    /// Reconstructability test followed by a two-view bootstrap.
    #[default]
    TwoViewGeometric,
    /// Homography and fundamental model selection.
    OrbStyle,
    /// Joint point and line initialization.
    LinePointHybrid,
}

impl InitMethod {
    /// Name of the method as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            InitMethod::TwoViewGeometric => "two_view_geometric",
            InitMethod::OrbStyle => "orb_style",
            InitMethod::LinePointHybrid => "line_point_hybrid",
        }
    }
}

impl fmt::Display for InitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data sources and solver an initialization attempt runs on.
///
/// The reconstructor is not configured by the initializer. Build it from
/// [`InitializerConfig::reconstructor_config`](crate::config::InitializerConfig::reconstructor_config)
/// of the same config so both sides use the same thresholds.
#[derive(Clone, Copy)]
pub struct InitContext<'a> {
    /// Per-frame features.
    pub features: &'a dyn FeatureStore,
    /// Calibrated cameras.
    pub cameras: &'a dyn CameraModelRegistry,
    /// Pairwise matcher.
    pub matcher: &'a dyn FrameMatcher,
    /// Two-view solver run on accepted pairs.
    pub reconstructor: &'a dyn BootstrapReconstructor,
}

impl<'a> InitContext<'a> {
    /// Bundle the data sources of an attempt.
    pub fn new(
        features: &'a dyn FeatureStore,
        cameras: &'a dyn CameraModelRegistry,
        matcher: &'a dyn FrameMatcher,
        reconstructor: &'a dyn BootstrapReconstructor,
    ) -> Self {
        Self {
            features,
            cameras,
            matcher,
            reconstructor,
        }
    }
}

/// Result of an initialization attempt.
///
/// A rejected pair has no reconstruction, graph nor matches. When the bootstrap
/// reconstructor runs but finds the geometry insufficient, `reconstruction` is `None`
/// while the graph and matches are still reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitOutcome {
    /// The initial map.
    pub reconstruction: Option<Reconstruction>,
    /// Tracks used by the reconstruction and their observations.
    pub inlier_graph: Option<TrackGraph>,
    /// Feature index pairs between the reference and the candidate frame.
    pub matches: Option<Vec<[usize; 2]>>,
    /// Diagnostics of the bootstrap reconstructor.
    pub report: Option<BootstrapReport>,
    /// Reconstructability of the pair, when it was computed.
    pub score: Option<ReconstructabilityScore>,
}

impl InitOutcome {
    /// An outcome rejecting the pair.
    pub fn rejected() -> Self {
        Self::default()
    }

    /// Whether the pair was rejected before reconstruction.
    pub fn is_rejected(&self) -> bool {
        self.reconstruction.is_none() && self.inlier_graph.is_none() && self.matches.is_none()
    }

    /// Whether an initial map was produced.
    pub fn is_initialized(&self) -> bool {
        self.reconstruction.is_some()
    }

    /// Split into `(reconstruction, inlier_graph, matches)`.
    pub fn into_parts(
        self,
    ) -> (
        Option<Reconstruction>,
        Option<TrackGraph>,
        Option<Vec<[usize; 2]>>,
    ) {
        (self.reconstruction, self.inlier_graph, self.matches)
    }
}

/// An initialization algorithm.
pub trait InitializationStrategy: Send + Sync {
    /// The method implemented.
    fn method(&self) -> InitMethod;

    /// Try to initialize a map from the `reference` and `candidate` frames.
    fn attempt(
        &self,
        reference: &FrameId,
        candidate: &FrameId,
        context: &InitContext<'_>,
    ) -> Result<InitOutcome, InitializerError>;
}

/// Homography and fundamental model selection. Not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrbStyle;

impl InitializationStrategy for OrbStyle {
    fn method(&self) -> InitMethod {
        InitMethod::OrbStyle
    }

    fn attempt(
        &self,
        _reference: &FrameId,
        _candidate: &FrameId,
        _context: &InitContext<'_>,
    ) -> Result<InitOutcome, InitializerError> {
        Err(InitializerError::NotImplemented {
            method: self.method(),
        })
    }
}

/// Joint point and line initialization. Not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinePointHybrid;

impl InitializationStrategy for LinePointHybrid {
    fn method(&self) -> InitMethod {
        InitMethod::LinePointHybrid
    }

    fn attempt(
        &self,
        _reference: &FrameId,
        _candidate: &FrameId,
        _context: &InitContext<'_>,
    ) -> Result<InitOutcome, InitializerError> {
        Err(InitializerError::NotImplemented {
            method: self.method(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_method_serde() -> Result<(), serde_json::Error> {
        for method in [
            InitMethod::TwoViewGeometric,
            InitMethod::OrbStyle,
            InitMethod::LinePointHybrid,
        ] {
            let json = serde_json::to_string(&method)?;
            assert_eq!(json, format!("\"{method}\""));
            assert_eq!(serde_json::from_str::<InitMethod>(&json)?, method);
        }
        assert!(serde_json::from_str::<InitMethod>("\"homography\"").is_err());
        Ok(())
    }

    #[test]
    fn test_rejected_outcome() {
        let outcome = InitOutcome::rejected();
        assert!(outcome.is_rejected());
        assert!(!outcome.is_initialized());
        assert_eq!(outcome.into_parts(), (None, None, None));
    }
}
