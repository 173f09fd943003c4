use crate::camera::CameraSelection;
use crate::config::{
    InitializerConfig, DEFAULT_FIVE_POINT_ALGO_THRESHOLD,
    DEFAULT_RECONSTRUCTABILITY_THRESHOLD_SCALE,
};
use crate::correspondence::CorrespondenceSet;
use crate::error::InitializerError;
use crate::frame::FrameId;
use crate::reconstructability::{ReconstructabilityScorer, RotationOnlyScorer};
use crate::track_graph::TrackGraph;

use super::{InitContext, InitMethod, InitOutcome, InitializationStrategy};

/// Two-view geometric initialization.
///
/// Matches the pair, rejects it when its motion is explained by a pure rotation, builds the
/// two-view track graph and hands it to the bootstrap reconstructor.
pub struct TwoViewGeometric {
    five_point_algo_threshold: f64,
    threshold_scale: f64,
    camera_selection: CameraSelection,
    scorer: Box<dyn ReconstructabilityScorer>,
}

impl Default for TwoViewGeometric {
    fn default() -> Self {
        Self {
            five_point_algo_threshold: DEFAULT_FIVE_POINT_ALGO_THRESHOLD,
            threshold_scale: DEFAULT_RECONSTRUCTABILITY_THRESHOLD_SCALE,
            camera_selection: CameraSelection::default(),
            scorer: Box::new(RotationOnlyScorer::default()),
        }
    }
}

impl TwoViewGeometric {
    /// Create the strategy from a configuration, scoring pairs with a [`RotationOnlyScorer`].
    pub fn new(config: &InitializerConfig) -> Self {
        Self {
            five_point_algo_threshold: config.five_point_algo_threshold,
            threshold_scale: config.reconstructability_threshold_scale,
            camera_selection: config.camera_selection.clone(),
            scorer: Box::new(RotationOnlyScorer::new(config.reconstructability_params())),
        }
    }

    /// Replace the reconstructability scorer.
    pub fn with_scorer(mut self, scorer: Box<dyn ReconstructabilityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Threshold passed to the scorer.
    pub fn reconstructability_threshold(&self) -> f64 {
        self.threshold_scale * self.five_point_algo_threshold
    }
}

impl InitializationStrategy for TwoViewGeometric {
    fn method(&self) -> InitMethod {
        InitMethod::TwoViewGeometric
    }

    fn attempt(
        &self,
        reference: &FrameId,
        candidate: &FrameId,
        context: &InitContext<'_>,
    ) -> Result<InitOutcome, InitializerError> {
        let features_a = context.features.load_features(reference)?;
        let features_b = context.features.load_features(candidate)?;
        let cameras = context.cameras.load_camera_models()?;
        let (camera_name, camera) = self.camera_selection.select(&cameras)?;

        let matched = context.matcher.match_frames(reference, candidate, camera)?;
        let Some(matches) = matched.into_pairs(candidate) else {
            log::debug!("{reference}-{candidate}: matching failed");
            return Ok(InitOutcome::rejected());
        };

        let correspondences = CorrespondenceSet::from_matches(&features_a, &features_b, &matches)?;
        let pixels_a = correspondences.pixels_a();
        let pixels_b = correspondences.pixels_b();

        let threshold = self.reconstructability_threshold();
        let score = self
            .scorer
            .score(&pixels_a, &pixels_b, camera, camera, threshold);
        log::debug!(
            "{reference}-{candidate}: {} matches, reconstructability {}",
            correspondences.len(),
            score.score
        );
        if !score.is_reconstructable() {
            log::debug!("{reference}-{candidate}: not reconstructable");
            return Ok(InitOutcome {
                score: Some(score),
                ..InitOutcome::rejected()
            });
        }

        let graph = TrackGraph::from_correspondences(reference, candidate, &correspondences)?;
        let bootstrap = context.reconstructor.bootstrap_reconstruction(
            &graph,
            reference,
            candidate,
            (camera_name, camera),
            &pixels_a,
            &pixels_b,
        )?;
        log::debug!(
            "{reference}-{candidate}: {} ({} points)",
            bootstrap.report.decision,
            bootstrap.report.num_triangulated
        );

        Ok(InitOutcome {
            reconstruction: bootstrap.reconstruction,
            inlier_graph: Some(bootstrap.inlier_graph),
            matches: Some(correspondences.matches),
            report: Some(bootstrap.report),
            score: Some(score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reconstructability_threshold() {
        assert_relative_eq!(
            TwoViewGeometric::default().reconstructability_threshold(),
            0.016
        );

        let config = InitializerConfig {
            five_point_algo_threshold: 0.006,
            reconstructability_threshold_scale: 2.0,
            ..Default::default()
        };
        assert_relative_eq!(
            TwoViewGeometric::new(&config).reconstructability_threshold(),
            0.012
        );
    }
}
