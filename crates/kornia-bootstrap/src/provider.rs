//! Interfaces of the data sources consumed by the initializer: feature storage, camera
//! registry and pairwise matcher.

use std::collections::{BTreeMap, HashMap};

use crate::camera::CameraModel;
use crate::features::FeatureSet;
use crate::frame::FrameId;

/// Boxed error returned by a backend implementation.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by feature storage, camera registries and matchers.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// No features are stored for the frame.
    #[error("No features stored for frame {0}")]
    MissingFeatures(FrameId),
    /// The camera registry is empty.
    #[error("No camera models available")]
    NoCameraModels,
    /// The requested camera is not registered.
    #[error("Camera model `{0}` not found")]
    UnknownCamera(String),
    /// Error raised by the backing store.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Read access to per-frame feature storage.
pub trait FeatureStore: Send + Sync {
    /// Load keypoints, descriptors and colors of a frame.
    fn load_features(&self, frame: &FrameId) -> Result<FeatureSet, ProviderError>;
}

/// Read access to the calibrated camera models.
pub trait CameraModelRegistry: Send + Sync {
    /// All camera models by name.
    fn load_camera_models(&self) -> Result<BTreeMap<String, CameraModel>, ProviderError>;
}

/// Feature index pairs `(index_a, index_b)` keyed by the frame they were matched against.
pub type FrameMatches = HashMap<FrameId, Vec<[usize; 2]>>;

/// Outcome of a pairwise matching request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// Whether the matcher considers the pair matched.
    pub success: bool,
    /// Matches keyed by the second frame of the request.
    pub matches: FrameMatches,
}

impl MatchResult {
    /// A successful match of `frame` with the given index pairs.
    pub fn matched(frame: FrameId, pairs: Vec<[usize; 2]>) -> Self {
        Self {
            success: true,
            matches: HashMap::from([(frame, pairs)]),
        }
    }

    /// A failed match.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Take the pairs matched against `frame`, if the match succeeded.
    pub fn into_pairs(mut self, frame: &FrameId) -> Option<Vec<[usize; 2]>> {
        if !self.success {
            return None;
        }
        self.matches.remove(frame)
    }
}

/// Pairwise feature matcher.
pub trait FrameMatcher: Send + Sync {
    /// Match the features of `frame_a` against `frame_b`.
    ///
    /// A failed match is reported through [`MatchResult::success`]; `Err` is reserved for
    /// backend failures.
    fn match_frames(
        &self,
        frame_a: &FrameId,
        frame_b: &FrameId,
        camera: &CameraModel,
    ) -> Result<MatchResult, ProviderError>;
}

/// Feature storage and camera registry held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    features: HashMap<FrameId, FeatureSet>,
    cameras: BTreeMap<String, CameraModel>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the features of a frame, replacing previous ones.
    pub fn insert_features(&mut self, frame: impl Into<FrameId>, features: FeatureSet) {
        self.features.insert(frame.into(), features);
    }

    /// Register a camera model under `name`.
    pub fn insert_camera(&mut self, name: impl Into<String>, camera: CameraModel) {
        self.cameras.insert(name.into(), camera);
    }
}

impl FeatureStore for InMemoryStore {
    fn load_features(&self, frame: &FrameId) -> Result<FeatureSet, ProviderError> {
        self.features
            .get(frame)
            .cloned()
            .ok_or_else(|| ProviderError::MissingFeatures(frame.clone()))
    }
}

impl CameraModelRegistry for InMemoryStore {
    fn load_camera_models(&self) -> Result<BTreeMap<String, CameraModel>, ProviderError> {
        Ok(self.cameras.clone())
    }
}

/// Matcher replaying precomputed matches.
///
/// Pairs are looked up in both orders; a reversed hit has its index pairs swapped. Pairs
/// with no entry are reported as failed matches.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedMatcher {
    pairs: HashMap<(FrameId, FrameId), Vec<[usize; 2]>>,
}

impl PrecomputedMatcher {
    /// Create a matcher with no known pairs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the matches between `frame_a` and `frame_b`.
    pub fn insert(
        &mut self,
        frame_a: impl Into<FrameId>,
        frame_b: impl Into<FrameId>,
        pairs: Vec<[usize; 2]>,
    ) {
        self.pairs.insert((frame_a.into(), frame_b.into()), pairs);
    }
}

impl FrameMatcher for PrecomputedMatcher {
    fn match_frames(
        &self,
        frame_a: &FrameId,
        frame_b: &FrameId,
        _camera: &CameraModel,
    ) -> Result<MatchResult, ProviderError> {
        let key = (frame_a.clone(), frame_b.clone());
        if let Some(pairs) = self.pairs.get(&key) {
            return Ok(MatchResult::matched(frame_b.clone(), pairs.clone()));
        }
        let reversed = (frame_b.clone(), frame_a.clone());
        if let Some(pairs) = self.pairs.get(&reversed) {
            let swapped = pairs.iter().map(|&[a, b]| [b, a]).collect();
            return Ok(MatchResult::matched(frame_b.clone(), swapped));
        }
        Ok(MatchResult::failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_result_into_pairs() {
        let f1 = FrameId::from("F1");
        let res = MatchResult::matched(f1.clone(), vec![[0, 1]]);
        assert_eq!(res.clone().into_pairs(&f1), Some(vec![[0, 1]]));
        assert_eq!(res.into_pairs(&FrameId::from("F2")), None);

        let mut failed = MatchResult::matched(f1.clone(), vec![[0, 1]]);
        failed.success = false;
        assert_eq!(failed.into_pairs(&f1), None);
    }

    #[test]
    fn test_precomputed_matcher_reversed_lookup() -> Result<(), ProviderError> {
        let camera = CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0);
        let mut matcher = PrecomputedMatcher::new();
        matcher.insert("F0", "F1", vec![[3, 7]]);

        let (f0, f1, f2) = (FrameId::from("F0"), FrameId::from("F1"), FrameId::from("F2"));
        let res = matcher.match_frames(&f1, &f0, &camera)?;
        assert_eq!(res.into_pairs(&f0), Some(vec![[7, 3]]));
        assert!(!matcher.match_frames(&f0, &f2, &camera)?.success);
        Ok(())
    }

    #[test]
    fn test_in_memory_store_missing_frame() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.load_features(&FrameId::from("F9")),
            Err(ProviderError::MissingFeatures(_))
        ));
        assert!(store.load_camera_models().unwrap().is_empty());
    }
}
