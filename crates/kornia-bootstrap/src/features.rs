use crate::correspondence::CorrespondenceError;

/// Per-frame feature storage as produced by the feature extractor.
///
/// Row `i` of every field describes feature `i` of the frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    /// Keypoints as `(x, y, scale)` in pixels.
    pub points: Vec<[f64; 3]>,
    /// Descriptor vectors, one per keypoint.
    pub descriptors: Vec<Vec<f32>>,
    /// Keypoint colors as `(r, g, b)`.
    pub colors: Vec<[f64; 3]>,
}

impl FeatureSet {
    /// Create a feature set, checking that all fields have one row per keypoint.
    pub fn new(
        points: Vec<[f64; 3]>,
        descriptors: Vec<Vec<f32>>,
        colors: Vec<[f64; 3]>,
    ) -> Result<Self, CorrespondenceError> {
        let features = Self {
            points,
            descriptors,
            colors,
        };
        features.validate()?;
        Ok(features)
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the frame has no features.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Check that descriptors and colors are aligned with the keypoints.
    pub fn validate(&self) -> Result<(), CorrespondenceError> {
        let n = self.points.len();
        if self.descriptors.len() != n || self.colors.len() != n {
            return Err(CorrespondenceError::RaggedFeatures {
                points: n,
                descriptors: self.descriptors.len(),
                colors: self.colors.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_ragged() {
        let res = FeatureSet::new(vec![[0.0, 0.0, 1.0]], vec![], vec![[0.0; 3]]);
        assert!(matches!(
            res,
            Err(CorrespondenceError::RaggedFeatures {
                points: 1,
                descriptors: 0,
                colors: 1
            })
        ));
    }

    #[test]
    fn test_feature_set_empty() -> Result<(), CorrespondenceError> {
        let features = FeatureSet::new(vec![], vec![], vec![])?;
        assert!(features.is_empty());
        assert_eq!(features.len(), 0);
        Ok(())
    }
}
