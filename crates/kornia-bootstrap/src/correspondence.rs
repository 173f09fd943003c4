use std::collections::HashSet;

use crate::features::FeatureSet;

/// Side of a frame pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    /// The reference frame.
    Reference,
    /// The candidate frame.
    Candidate,
}

impl std::fmt::Display for PairSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairSide::Reference => f.write_str("reference"),
            PairSide::Candidate => f.write_str("candidate"),
        }
    }
}

/// Errors raised while assembling correspondences from feature storage.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CorrespondenceError {
    /// Feature storage fields have different lengths.
    #[error("Ragged feature storage: {points} points, {descriptors} descriptors, {colors} colors")]
    RaggedFeatures {
        /// Number of keypoints.
        points: usize,
        /// Number of descriptors.
        descriptors: usize,
        /// Number of colors.
        colors: usize,
    },
    /// A match refers to a feature that does not exist.
    #[error("Feature index {index} out of bounds for {side} frame with {len} features")]
    IndexOutOfBounds {
        /// Frame the index refers to.
        side: PairSide,
        /// Offending feature index.
        index: usize,
        /// Number of features in that frame.
        len: usize,
    },
    /// A feature is used by more than one match.
    #[error("Feature index {index} matched more than once in {side} frame")]
    DuplicateIndex {
        /// Frame the index refers to.
        side: PairSide,
        /// Offending feature index.
        index: usize,
    },
}

/// Aligned correspondences between a reference and a candidate frame.
///
/// Row `i` of every `*_a` field belongs to the reference frame feature `matches[i][0]`,
/// row `i` of every `*_b` field to the candidate frame feature `matches[i][1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrespondenceSet {
    /// Keypoints `(x, y, scale)` in the reference frame.
    pub points_a: Vec<[f64; 3]>,
    /// Keypoints `(x, y, scale)` in the candidate frame.
    pub points_b: Vec<[f64; 3]>,
    /// Descriptors in the reference frame.
    pub descriptors_a: Vec<Vec<f32>>,
    /// Descriptors in the candidate frame.
    pub descriptors_b: Vec<Vec<f32>>,
    /// Colors in the reference frame.
    pub colors_a: Vec<[f64; 3]>,
    /// Colors in the candidate frame.
    pub colors_b: Vec<[f64; 3]>,
    /// Feature index pairs `(index_a, index_b)`.
    pub matches: Vec<[usize; 2]>,
}

impl CorrespondenceSet {
    /// Reindex two frames' features by a list of matches.
    ///
    /// Fails if a match refers to a missing feature or if a feature is matched twice.
    pub fn from_matches(
        features_a: &FeatureSet,
        features_b: &FeatureSet,
        matches: &[[usize; 2]],
    ) -> Result<Self, CorrespondenceError> {
        features_a.validate()?;
        features_b.validate()?;

        let n = matches.len();
        let mut set = Self {
            points_a: Vec::with_capacity(n),
            points_b: Vec::with_capacity(n),
            descriptors_a: Vec::with_capacity(n),
            descriptors_b: Vec::with_capacity(n),
            colors_a: Vec::with_capacity(n),
            colors_b: Vec::with_capacity(n),
            matches: matches.to_vec(),
        };

        let mut seen_a = HashSet::with_capacity(n);
        let mut seen_b = HashSet::with_capacity(n);

        for &[ia, ib] in matches {
            check_index(PairSide::Reference, ia, features_a.len(), &mut seen_a)?;
            check_index(PairSide::Candidate, ib, features_b.len(), &mut seen_b)?;

            set.points_a.push(features_a.points[ia]);
            set.points_b.push(features_b.points[ib]);
            set.descriptors_a.push(features_a.descriptors[ia].clone());
            set.descriptors_b.push(features_b.descriptors[ib].clone());
            set.colors_a.push(features_a.colors[ia]);
            set.colors_b.push(features_b.colors[ib]);
        }

        Ok(set)
    }

    /// Number of correspondence rows.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether there are no correspondences.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Reference frame pixel coordinates, scale column dropped.
    pub fn pixels_a(&self) -> Vec<[f64; 2]> {
        self.points_a.iter().map(|p| [p[0], p[1]]).collect()
    }

    /// Candidate frame pixel coordinates, scale column dropped.
    pub fn pixels_b(&self) -> Vec<[f64; 2]> {
        self.points_b.iter().map(|p| [p[0], p[1]]).collect()
    }
}

fn check_index(
    side: PairSide,
    index: usize,
    len: usize,
    seen: &mut HashSet<usize>,
) -> Result<(), CorrespondenceError> {
    if index >= len {
        return Err(CorrespondenceError::IndexOutOfBounds { side, index, len });
    }
    if !seen.insert(index) {
        return Err(CorrespondenceError::DuplicateIndex { side, index });
    }
    Ok(())
}
