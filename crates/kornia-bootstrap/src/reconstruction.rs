//! Output of a bootstrap reconstruction and the interface of the solver producing it.

use std::collections::BTreeMap;

use crate::camera::CameraModel;
use crate::frame::FrameId;
use crate::linalg;
use crate::track_graph::{TrackGraph, TrackGraphError, TrackId};

/// Rigid world-to-camera transform: `X_cam = rotation * X_world + translation`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pose {
    /// Rotation matrix.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: linalg::IDENTITY_MAT33,
            translation: [0.0; 3],
        }
    }

    /// Map a world point into the camera frame.
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        let p = linalg::mat33_mul_vec3(&self.rotation, point);
        [
            p[0] + self.translation[0],
            p[1] + self.translation[1],
            p[2] + self.translation[2],
        ]
    }

    /// Camera center in world coordinates, `-R^T t`.
    pub fn origin(&self) -> [f64; 3] {
        let rt = linalg::mat33_transpose(&self.rotation);
        let c = linalg::mat33_mul_vec3(&rt, &self.translation);
        [-c[0], -c[1], -c[2]]
    }
}

/// A reconstructed camera.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shot {
    /// Frame the shot was taken from.
    pub frame: FrameId,
    /// Name of the camera model used.
    pub camera: String,
    /// World-to-camera pose.
    pub pose: Pose,
}

/// A reconstructed 3D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Landmark {
    /// Track that produced the point.
    pub track: TrackId,
    /// Position in world coordinates.
    pub position: [f64; 3],
    /// Color `(r, g, b)`.
    pub color: [f64; 3],
}

/// An initial map: camera models, shots and landmarks.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Reconstruction {
    /// Camera models by name.
    pub cameras: BTreeMap<String, CameraModel>,
    /// Shots by frame.
    pub shots: BTreeMap<FrameId, Shot>,
    /// Landmarks by track.
    pub points: BTreeMap<TrackId, Landmark>,
}

impl Reconstruction {
    /// Pose of a frame, if reconstructed.
    pub fn pose(&self, frame: &FrameId) -> Option<&Pose> {
        self.shots.get(frame).map(|shot| &shot.pose)
    }
}

/// Diagnostics of a bootstrap attempt.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BootstrapReport {
    /// The frame pair.
    pub image_pair: (FrameId, FrameId),
    /// Name of the algorithm that ran.
    pub method: String,
    /// Number of candidate correspondences.
    pub num_candidates: usize,
    /// Relative pose inliers.
    pub num_inliers: usize,
    /// Triangulated points kept in the reconstruction.
    pub num_triangulated: usize,
    /// Human readable outcome.
    pub decision: String,
    /// Wall-clock time in seconds.
    pub wall_time: f64,
}

/// What a bootstrap reconstructor returns.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapOutcome {
    /// The reconstruction, `None` when the geometry is insufficient.
    pub reconstruction: Option<Reconstruction>,
    /// The part of the input graph used by the reconstruction.
    pub inlier_graph: TrackGraph,
    /// Diagnostics.
    pub report: BootstrapReport,
}

/// Errors raised by a bootstrap reconstructor.
///
/// Insufficient geometry is not an error; it is a [`BootstrapOutcome`] without
/// reconstruction.
#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    /// Point arrays do not match each other or the track graph.
    #[error("Point arrays of length {points_a} and {points_b} do not match {tracks} tracks")]
    MismatchedInput {
        /// Length of the reference point array.
        points_a: usize,
        /// Length of the candidate point array.
        points_b: usize,
        /// Tracks in the graph.
        tracks: usize,
    },
    /// A frame of the pair is missing from the graph.
    #[error(transparent)]
    TrackGraph(#[from] TrackGraphError),
    /// Error raised by an external solver.
    #[error("Solver error: {0}")]
    Solver(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Two-view pose and structure solver run on an accepted frame pair.
pub trait BootstrapReconstructor: Send + Sync {
    /// Reconstruct the pair `(frame_a, frame_b)`.
    ///
    /// `points_a[i]` and `points_b[i]` are the pixels of track `i` in each frame.
    fn bootstrap_reconstruction(
        &self,
        graph: &TrackGraph,
        frame_a: &FrameId,
        frame_b: &FrameId,
        camera: (&str, &CameraModel),
        points_a: &[[f64; 2]],
        points_b: &[[f64; 2]],
    ) -> Result<BootstrapOutcome, BootstrapError>;
}
