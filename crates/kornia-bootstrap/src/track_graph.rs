//! # Track graph
//!
//! Bipartite graph between frames and tracks. A track is a would-be 3D point; each edge
//! is the observation of that track in one frame. The graph is the handoff format between
//! the initializer and the bootstrap reconstructor.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::correspondence::CorrespondenceSet;
use crate::frame::FrameId;

/// Identifier of a track, local to one initialization attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(pub usize);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two node kinds of the bipartite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An image of the sequence.
    Frame,
    /// A track observed in one or more frames.
    Track,
}

impl NodeKind {
    /// Bipartite set index: 0 for frames, 1 for tracks.
    pub fn bipartite(&self) -> u8 {
        match self {
            NodeKind::Frame => 0,
            NodeKind::Track => 1,
        }
    }
}

/// A node of the track graph. Frame and track ids live in separate spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// A frame node.
    Frame(FrameId),
    /// A track node.
    Track(TrackId),
}

impl NodeId {
    /// Kind of the node.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeId::Frame(_) => NodeKind::Frame,
            NodeId::Track(_) => NodeKind::Track,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Frame(id) => write!(f, "frame:{id}"),
            NodeId::Track(id) => write!(f, "track:{id}"),
        }
    }
}

impl From<FrameId> for NodeId {
    fn from(id: FrameId) -> Self {
        NodeId::Frame(id)
    }
}

impl From<TrackId> for NodeId {
    fn from(id: TrackId) -> Self {
        NodeId::Track(id)
    }
}

/// Attributes of a frame-track edge: how the track was observed in the frame.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Observation {
    /// Pixel location `(x, y)`.
    pub pixel: [f64; 2],
    /// Feature scale.
    pub scale: f64,
    /// Index of the feature in the frame's feature storage.
    pub feature_id: usize,
    /// Observed color `(r, g, b)`.
    pub color: [f64; 3],
}

/// Errors raised while editing a track graph.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TrackGraphError {
    /// The frame node does not exist.
    #[error("Unknown frame node {0}")]
    UnknownFrame(FrameId),
    /// The track node does not exist.
    #[error("Unknown track node {0}")]
    UnknownTrack(TrackId),
    /// The frame already has an observation of the track.
    #[error("Frame {frame} already observes track {track}")]
    DuplicateObservation {
        /// Frame of the existing edge.
        frame: FrameId,
        /// Track of the existing edge.
        track: TrackId,
    },
    /// A two-view graph needs two distinct frames.
    #[error("Reference and candidate frames are the same frame {0}")]
    IdenticalFrames(FrameId),
}

/// Bipartite graph of frames and tracks.
///
/// Edges are stored once, keyed by frame, with a reverse index from tracks to frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackGraph {
    frames: BTreeMap<FrameId, BTreeMap<TrackId, Observation>>,
    tracks: BTreeMap<TrackId, BTreeSet<FrameId>>,
}

impl TrackGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the two-view graph of a correspondence set.
    ///
    /// Adds both frames and, for correspondence row `i`, track `i` with one edge to each
    /// frame carrying the pixel, scale, feature id and color of that side.
    pub fn from_correspondences(
        reference: &FrameId,
        candidate: &FrameId,
        correspondences: &CorrespondenceSet,
    ) -> Result<Self, TrackGraphError> {
        if reference == candidate {
            return Err(TrackGraphError::IdenticalFrames(reference.clone()));
        }

        let mut graph = Self::new();
        graph.add_frame(reference.clone());
        graph.add_frame(candidate.clone());

        for (row, &[feature_a, feature_b]) in correspondences.matches.iter().enumerate() {
            let track = TrackId(row);
            graph.add_track(track);

            let [x, y, s] = correspondences.points_a[row];
            graph.add_observation(
                reference,
                track,
                Observation {
                    pixel: [x, y],
                    scale: s,
                    feature_id: feature_a,
                    color: correspondences.colors_a[row],
                },
            )?;

            let [x, y, s] = correspondences.points_b[row];
            graph.add_observation(
                candidate,
                track,
                Observation {
                    pixel: [x, y],
                    scale: s,
                    feature_id: feature_b,
                    color: correspondences.colors_b[row],
                },
            )?;
        }

        Ok(graph)
    }

    /// Add a frame node. Returns `false` if it already existed.
    pub fn add_frame(&mut self, frame: FrameId) -> bool {
        if self.frames.contains_key(&frame) {
            return false;
        }
        self.frames.insert(frame, BTreeMap::new());
        true
    }

    /// Add a track node. Returns `false` if it already existed.
    pub fn add_track(&mut self, track: TrackId) -> bool {
        if self.tracks.contains_key(&track) {
            return false;
        }
        self.tracks.insert(track, BTreeSet::new());
        true
    }

    /// Add the edge `frame -- track`.
    pub fn add_observation(
        &mut self,
        frame: &FrameId,
        track: TrackId,
        observation: Observation,
    ) -> Result<(), TrackGraphError> {
        let track_frames = self
            .tracks
            .get_mut(&track)
            .ok_or(TrackGraphError::UnknownTrack(track))?;
        let frame_tracks = self
            .frames
            .get_mut(frame)
            .ok_or_else(|| TrackGraphError::UnknownFrame(frame.clone()))?;

        if frame_tracks.contains_key(&track) {
            return Err(TrackGraphError::DuplicateObservation {
                frame: frame.clone(),
                track,
            });
        }

        frame_tracks.insert(track, observation);
        track_frames.insert(frame.clone());
        Ok(())
    }

    /// Remove a track and all its edges. Returns `false` if the track did not exist.
    pub fn remove_track(&mut self, track: TrackId) -> bool {
        let Some(frames) = self.tracks.remove(&track) else {
            return false;
        };
        for frame in frames {
            if let Some(frame_tracks) = self.frames.get_mut(&frame) {
                frame_tracks.remove(&track);
            }
        }
        true
    }

    /// Whether the node exists.
    pub fn contains(&self, node: &NodeId) -> bool {
        match node {
            NodeId::Frame(id) => self.frames.contains_key(id),
            NodeId::Track(id) => self.tracks.contains_key(id),
        }
    }

    /// Number of frame nodes.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of track nodes.
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.frames.values().map(BTreeMap::len).sum()
    }

    /// Frame nodes in id order.
    pub fn frames(&self) -> impl Iterator<Item = &FrameId> {
        self.frames.keys()
    }

    /// Track nodes in id order.
    pub fn tracks(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.keys().copied()
    }

    /// The observation of `track` in `frame`, if any.
    pub fn observation(&self, frame: &FrameId, track: TrackId) -> Option<&Observation> {
        self.frames.get(frame)?.get(&track)
    }

    /// All observations made in `frame`, in track order.
    pub fn frame_observations(
        &self,
        frame: &FrameId,
    ) -> impl Iterator<Item = (TrackId, &Observation)> {
        self.frames
            .get(frame)
            .into_iter()
            .flat_map(|tracks| tracks.iter().map(|(t, o)| (*t, o)))
    }

    /// All observations of `track`, in frame order.
    pub fn track_observations(
        &self,
        track: TrackId,
    ) -> impl Iterator<Item = (&FrameId, &Observation)> {
        self.tracks
            .get(&track)
            .into_iter()
            .flatten()
            .filter_map(move |frame| Some((frame, self.observation(frame, track)?)))
    }

    /// Nodes adjacent to `node`. Always of the other kind.
    pub fn neighbors(&self, node: &NodeId) -> Vec<NodeId> {
        match node {
            NodeId::Frame(id) => self
                .frames
                .get(id)
                .map(|tracks| tracks.keys().map(|t| NodeId::Track(*t)).collect())
                .unwrap_or_default(),
            NodeId::Track(id) => self
                .tracks
                .get(id)
                .map(|frames| frames.iter().cloned().map(NodeId::Frame).collect())
                .unwrap_or_default(),
        }
    }

    /// Number of edges incident to `node`; zero for unknown nodes.
    pub fn degree(&self, node: &NodeId) -> usize {
        match node {
            NodeId::Frame(id) => self.frames.get(id).map_or(0, BTreeMap::len),
            NodeId::Track(id) => self.tracks.get(id).map_or(0, BTreeSet::len),
        }
    }

    /// Tracks observed in both frames with their observation in each.
    pub fn common_tracks(
        &self,
        frame_a: &FrameId,
        frame_b: &FrameId,
    ) -> Vec<(TrackId, &Observation, &Observation)> {
        let (Some(tracks_a), Some(tracks_b)) = (self.frames.get(frame_a), self.frames.get(frame_b))
        else {
            return Vec::new();
        };
        tracks_a
            .iter()
            .filter_map(|(track, obs_a)| Some((*track, obs_a, tracks_b.get(track)?)))
            .collect()
    }

    /// Copy of the graph restricted to the given tracks. All frame nodes are kept.
    ///
    /// Tracks that are not in the graph are ignored.
    pub fn subgraph<I>(&self, tracks: I) -> Self
    where
        I: IntoIterator<Item = TrackId>,
    {
        let keep: BTreeSet<TrackId> = tracks
            .into_iter()
            .filter(|t| self.tracks.contains_key(t))
            .collect();

        let frames = self
            .frames
            .iter()
            .map(|(frame, obs)| {
                let kept = obs
                    .iter()
                    .filter(|(t, _)| keep.contains(t))
                    .map(|(t, o)| (*t, *o))
                    .collect();
                (frame.clone(), kept)
            })
            .collect();
        let tracks = self
            .tracks
            .iter()
            .filter(|(t, _)| keep.contains(t))
            .map(|(t, f)| (*t, f.clone()))
            .collect();

        Self { frames, tracks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correspondences(n: usize) -> CorrespondenceSet {
        CorrespondenceSet {
            points_a: (0..n).map(|i| [i as f64, 1.0, 2.0]).collect(),
            points_b: (0..n).map(|i| [i as f64 + 10.0, 3.0, 4.0]).collect(),
            descriptors_a: vec![vec![0.0]; n],
            descriptors_b: vec![vec![0.0]; n],
            colors_a: vec![[255.0, 0.0, 0.0]; n],
            colors_b: vec![[0.0, 255.0, 0.0]; n],
            matches: (0..n).map(|i| [i + 100, i + 200]).collect(),
        }
    }

    #[test]
    fn test_from_correspondences_structure() -> Result<(), TrackGraphError> {
        let (f0, f1) = (FrameId::from("F0"), FrameId::from("F1"));
        let graph = TrackGraph::from_correspondences(&f0, &f1, &correspondences(5))?;

        assert_eq!(graph.num_frames(), 2);
        assert_eq!(graph.num_tracks(), 5);
        assert_eq!(graph.num_edges(), 10);
        for track in graph.tracks() {
            assert_eq!(graph.degree(&NodeId::Track(track)), 2);
        }
        assert_eq!(graph.degree(&NodeId::Frame(f0.clone())), 5);

        let obs = graph.observation(&f0, TrackId(3)).unwrap();
        assert_eq!(obs.pixel, [3.0, 1.0]);
        assert_eq!(obs.scale, 2.0);
        assert_eq!(obs.feature_id, 103);
        assert_eq!(obs.color, [255.0, 0.0, 0.0]);

        let obs = graph.observation(&f1, TrackId(3)).unwrap();
        assert_eq!(obs.pixel, [13.0, 3.0]);
        assert_eq!(obs.feature_id, 203);
        Ok(())
    }

    #[test]
    fn test_frame_and_track_ids_do_not_collide() -> Result<(), TrackGraphError> {
        let (f0, f1) = (FrameId::from(0u64), FrameId::from(1u64));
        let graph = TrackGraph::from_correspondences(&f0, &f1, &correspondences(3))?;
        assert_eq!(graph.num_frames(), 2);
        assert_eq!(graph.num_tracks(), 3);
        assert!(graph.contains(&NodeId::Frame(f0)));
        assert!(graph.contains(&NodeId::Track(TrackId(0))));
        assert_eq!(NodeId::Track(TrackId(0)).kind().bipartite(), 1);
        Ok(())
    }

    #[test]
    fn test_identical_frames_rejected() {
        let f0 = FrameId::from("F0");
        assert_eq!(
            TrackGraph::from_correspondences(&f0, &f0, &correspondences(1)),
            Err(TrackGraphError::IdenticalFrames(f0.clone()))
        );
    }

    #[test]
    fn test_add_observation_errors() {
        let mut graph = TrackGraph::new();
        let f0 = FrameId::from("F0");
        let obs = Observation {
            pixel: [0.0, 0.0],
            scale: 1.0,
            feature_id: 0,
            color: [0.0; 3],
        };

        assert_eq!(
            graph.add_observation(&f0, TrackId(0), obs),
            Err(TrackGraphError::UnknownTrack(TrackId(0)))
        );
        graph.add_track(TrackId(0));
        assert_eq!(
            graph.add_observation(&f0, TrackId(0), obs),
            Err(TrackGraphError::UnknownFrame(f0.clone()))
        );
        assert!(graph.add_frame(f0.clone()));
        assert!(!graph.add_frame(f0.clone()));
        assert_eq!(graph.add_observation(&f0, TrackId(0), obs), Ok(()));
        assert_eq!(
            graph.add_observation(&f0, TrackId(0), obs),
            Err(TrackGraphError::DuplicateObservation {
                frame: f0,
                track: TrackId(0)
            })
        );
    }

    #[test]
    fn test_neighbors_and_common_tracks() -> Result<(), TrackGraphError> {
        let (f0, f1) = (FrameId::from("F0"), FrameId::from("F1"));
        let mut graph = TrackGraph::from_correspondences(&f0, &f1, &correspondences(4))?;

        let neighbors = graph.neighbors(&NodeId::Track(TrackId(2)));
        assert_eq!(neighbors, vec![NodeId::Frame(f0.clone()), NodeId::Frame(f1.clone())]);
        assert_eq!(graph.neighbors(&NodeId::Frame(f1.clone())).len(), 4);
        assert_eq!(graph.track_observations(TrackId(2)).count(), 2);
        assert_eq!(graph.frame_observations(&f0).count(), 4);

        assert!(graph.remove_track(TrackId(2)));
        assert!(!graph.remove_track(TrackId(2)));
        let common = graph.common_tracks(&f0, &f1);
        let ids: Vec<_> = common.iter().map(|(t, _, _)| t.0).collect();
        assert_eq!(ids, vec![0, 1, 3]);
        assert_eq!(graph.num_edges(), 6);
        Ok(())
    }

    #[test]
    fn test_subgraph_keeps_frames() -> Result<(), TrackGraphError> {
        let (f0, f1) = (FrameId::from("F0"), FrameId::from("F1"));
        let graph = TrackGraph::from_correspondences(&f0, &f1, &correspondences(6))?;
        let sub = graph.subgraph([TrackId(1), TrackId(4), TrackId(99)]);

        assert_eq!(sub.num_frames(), 2);
        assert_eq!(sub.tracks().collect::<Vec<_>>(), vec![TrackId(1), TrackId(4)]);
        assert_eq!(sub.num_edges(), 4);
        assert_eq!(sub.observation(&f1, TrackId(4)), graph.observation(&f1, TrackId(4)));
        Ok(())
    }
}
