#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia Bootstrap
//!
//! Creates the initial map of a monocular SLAM session from two frames.
//!
//! A reference frame is stored first. Every later frame is matched against it, the pair
//! is rejected when its motion is explained by a pure rotation, and otherwise the
//! correspondences are turned into a two-view track graph handed to a bootstrap
//! reconstructor.
//!
//! ## Example
//!
//! ```rust
//! use kornia_bootstrap::{
//!     CameraModel, FeatureSet, InMemoryStore, InitContext, Initializer, InitializerConfig,
//!     PrecomputedMatcher, TwoViewReconstructor,
//! };
//!
//! let mut store = InMemoryStore::new();
//! store.insert_camera("cam", CameraModel::pinhole(640, 480, 500.0, 500.0, 320.0, 240.0));
//! store.insert_features("F0", FeatureSet::default());
//! store.insert_features("F1", FeatureSet::default());
//!
//! // no matches registered: the pair is rejected
//! let matcher = PrecomputedMatcher::new();
//! let config = InitializerConfig::default();
//! let reconstructor = TwoViewReconstructor::new(config.reconstructor_config());
//! let context = InitContext::new(&store, &store, &matcher, &reconstructor);
//!
//! let mut initializer = Initializer::new(&config)?;
//! initializer.set_initial_frame("F0");
//! let outcome = initializer.initialize("F1", &context)?;
//! assert!(outcome.is_rejected());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Camera models and camera selection.
pub mod camera;

/// Initializer configuration.
pub mod config;

/// Aligned correspondences between two frames.
pub mod correspondence;

/// Initializer error type.
pub mod error;

/// Per-frame feature storage.
pub mod features;

/// Frame identifiers.
pub mod frame;

/// The initializer driving attempts against a reference frame.
pub mod initializer;

pub mod linalg;

pub mod pose;

pub mod provider;

pub mod reconstructability;

pub mod reconstruction;

pub mod strategy;

pub mod track_graph;

/// Reference two-view bootstrap reconstructor.
pub mod twoview;

pub use camera::{CameraModel, CameraSelection};
pub use config::{ConfigError, InitializerConfig};
pub use correspondence::{CorrespondenceError, CorrespondenceSet};
pub use error::InitializerError;
pub use features::FeatureSet;
pub use frame::FrameId;
pub use initializer::Initializer;
pub use provider::{
    CameraModelRegistry, FeatureStore, FrameMatcher, InMemoryStore, MatchResult,
    PrecomputedMatcher, ProviderError,
};
pub use reconstructability::{
    ReconstructabilityParams, ReconstructabilityScore, ReconstructabilityScorer,
    RotationOnlyScorer,
};
pub use reconstruction::{
    BootstrapError, BootstrapOutcome, BootstrapReconstructor, BootstrapReport, Reconstruction,
};
pub use strategy::{InitContext, InitMethod, InitOutcome, InitializationStrategy};
pub use track_graph::{NodeId, Observation, TrackGraph, TrackId};
pub use twoview::{TwoViewReconstructor, TwoViewReconstructorConfig};
