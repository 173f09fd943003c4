use crate::config::ConfigError;
use crate::correspondence::CorrespondenceError;
use crate::provider::ProviderError;
use crate::reconstruction::BootstrapError;
use crate::strategy::InitMethod;
use crate::track_graph::TrackGraphError;

/// Errors raised by the initializer.
///
/// A pair that cannot be used for initialization is not an error; it is reported as a
/// rejected [`crate::InitOutcome`].
#[derive(thiserror::Error, Debug)]
pub enum InitializerError {
    /// `initialize` was called before a reference frame was set.
    #[error("No reference frame set")]
    NoReferenceFrame,

    /// The configured method has no implementation.
    #[error("Initialization method `{method}` is not implemented")]
    NotImplemented {
        /// The requested method.
        method: InitMethod,
    },

    /// A data provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Features or matches are inconsistent.
    #[error(transparent)]
    Correspondence(#[from] CorrespondenceError),

    /// The track graph could not be built.
    #[error(transparent)]
    TrackGraph(#[from] TrackGraphError),

    /// The bootstrap reconstructor failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
