use crate::config::InitializerConfig;
use crate::error::InitializerError;
use crate::frame::FrameId;
use crate::strategy::{
    InitContext, InitMethod, InitOutcome, InitializationStrategy, LinePointHybrid, OrbStyle,
    TwoViewGeometric,
};

/// Pairs a stored reference frame with incoming candidate frames until a map can be
/// bootstrapped.
pub struct Initializer {
    reference: Option<FrameId>,
    strategy: Box<dyn InitializationStrategy>,
}

impl Initializer {
    /// Create an initializer running the method selected by `config`.
    ///
    /// The reconstructor passed in [`InitContext`] should come from
    /// `config.reconstructor_config()`.
    pub fn new(config: &InitializerConfig) -> Result<Self, InitializerError> {
        config.validate()?;
        let strategy: Box<dyn InitializationStrategy> = match config.method {
            InitMethod::TwoViewGeometric => Box::new(TwoViewGeometric::new(config)),
            InitMethod::OrbStyle => Box::new(OrbStyle),
            InitMethod::LinePointHybrid => Box::new(LinePointHybrid),
        };
        Ok(Self::with_strategy(strategy))
    }

    /// Create an initializer running a custom strategy.
    pub fn with_strategy(strategy: Box<dyn InitializationStrategy>) -> Self {
        Self {
            reference: None,
            strategy,
        }
    }

    /// Store the reference frame, replacing any previous one.
    pub fn set_initial_frame(&mut self, frame: impl Into<FrameId>) {
        let frame = frame.into();
        log::debug!("reference frame set to {frame}");
        self.reference = Some(frame);
    }

    /// The stored reference frame.
    pub fn reference_frame(&self) -> Option<&FrameId> {
        self.reference.as_ref()
    }

    /// The method run by [`Initializer::initialize`].
    pub fn method(&self) -> InitMethod {
        self.strategy.method()
    }

    /// Try to initialize a map from the reference frame and `frame`.
    ///
    /// The reference frame is kept whatever the outcome.
    pub fn initialize(
        &self,
        frame: impl Into<FrameId>,
        context: &InitContext<'_>,
    ) -> Result<InitOutcome, InitializerError> {
        let reference = self
            .reference
            .as_ref()
            .ok_or(InitializerError::NoReferenceFrame)?;
        let candidate = frame.into();
        log::debug!(
            "initializing {reference}-{candidate} with {}",
            self.strategy.method()
        );
        self.strategy.attempt(reference, &candidate, context)
    }
}
