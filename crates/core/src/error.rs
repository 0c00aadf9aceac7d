/// Result alias that carries the custom [`FlyoverError`] type.
pub type Result<T> = std::result::Result<T, FlyoverError>;

/// Common error type for the core crate.
///
/// Every variant is recoverable: session control actions turn them into
/// operator-visible alerts instead of propagating them further.
#[derive(Debug, thiserror::Error)]
pub enum FlyoverError {
    /// Playback or recording was requested before any route was loaded.
    #[error("no data loaded for animation")]
    NoRouteLoaded,
    /// The route is loaded but trimming left nothing to animate.
    #[error("no animation data available")]
    EmptyPlaybackSet,
    /// The video encoder could not be created or started.
    #[error("failed to start recording: {0}")]
    EncoderInit(String),
    /// The video encoder rejected a frame.
    #[error("error recording frame: {0}")]
    EncoderStep(String),
    /// The video encoder failed while flushing or finalising its output.
    #[error("failed to stop recording: {0}")]
    EncoderFinalize(String),
    /// A recording is already active.
    #[error("a recording is already in progress")]
    RecordingInProgress,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A fitness file or photo could not be decoded.
    #[error("failed to decode {0}")]
    Decode(String),
    /// The requested action does not apply in the current playback state.
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl FlyoverError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Whether the error originates from the video encoder.
    pub fn is_encoder_failure(&self) -> bool {
        matches!(
            self,
            Self::EncoderInit(_) | Self::EncoderStep(_) | Self::EncoderFinalize(_)
        )
    }
}

impl From<&str> for FlyoverError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for FlyoverError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
