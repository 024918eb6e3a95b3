//! Error types for melody-radio.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
///
/// The producer recovers locally from `Generation`, `PostProcess` and
/// `Analysis`; none of them ever reaches a listener.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The generation collaborator failed or returned unusable audio.
    #[error("generation: {0}")]
    Generation(String),

    /// Loudness normalization / fade pass could not decode or rewrite the asset.
    #[error("post-process: {0}")]
    PostProcess(String),

    /// Tempo estimation failed.
    #[error("analysis: {0}")]
    Analysis(String),

    /// WAV encode/decode error.
    #[error("audio: {0}")]
    Audio(String),

    /// Generation manager failed to load or has shut down.
    #[error("manager: {0}")]
    Manager(String),

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<hound::Error> for Error {
    fn from(error: hound::Error) -> Self {
        Error::Audio(error.to_string())
    }
}
