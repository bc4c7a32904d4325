use crate::error::Rejection;

#[derive(Debug, thiserror::Error)]
pub enum ProctorError {
    #[error("Invalid proctor configuration: {0}")]
    Config(String),

    #[error("Camera or microphone unavailable: {0}")]
    CaptureDenied(String),

    #[error("Fullscreen request failed: {0}")]
    Fullscreen(String),

    /// For `MediaCapture::count_faces` implementations whose detector
    /// could not run. The monitor skips the presence check for that tick.
    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("{rejection}: {message}")]
    Rejected {
        rejection: Rejection,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}
