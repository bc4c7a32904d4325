//! Environment capabilities a proctored session depends on. The session
//! never touches devices directly; the host supplies implementations.

use async_trait::async_trait;

use super::error::ProctorError;

/// Camera and microphone access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Opens both devices. An error means the user refused or no device is
    /// present.
    async fn acquire(&self) -> Result<(), ProctorError>;

    /// Number of faces in the current camera frame, or
    /// [`ProctorError::Detection`] when no reading could be taken.
    async fn count_faces(&self) -> Result<u32, ProctorError>;

    /// Normalized microphone samples captured since the previous call.
    async fn drain_audio(&self) -> Vec<f32>;

    /// Stops both devices. Safe to call more than once.
    fn release(&self);
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fullscreen: Send + Sync {
    async fn enter(&self) -> Result<(), ProctorError>;

    fn exit(&self);

    fn is_active(&self) -> bool;
}
