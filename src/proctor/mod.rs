//! Client side of a proctored attempt: the session state machine, the
//! background violation monitor and the controller tying them to the
//! host's devices and the quiz API.

pub mod capability;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod monitor;
pub mod session;

pub use capability::{Fullscreen, MediaCapture};
pub use client::{HttpQuizApi, QuizApi};
pub use config::ProctorConfig;
pub use controller::{SessionController, SessionDeps};
pub use error::ProctorError;
pub use monitor::ContextSignal;
pub use session::{Phase, Session, SubmissionOutcome, SubmitReason, Violation};
