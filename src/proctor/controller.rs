use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::capability::{Fullscreen, MediaCapture};
use super::client::QuizApi;
use super::config::ProctorConfig;
use super::error::ProctorError;
use super::monitor::{ContextSignal, ViolationMonitor, ViolationSink};
use super::session::{Effect, Event, Phase, Session, Violation};
use crate::dto::quiz_dto::AnswerSubmission;
use crate::utils::time::Clock;

/// Capabilities a session runs against.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn QuizApi>,
    pub capture: Arc<dyn MediaCapture>,
    pub fullscreen: Arc<dyn Fullscreen>,
    pub clock: Arc<dyn Clock>,
}

/// Drives one proctored attempt. Dropping the controller tears the session
/// down and releases every device it holds.
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    quiz_id: Uuid,
    config: ProctorConfig,
    deps: SessionDeps,
    session: Mutex<Session>,
    monitor: Mutex<Option<ViolationMonitor>>,
    signals_tx: mpsc::UnboundedSender<ContextSignal>,
    signals_rx: Mutex<Option<mpsc::UnboundedReceiver<ContextSignal>>>,
    weak_self: Weak<ControllerInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionController {
    pub fn new(quiz_id: Uuid, config: ProctorConfig, deps: SessionDeps) -> Result<Self, ProctorError> {
        config.validate()?;
        let ceiling = config.pick_ceiling(&mut rand::thread_rng());
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let inner = Arc::new_cyclic(|weak_self| ControllerInner {
            quiz_id,
            config,
            deps,
            session: Mutex::new(Session::new(quiz_id, ceiling)),
            monitor: Mutex::new(None),
            signals_tx,
            signals_rx: Mutex::new(Some(signals_rx)),
            weak_self: weak_self.clone(),
        });
        tracing::debug!(%quiz_id, ceiling, "Proctored session created");

        Ok(Self { inner })
    }

    /// Sender for visibility and fullscreen notifications from the host.
    pub fn signals(&self) -> mpsc::UnboundedSender<ContextSignal> {
        self.inner.signals_tx.clone()
    }

    pub fn snapshot(&self) -> Session {
        lock(&self.inner.session).clone()
    }

    pub fn phase(&self) -> Phase {
        lock(&self.inner.session).phase().clone()
    }

    /// Fetches the quiz. Any refusal is final for this session.
    pub async fn load(&self) {
        if self.phase() != Phase::Loading {
            return;
        }
        let event = match self.inner.deps.api.fetch_quiz(self.inner.quiz_id).await {
            Ok(quiz) => Event::QuizLoaded(quiz),
            Err(ProctorError::Rejected { rejection, message }) => {
                tracing::warn!(quiz_id = %self.inner.quiz_id, %rejection, "Quiz refused by server");
                Event::LoadRejected {
                    rejection: Some(rejection),
                    message,
                }
            }
            Err(e) => {
                tracing::warn!(quiz_id = %self.inner.quiz_id, error = %e, "Quiz could not be loaded");
                Event::LoadRejected {
                    rejection: None,
                    message: e.to_string(),
                }
            }
        };
        self.inner.dispatch(event).await;
    }

    /// Opens camera and microphone, then asks for fullscreen. Only the
    /// capture devices are mandatory. A call made while another one is
    /// still acquiring returns without touching the devices.
    pub async fn grant_permissions(&self) {
        let effects = self.inner.apply(Event::PermissionsRequested);
        if !effects.contains(&Effect::AcquireDevices) {
            return;
        }

        if let Err(e) = self.inner.deps.capture.acquire().await {
            tracing::warn!(error = %e, "Capture permission denied");
            self.inner.dispatch(Event::PermissionsDenied(e.to_string())).await;
            return;
        }

        let fullscreen = match self.inner.deps.fullscreen.enter().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Fullscreen unavailable, continuing without it");
                false
            }
        };
        self.inner
            .dispatch(Event::PermissionsGranted { fullscreen })
            .await;
    }

    pub async fn select_answer(&self, question_id: &str, option: usize) {
        self.inner
            .dispatch(Event::SelectAnswer {
                question_id: question_id.to_string(),
                option,
            })
            .await;
    }

    pub async fn goto(&self, index: usize) {
        self.inner.dispatch(Event::Goto(index)).await;
    }

    pub async fn next(&self) {
        self.inner.dispatch(Event::Next).await;
    }

    pub async fn previous(&self) {
        self.inner.dispatch(Event::Previous).await;
    }

    pub async fn request_submit(&self) {
        self.inner.dispatch(Event::RequestSubmit).await;
    }

    pub async fn cancel_submit(&self) {
        self.inner.dispatch(Event::CancelSubmit).await;
    }

    pub async fn confirm_submit(&self) {
        self.inner.dispatch(Event::ConfirmSubmit).await;
    }

    /// Sends the frozen answers again after a failed submission.
    pub async fn retry_submission(&self) {
        self.inner.dispatch(Event::RetrySubmission).await;
    }

    pub async fn check_expiry(&self) {
        self.inner.check_expiry().await;
    }

    /// Abandons the session if it has not been submitted.
    pub fn shutdown(&self) {
        self.inner.teardown();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl ControllerInner {
    fn apply(&self, event: Event) -> Vec<Effect> {
        lock(&self.session).apply(event)
    }

    async fn dispatch(&self, event: Event) {
        let effects = self.apply(event);
        for effect in effects {
            match effect {
                Effect::Submit(payload) => self.submit(payload).await,
                other => self.run_local(other),
            }
        }
    }

    fn teardown(&self) {
        for effect in self.apply(Event::Teardown) {
            self.run_local(effect);
        }
    }

    fn run_local(&self, effect: Effect) {
        match effect {
            // Acquisition is driven by `grant_permissions` itself.
            Effect::AcquireDevices => {}
            Effect::StartMonitor => self.start_monitor(),
            Effect::StopMonitor => {
                if let Some(monitor) = lock(&self.monitor).take() {
                    monitor.stop();
                }
            }
            Effect::ReleaseCapture => self.deps.capture.release(),
            Effect::ExitFullscreen => {
                if self.deps.fullscreen.is_active() {
                    self.deps.fullscreen.exit();
                }
            }
            Effect::Warn {
                violation,
                warnings,
                ceiling,
            } => {
                tracing::warn!(
                    quiz_id = %self.quiz_id,
                    ?violation,
                    warnings,
                    ceiling,
                    "{}",
                    violation.message()
                );
            }
            Effect::Submit(_) => {
                tracing::error!(quiz_id = %self.quiz_id, "Submission requested outside an async context");
            }
        }
    }

    fn start_monitor(&self) {
        let Some(signals) = lock(&self.signals_rx).take() else {
            tracing::warn!(quiz_id = %self.quiz_id, "Violation monitor already started");
            return;
        };
        let sink: Weak<dyn ViolationSink> = self.weak_self.clone();
        let monitor = ViolationMonitor::spawn(&self.config, self.deps.capture.clone(), signals, sink);

        let still_running = lock(&self.session).is_monitoring();
        if still_running {
            *lock(&self.monitor) = Some(monitor);
        } else {
            monitor.stop();
        }
    }

    async fn submit(&self, payload: Vec<AnswerSubmission>) {
        tracing::info!(quiz_id = %self.quiz_id, answers = payload.len(), "Submitting attempt");
        let event = match self.deps.api.submit(self.quiz_id, payload).await {
            Ok(result) => {
                tracing::info!(quiz_id = %self.quiz_id, score = result.score, "Attempt graded");
                Event::SubmissionSucceeded(result)
            }
            Err(ProctorError::Rejected { rejection, message }) => {
                tracing::warn!(quiz_id = %self.quiz_id, %rejection, "Submission refused");
                Event::SubmissionRejected {
                    rejection: Some(rejection),
                    message,
                }
            }
            Err(e) => {
                tracing::error!(quiz_id = %self.quiz_id, error = %e, "Submission failed");
                Event::SubmissionFailed(e.to_string())
            }
        };
        let follow_up = self.apply(event);
        debug_assert!(follow_up.is_empty());
    }

    async fn check_expiry(&self) {
        let expired = lock(&self.session).is_expired_at(self.deps.clock.now());
        if expired {
            tracing::info!(quiz_id = %self.quiz_id, "Availability window closed, auto-submitting");
            self.dispatch(Event::WindowExpired).await;
        }
    }
}

#[async_trait]
impl ViolationSink for ControllerInner {
    async fn on_violation(&self, violation: Violation) {
        let at = self.deps.clock.now();
        self.dispatch(Event::ViolationDetected { violation, at }).await;
    }

    async fn on_tick(&self) {
        self.check_expiry().await;
    }
}
