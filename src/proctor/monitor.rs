use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::capability::MediaCapture;
use super::config::ProctorConfig;
use super::session::Violation;

/// Host notifications about the quiz context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSignal {
    VisibilityChanged { hidden: bool },
    FullscreenChanged { active: bool },
}

/// Receives what the monitor observes.
#[async_trait]
pub trait ViolationSink: Send + Sync {
    async fn on_violation(&self, violation: Violation);

    /// Called once per sampling tick, before the tick's readings are judged.
    async fn on_tick(&self) {}
}

pub fn mean_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}

/// Judges one tick's readings, keeping only the most severe finding.
/// `faces` is `None` when detection could not run.
pub fn evaluate_tick(faces: Option<u32>, samples: &[f32], noise_threshold: f32) -> Option<Violation> {
    let presence = match faces {
        Some(0) => Some(Violation::NoFace),
        Some(n) if n > 1 => Some(Violation::MultipleFaces),
        _ => None,
    };
    let noise = (mean_amplitude(samples) > noise_threshold).then_some(Violation::Noise);

    [presence, noise]
        .into_iter()
        .flatten()
        .max_by_key(|v| v.severity())
}

pub fn evaluate_signal(signal: ContextSignal) -> Option<Violation> {
    match signal {
        ContextSignal::VisibilityChanged { hidden: true } => Some(Violation::TabHidden),
        ContextSignal::FullscreenChanged { active: false } => Some(Violation::FullscreenExited),
        _ => None,
    }
}

/// Background sampling task. Stops when cancelled, when dropped, or when
/// its sink goes away.
pub struct ViolationMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ViolationMonitor {
    pub fn spawn(
        config: &ProctorConfig,
        capture: Arc<dyn MediaCapture>,
        mut signals: mpsc::UnboundedReceiver<ContextSignal>,
        sink: Weak<dyn ViolationSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = config.poll_interval;
        let threshold = config.noise_threshold;

        // Signals queued before monitoring began describe a state the
        // session never observed.
        while signals.try_recv().is_ok() {}

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut signals_open = true;

            tracing::debug!(?period, "Violation monitor started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(sink) = sink.upgrade() else { break };
                        let faces = match capture.count_faces().await {
                            Ok(n) => Some(n),
                            Err(e) => {
                                tracing::debug!(error = %e, "Face detection skipped this tick");
                                None
                            }
                        };
                        let samples = capture.drain_audio().await;

                        sink.on_tick().await;
                        if token.is_cancelled() {
                            break;
                        }
                        if let Some(violation) = evaluate_tick(faces, &samples, threshold) {
                            sink.on_violation(violation).await;
                        }
                    }
                    signal = signals.recv(), if signals_open => {
                        match signal {
                            Some(signal) => {
                                let Some(violation) = evaluate_signal(signal) else { continue };
                                let Some(sink) = sink.upgrade() else { break };
                                sink.on_violation(violation).await;
                            }
                            None => signals_open = false,
                        }
                    }
                }
            }
            tracing::debug!("Violation monitor stopped");
        });

        Self { cancel, handle }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ViolationMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proctor::capability::MockMediaCapture;
    use crate::proctor::error::ProctorError;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Violation>>,
        ticks: Mutex<u32>,
    }

    impl RecordingSink {
        fn seen(&self) -> Vec<Violation> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ViolationSink for RecordingSink {
        async fn on_violation(&self, violation: Violation) {
            self.seen.lock().unwrap().push(violation);
        }

        async fn on_tick(&self) {
            *self.ticks.lock().unwrap() += 1;
        }
    }

    fn capture(faces: u32, amplitude: f32) -> Arc<dyn MediaCapture> {
        let mut capture = MockMediaCapture::new();
        capture.expect_count_faces().returning(move || Ok(faces));
        capture
            .expect_drain_audio()
            .returning(move || vec![amplitude, -amplitude]);
        Arc::new(capture)
    }

    fn config() -> ProctorConfig {
        ProctorConfig {
            poll_interval: Duration::from_secs(2),
            ..ProctorConfig::default()
        }
    }

    #[test]
    fn amplitude_is_mean_of_absolute_values() {
        assert_eq!(mean_amplitude(&[]), 0.0);
        assert!((mean_amplitude(&[0.5, -0.5, 0.0, 0.2]) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn most_severe_tick_finding_wins() {
        assert_eq!(evaluate_tick(Some(1), &[0.01], 0.2), None);
        assert_eq!(evaluate_tick(Some(0), &[0.9], 0.2), Some(Violation::NoFace));
        assert_eq!(evaluate_tick(Some(3), &[0.9], 0.2), Some(Violation::MultipleFaces));
        assert_eq!(evaluate_tick(Some(1), &[0.9, -0.9], 0.2), Some(Violation::Noise));
        assert_eq!(evaluate_tick(None, &[0.1], 0.2), None);
    }

    #[test]
    fn only_leaving_signals_are_violations() {
        assert_eq!(
            evaluate_signal(ContextSignal::VisibilityChanged { hidden: true }),
            Some(Violation::TabHidden)
        );
        assert_eq!(evaluate_signal(ContextSignal::VisibilityChanged { hidden: false }), None);
        assert_eq!(
            evaluate_signal(ContextSignal::FullscreenChanged { active: false }),
            Some(Violation::FullscreenExited)
        );
        assert_eq!(evaluate_signal(ContextSignal::FullscreenChanged { active: true }), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_one_violation_per_tick_until_stopped() {
        let recorder = Arc::new(RecordingSink::default());
        let sink: Arc<dyn ViolationSink> = recorder.clone();
        let (_tx, rx) = mpsc::unbounded_channel();

        let monitor = ViolationMonitor::spawn(&config(), capture(0, 0.5), rx, Arc::downgrade(&sink));
        tokio::time::sleep(Duration::from_millis(6_500)).await;

        assert_eq!(recorder.seen(), vec![Violation::NoFace; 3]);
        assert_eq!(*recorder.ticks.lock().unwrap(), 3);

        monitor.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.seen().len(), 3);
        assert!(monitor.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn context_signals_are_reported_between_ticks() {
        let recorder = Arc::new(RecordingSink::default());
        let sink: Arc<dyn ViolationSink> = recorder.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ContextSignal::VisibilityChanged { hidden: true }).unwrap();

        let _monitor = ViolationMonitor::spawn(&config(), capture(1, 0.0), rx, Arc::downgrade(&sink));
        tx.send(ContextSignal::VisibilityChanged { hidden: false }).unwrap();
        tx.send(ContextSignal::FullscreenChanged { active: false }).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The queued pre-start signal was discarded.
        assert_eq!(recorder.seen(), vec![Violation::FullscreenExited]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_detection_still_checks_audio() {
        let mut capture = MockMediaCapture::new();
        capture
            .expect_count_faces()
            .returning(|| Err(ProctorError::Detection("model not loaded".to_string())));
        let mut loud = false;
        capture.expect_drain_audio().returning(move || {
            loud = !loud;
            if loud {
                vec![0.0, 0.01]
            } else {
                vec![0.8, -0.8]
            }
        });
        let recorder = Arc::new(RecordingSink::default());
        let sink: Arc<dyn ViolationSink> = recorder.clone();
        let (_tx, rx) = mpsc::unbounded_channel();

        let _monitor = ViolationMonitor::spawn(&config(), Arc::new(capture), rx, Arc::downgrade(&sink));
        tokio::time::sleep(Duration::from_millis(4_500)).await;

        assert_eq!(*recorder.ticks.lock().unwrap(), 2);
        assert_eq!(recorder.seen(), vec![Violation::Noise]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_sink_is_gone() {
        let recorder = Arc::new(RecordingSink::default());
        let sink: Arc<dyn ViolationSink> = recorder.clone();
        let (_tx, rx) = mpsc::unbounded_channel();
        let monitor = ViolationMonitor::spawn(&config(), capture(0, 0.0), rx, Arc::downgrade(&sink));

        drop(sink);
        drop(recorder);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(monitor.is_finished());
    }
}
