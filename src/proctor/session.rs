//! Pure state machine for one proctored attempt.
//!
//! Every input is an [`Event`]; [`Session::apply`] mutates the state and
//! returns the [`Effect`]s the caller must carry out. Nothing in here awaits,
//! so the submission latch is checked and set in the same step that decides
//! to submit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dto::quiz_dto::{AnswerSubmission, QuizResultView, StudentQuestion, StudentQuiz};
use crate::error::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    FullscreenExited,
    TabHidden,
    MultipleFaces,
    NoFace,
    Noise,
}

impl Violation {
    /// Higher is more severe.
    pub fn severity(self) -> u8 {
        match self {
            Violation::FullscreenExited => 5,
            Violation::TabHidden => 4,
            Violation::MultipleFaces => 3,
            Violation::NoFace => 2,
            Violation::Noise => 1,
        }
    }

    /// Leaving the quiz context ends the attempt on the first occurrence.
    pub fn is_context(self) -> bool {
        matches!(self, Violation::FullscreenExited | Violation::TabHidden)
    }

    pub fn message(self) -> &'static str {
        match self {
            Violation::FullscreenExited => "Fullscreen mode was exited.",
            Violation::TabHidden => "The quiz tab was hidden.",
            Violation::MultipleFaces => "Multiple faces detected.",
            Violation::NoFace => "No face detected.",
            Violation::Noise => "Background noise detected.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub violation: Violation,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitReason {
    Manual,
    WarningCeiling,
    ContextViolation(Violation),
    WindowExpired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Pending,
    Scored(QuizResultView),
    Rejected {
        rejection: Option<Rejection>,
        message: String,
    },
    /// The request never produced a server answer. The frozen payload can
    /// be sent again with [`Event::RetrySubmission`].
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    /// `requesting` is set while device access is being acquired, so a
    /// second grant cannot open devices of its own.
    PermissionGate {
        denial: Option<String>,
        requesting: bool,
    },
    InProgress,
    ConfirmingSubmit {
        attempted: usize,
        unanswered: usize,
    },
    Submitted {
        reason: SubmitReason,
        outcome: SubmissionOutcome,
    },
    /// The server refused to serve the quiz. Terminal.
    Rejected {
        rejection: Option<Rejection>,
        message: String,
    },
    /// Torn down before submission. Terminal.
    Abandoned,
}

#[derive(Debug, Clone)]
pub enum Event {
    QuizLoaded(StudentQuiz),
    LoadRejected {
        rejection: Option<Rejection>,
        message: String,
    },
    /// The student asked to begin. Answered with [`Effect::AcquireDevices`]
    /// only when no other request is in flight.
    PermissionsRequested,
    PermissionsGranted {
        fullscreen: bool,
    },
    PermissionsDenied(String),
    SelectAnswer {
        question_id: String,
        option: usize,
    },
    Goto(usize),
    Next,
    Previous,
    RequestSubmit,
    CancelSubmit,
    ConfirmSubmit,
    ViolationDetected {
        violation: Violation,
        at: DateTime<Utc>,
    },
    WindowExpired,
    SubmissionSucceeded(QuizResultView),
    SubmissionRejected {
        rejection: Option<Rejection>,
        message: String,
    },
    SubmissionFailed(String),
    RetrySubmission,
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AcquireDevices,
    StartMonitor,
    StopMonitor,
    ReleaseCapture,
    ExitFullscreen,
    Submit(Vec<AnswerSubmission>),
    Warn {
        violation: Violation,
        warnings: u32,
        ceiling: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    quiz_id: Uuid,
    phase: Phase,
    quiz: Option<StudentQuiz>,
    answers: HashMap<String, usize>,
    position: usize,
    warnings: u32,
    ceiling: u32,
    submitted: bool,
    frozen_payload: Option<Vec<AnswerSubmission>>,
    violations: Vec<ViolationRecord>,
    fullscreen_active: bool,
}

impl Session {
    pub fn new(quiz_id: Uuid, ceiling: u32) -> Self {
        Self {
            quiz_id,
            phase: Phase::Loading,
            quiz: None,
            answers: HashMap::new(),
            position: 0,
            warnings: 0,
            ceiling: ceiling.max(1),
            submitted: false,
            frozen_payload: None,
            violations: Vec::new(),
            fullscreen_active: false,
        }
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn quiz(&self) -> Option<&StudentQuiz> {
        self.quiz.as_ref()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current_question(&self) -> Option<&StudentQuestion> {
        self.quiz.as_ref()?.questions.get(self.position)
    }

    pub fn selected(&self, question_id: &str) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn violations(&self) -> &[ViolationRecord] {
        &self.violations
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// The answers as they were when the latch closed.
    pub fn frozen_payload(&self) -> Option<&[AnswerSubmission]> {
        self.frozen_payload.as_deref()
    }

    /// Whether the violation monitor should be running.
    pub fn is_monitoring(&self) -> bool {
        matches!(self.phase, Phase::InProgress | Phase::ConfirmingSubmit { .. })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.quiz.as_ref().is_some_and(|q| now >= q.available_to)
    }

    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::QuizLoaded(quiz) => {
                if self.phase == Phase::Loading {
                    self.quiz = Some(quiz);
                    self.phase = Phase::PermissionGate {
                        denial: None,
                        requesting: false,
                    };
                }
                Vec::new()
            }
            Event::LoadRejected { rejection, message } => {
                if self.phase == Phase::Loading {
                    self.phase = Phase::Rejected { rejection, message };
                }
                Vec::new()
            }
            Event::PermissionsRequested => match &mut self.phase {
                Phase::PermissionGate { requesting, .. } if !*requesting => {
                    *requesting = true;
                    vec![Effect::AcquireDevices]
                }
                _ => Vec::new(),
            },
            Event::PermissionsGranted { fullscreen } => {
                if matches!(self.phase, Phase::PermissionGate { .. }) {
                    self.fullscreen_active = fullscreen;
                    self.phase = Phase::InProgress;
                    vec![Effect::StartMonitor]
                } else {
                    // Devices were opened for a session that has moved on.
                    let mut effects = vec![Effect::ReleaseCapture];
                    if fullscreen {
                        effects.push(Effect::ExitFullscreen);
                    }
                    effects
                }
            }
            Event::PermissionsDenied(reason) => {
                if matches!(self.phase, Phase::PermissionGate { .. }) {
                    self.phase = Phase::PermissionGate {
                        denial: Some(reason),
                        requesting: false,
                    };
                }
                Vec::new()
            }
            Event::SelectAnswer {
                question_id,
                option,
            } => {
                if self.phase == Phase::InProgress && self.is_valid_choice(&question_id, option) {
                    self.answers.insert(question_id, option);
                }
                Vec::new()
            }
            Event::Goto(index) => {
                self.navigate(index);
                Vec::new()
            }
            Event::Next => {
                self.navigate(self.position.saturating_add(1));
                Vec::new()
            }
            Event::Previous => {
                self.navigate(self.position.saturating_sub(1));
                Vec::new()
            }
            Event::RequestSubmit => {
                if self.phase == Phase::InProgress {
                    let attempted = self.answers.len();
                    self.phase = Phase::ConfirmingSubmit {
                        attempted,
                        unanswered: self.question_count().saturating_sub(attempted),
                    };
                }
                Vec::new()
            }
            Event::CancelSubmit => {
                if matches!(self.phase, Phase::ConfirmingSubmit { .. }) {
                    self.phase = Phase::InProgress;
                }
                Vec::new()
            }
            Event::ConfirmSubmit => {
                if matches!(self.phase, Phase::ConfirmingSubmit { .. }) {
                    self.enter_submitted(SubmitReason::Manual)
                } else {
                    Vec::new()
                }
            }
            Event::ViolationDetected { violation, at } => self.record_violation(violation, at),
            Event::WindowExpired => {
                if self.is_monitoring() {
                    self.enter_submitted(SubmitReason::WindowExpired)
                } else {
                    Vec::new()
                }
            }
            Event::SubmissionSucceeded(result) => {
                self.settle(SubmissionOutcome::Scored(result));
                Vec::new()
            }
            Event::SubmissionRejected { rejection, message } => {
                self.settle(SubmissionOutcome::Rejected { rejection, message });
                Vec::new()
            }
            Event::SubmissionFailed(message) => {
                self.settle(SubmissionOutcome::Failed(message));
                Vec::new()
            }
            Event::RetrySubmission => match (&mut self.phase, &self.frozen_payload) {
                (
                    Phase::Submitted {
                        outcome: outcome @ SubmissionOutcome::Failed(_),
                        ..
                    },
                    Some(payload),
                ) => {
                    *outcome = SubmissionOutcome::Pending;
                    vec![Effect::Submit(payload.clone())]
                }
                _ => Vec::new(),
            },
            Event::Teardown => self.teardown(),
        }
    }

    fn question_count(&self) -> usize {
        self.quiz.as_ref().map_or(0, |q| q.questions.len())
    }

    fn is_valid_choice(&self, question_id: &str, option: usize) -> bool {
        self.quiz.as_ref().is_some_and(|quiz| {
            quiz.questions
                .iter()
                .any(|q| q.id == question_id && option < q.options.len())
        })
    }

    fn navigate(&mut self, index: usize) {
        if self.phase != Phase::InProgress {
            return;
        }
        let last = self.question_count().saturating_sub(1);
        self.position = index.min(last);
    }

    fn record_violation(&mut self, violation: Violation, at: DateTime<Utc>) -> Vec<Effect> {
        if !self.is_monitoring() {
            return Vec::new();
        }

        self.warnings += 1;
        self.violations.push(ViolationRecord { violation, at });
        if violation == Violation::FullscreenExited {
            self.fullscreen_active = false;
        }

        if violation.is_context() {
            self.enter_submitted(SubmitReason::ContextViolation(violation))
        } else if self.warnings >= self.ceiling {
            self.enter_submitted(SubmitReason::WarningCeiling)
        } else {
            vec![Effect::Warn {
                violation,
                warnings: self.warnings,
                ceiling: self.ceiling,
            }]
        }
    }

    fn enter_submitted(&mut self, reason: SubmitReason) -> Vec<Effect> {
        if self.submitted {
            return Vec::new();
        }
        self.submitted = true;

        let payload = self.answer_payload();
        self.frozen_payload = Some(payload.clone());
        self.phase = Phase::Submitted {
            reason,
            outcome: SubmissionOutcome::Pending,
        };

        let mut effects = self.release_effects();
        effects.push(Effect::Submit(payload));
        effects
    }

    fn settle(&mut self, result: SubmissionOutcome) {
        if let Phase::Submitted { outcome, .. } = &mut self.phase {
            if *outcome == SubmissionOutcome::Pending {
                *outcome = result;
            }
        }
    }

    fn teardown(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Submitted { .. } | Phase::Rejected { .. } | Phase::Abandoned => Vec::new(),
            Phase::InProgress | Phase::ConfirmingSubmit { .. } => {
                self.phase = Phase::Abandoned;
                self.release_effects()
            }
            Phase::Loading | Phase::PermissionGate { .. } => {
                self.phase = Phase::Abandoned;
                vec![Effect::ReleaseCapture]
            }
        }
    }

    fn release_effects(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::StopMonitor, Effect::ReleaseCapture];
        if self.fullscreen_active {
            self.fullscreen_active = false;
            effects.push(Effect::ExitFullscreen);
        }
        effects
    }

    /// Selected answers in served question order.
    fn answer_payload(&self) -> Vec<AnswerSubmission> {
        let Some(quiz) = &self.quiz else {
            return Vec::new();
        };
        quiz.questions
            .iter()
            .filter_map(|q| {
                self.answers.get(&q.id).map(|&option| AnswerSubmission {
                    question_id: q.id.clone(),
                    selected_option: option as i64,
                })
            })
            .collect()
    }
}
