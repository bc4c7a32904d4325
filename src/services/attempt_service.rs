use std::sync::Arc;

use uuid::Uuid;

use crate::database::QuizStore;
use crate::dto::quiz_dto::{AnswerSubmission, StudentQuestion, StudentQuiz};
use crate::error::{Error, Rejection, Result};
use crate::models::quiz::WindowState;
use crate::models::quiz_result::{NewQuizResult, QuizResult};
use crate::services::grading_service::GradingService;
use crate::utils::shuffle::fisher_yates;
use crate::utils::time::Clock;

/// Serves quizzes for an attempt and grades submissions, enforcing the
/// availability window and the one-result-per-student rule.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn QuizStore>,
    clock: Arc<dyn Clock>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn QuizStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn fetch_for_attempt(&self, quiz_id: Uuid, user_id: &str) -> Result<StudentQuiz> {
        if self.store.find_result(quiz_id, user_id).await?.is_some() {
            tracing::warn!(%quiz_id, user_id, "Re-attempt refused");
            return Err(Error::rejected(Rejection::AlreadyAttempted));
        }

        let quiz = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::rejected(Rejection::NotFound))?;

        match quiz.window_state(self.clock.now()) {
            WindowState::NotYetOpen => return Err(Error::rejected(Rejection::NotYetAvailable)),
            WindowState::Closed => {
                return Err(Error::rejected_with(
                    Rejection::Expired,
                    "This quiz is no longer available.",
                ))
            }
            WindowState::Open => {}
        }

        let mut questions: Vec<StudentQuestion> = self
            .store
            .find_questions(quiz_id)
            .await?
            .into_iter()
            .map(StudentQuestion::from)
            .collect();
        fisher_yates(&mut questions, &mut rand::thread_rng());

        tracing::info!(%quiz_id, user_id, questions = questions.len(), "Quiz served for attempt");

        Ok(StudentQuiz {
            id: quiz.id,
            title: quiz.title,
            subject: quiz.subject,
            created_by: quiz.created_by,
            available_to: quiz.available_to,
            questions,
        })
    }

    /// Grades and records a submission. A second submission for the same
    /// (quiz, user) is refused whatever its content, including when two
    /// requests race: the store's conditional insert decides the winner.
    pub async fn submit(
        &self,
        quiz_id: Uuid,
        user_id: &str,
        answers: &[AnswerSubmission],
    ) -> Result<QuizResult> {
        let quiz = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::rejected(Rejection::NotFound))?;

        if self.store.find_result(quiz_id, user_id).await?.is_some() {
            tracing::warn!(%quiz_id, user_id, "Duplicate submission refused");
            return Err(Error::rejected(Rejection::AlreadySubmitted));
        }

        if self.clock.now() >= quiz.available_to {
            tracing::warn!(%quiz_id, user_id, "Submission after window close refused");
            return Err(Error::rejected(Rejection::Expired));
        }

        let questions = self.store.find_questions(quiz_id).await?;
        let outcome = GradingService::grade(&questions, answers);

        let stored = self
            .store
            .insert_result_if_absent(NewQuizResult {
                quiz_id,
                user_id: user_id.to_string(),
                score: outcome.score,
                total_questions: outcome.total_questions,
                correct_answers: outcome.correct_answers,
                wrong_answers: outcome.wrong_answers,
            })
            .await?;

        match stored {
            Some(result) => {
                tracing::info!(
                    %quiz_id,
                    user_id,
                    score = %result.score,
                    correct = result.correct_answers,
                    wrong = result.wrong_answers,
                    "Quiz graded"
                );
                Ok(result)
            }
            None => {
                tracing::warn!(%quiz_id, user_id, "Concurrent submission lost the insert race");
                Err(Error::rejected(Rejection::AlreadySubmitted))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryQuizStore;
    use crate::models::question::{NewQuestion, Question};
    use crate::models::quiz::NewQuiz;
    use crate::utils::time::ManualClock;
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;

    struct Fixture {
        service: AttemptService,
        clock: Arc<ManualClock>,
        quiz_id: Uuid,
        questions: Vec<Question>,
        opens: DateTime<Utc>,
        closes: DateTime<Utc>,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn QuizStore> = Arc::new(MemoryQuizStore::new());
        let opens = Utc::now();
        let closes = opens + Duration::hours(2);
        let clock = Arc::new(ManualClock::new(opens + Duration::minutes(10)));

        let (quiz, questions) = store
            .create_quiz(NewQuiz {
                title: "Fractions".into(),
                subject: "Maths".into(),
                created_by: "edu-1".into(),
                available_from: opens,
                available_to: closes,
                questions: (0..4)
                    .map(|i| NewQuestion {
                        question_text: format!("Q{}", i),
                        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        correct_option: i,
                    })
                    .collect(),
            })
            .await
            .unwrap();

        Fixture {
            service: AttemptService::new(store, clock.clone()),
            clock,
            quiz_id: quiz.id,
            questions,
            opens,
            closes,
        }
    }

    fn pick(q: &Question, option: i64) -> AnswerSubmission {
        AnswerSubmission {
            question_id: q.id.to_string(),
            selected_option: option,
        }
    }

    #[tokio::test]
    async fn correct_correct_wrong_unanswered_scores_one_point_seven_five() {
        let f = fixture().await;
        let answers = vec![
            pick(&f.questions[0], 0),
            pick(&f.questions[1], 1),
            pick(&f.questions[2], 0),
        ];

        let result = f.service.submit(f.quiz_id, "stu-1", &answers).await.unwrap();

        assert_eq!(result.score, Decimal::new(175, 2));
        assert_eq!(result.correct_answers, 2);
        assert_eq!(result.wrong_answers, 1);
        assert_eq!(result.total_questions, 4);
    }

    #[tokio::test]
    async fn second_submission_is_always_already_submitted() {
        let f = fixture().await;
        f.service.submit(f.quiz_id, "stu-1", &[]).await.unwrap();

        let perfect: Vec<_> = f.questions.iter().map(|q| pick(q, q.correct_option as i64)).collect();
        let err = f.service.submit(f.quiz_id, "stu-1", &perfect).await.unwrap_err();

        assert_eq!(err.rejection(), Some(Rejection::AlreadySubmitted));
    }

    #[tokio::test]
    async fn racing_submissions_record_one_result() {
        let f = fixture().await;
        let (a, b) = tokio::join!(
            f.service.submit(f.quiz_id, "stu-1", &[]),
            f.service.submit(f.quiz_id, "stu-1", &[])
        );
        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn submission_at_window_close_is_expired() {
        let f = fixture().await;
        f.clock.set(f.closes);

        let err = f.service.submit(f.quiz_id, "stu-1", &[]).await.unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::Expired));
    }

    #[tokio::test]
    async fn unknown_quiz_is_not_found_on_both_paths() {
        let f = fixture().await;
        let missing = Uuid::new_v4();

        let fetch = f.service.fetch_for_attempt(missing, "stu-1").await.unwrap_err();
        let submit = f.service.submit(missing, "stu-1", &[]).await.unwrap_err();

        assert_eq!(fetch.rejection(), Some(Rejection::NotFound));
        assert_eq!(submit.rejection(), Some(Rejection::NotFound));
    }

    #[tokio::test]
    async fn fetch_respects_the_window() {
        let f = fixture().await;

        f.clock.set(f.opens - Duration::seconds(1));
        let early = f.service.fetch_for_attempt(f.quiz_id, "stu-1").await.unwrap_err();
        assert_eq!(early.rejection(), Some(Rejection::NotYetAvailable));

        f.clock.set(f.closes + Duration::minutes(1));
        let late = f.service.fetch_for_attempt(f.quiz_id, "stu-1").await.unwrap_err();
        assert_eq!(late.rejection(), Some(Rejection::Expired));
    }

    #[tokio::test]
    async fn fetch_after_submitting_is_already_attempted() {
        let f = fixture().await;
        f.service.submit(f.quiz_id, "stu-1", &[]).await.unwrap();

        let err = f.service.fetch_for_attempt(f.quiz_id, "stu-1").await.unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::AlreadyAttempted));

        // other students are unaffected
        assert!(f.service.fetch_for_attempt(f.quiz_id, "stu-2").await.is_ok());
    }

    #[tokio::test]
    async fn served_quiz_contains_every_question_without_answer_key() {
        let f = fixture().await;
        let served = f.service.fetch_for_attempt(f.quiz_id, "stu-1").await.unwrap();

        let mut served_ids: Vec<String> = served.questions.iter().map(|q| q.id.clone()).collect();
        let mut stored_ids: Vec<String> = f.questions.iter().map(|q| q.id.to_string()).collect();
        served_ids.sort();
        stored_ids.sort();
        assert_eq!(served_ids, stored_ids);

        let payload = serde_json::to_value(&served).unwrap();
        let text = payload.to_string();
        assert!(!text.contains("correct"), "answer key leaked: {}", text);
    }
}
