use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::database::QuizStore;
use crate::dto::quiz_dto::{CreateQuizPayload, ManagedQuiz, QuizSummary};
use crate::error::{Error, Rejection, Result};
use crate::middleware::auth::CallerIdentity;
use crate::models::question::Question;
use crate::models::quiz::Quiz;
use crate::models::quiz_result::QuizResult;
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct QuizService {
    store: Arc<dyn QuizStore>,
    clock: Arc<dyn Clock>,
}

impl QuizService {
    pub fn new(store: Arc<dyn QuizStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_quiz(
        &self,
        payload: CreateQuizPayload,
        creator: &CallerIdentity,
    ) -> Result<(Quiz, Vec<Question>)> {
        payload.validate()?;
        if payload.questions.is_empty() {
            return Err(Error::BadRequest("A quiz needs at least one question".to_string()));
        }
        if payload.available_from >= payload.available_to {
            return Err(Error::BadRequest(
                "availableFrom must be earlier than availableTo".to_string(),
            ));
        }
        for (idx, question) in payload.questions.iter().enumerate() {
            question.validate()?;
            if question.options.iter().any(|o| o.trim().is_empty()) {
                return Err(Error::BadRequest(format!(
                    "Question {} has an empty option",
                    idx + 1
                )));
            }
        }

        let new_quiz = payload.into_new_quiz(&creator.user_id);
        if let Some(idx) = new_quiz
            .questions
            .iter()
            .position(|q| !q.correct_index_in_bounds())
        {
            return Err(Error::BadRequest(format!(
                "Question {} has a correct answer index outside its options",
                idx + 1
            )));
        }

        let (quiz, questions) = self.store.create_quiz(new_quiz).await?;
        tracing::info!(quiz_id = %quiz.id, creator = %creator.user_id, questions = questions.len(), "Quiz created");
        Ok((quiz, questions))
    }

    pub async fn list_available(&self) -> Result<Vec<QuizSummary>> {
        let quizzes = self.store.list_open_quizzes(self.clock.now()).await?;
        Ok(quizzes.into_iter().map(QuizSummary::from).collect())
    }

    pub async fn list_managed(&self, creator: &CallerIdentity) -> Result<Vec<ManagedQuiz>> {
        let quizzes = self.store.list_quizzes_by_creator(&creator.user_id).await?;
        let mut managed = Vec::with_capacity(quizzes.len());
        for quiz in quizzes {
            let question_count = self.store.count_questions(quiz.id).await? as usize;
            managed.push(ManagedQuiz {
                id: quiz.id,
                title: quiz.title,
                subject: quiz.subject,
                available_from: quiz.available_from,
                available_to: quiz.available_to,
                question_count,
                created_at: quiz.created_at,
            });
        }
        Ok(managed)
    }

    /// Results of a quiz, best score first. Visible to the quiz's creator
    /// and to admins.
    pub async fn results(&self, quiz_id: Uuid, caller: &CallerIdentity) -> Result<(Quiz, Vec<QuizResult>)> {
        let quiz = self.owned_quiz(quiz_id, caller, true).await?;
        let results = self.store.list_results(quiz_id).await?;
        Ok((quiz, results))
    }

    /// Deletes a quiz with its questions and results. Only the creator may
    /// do this.
    pub async fn delete_quiz(&self, quiz_id: Uuid, caller: &CallerIdentity) -> Result<()> {
        self.owned_quiz(quiz_id, caller, false).await?;
        if !self.store.delete_quiz(quiz_id).await? {
            return Err(Error::rejected(Rejection::NotFound));
        }
        tracing::info!(%quiz_id, by = %caller.user_id, "Quiz deleted");
        Ok(())
    }

    async fn owned_quiz(&self, quiz_id: Uuid, caller: &CallerIdentity, admin_allowed: bool) -> Result<Quiz> {
        let quiz = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::rejected(Rejection::NotFound))?;

        let is_owner = quiz.created_by == caller.user_id;
        if !is_owner && !(admin_allowed && caller.role.is_admin()) {
            tracing::warn!(%quiz_id, caller = %caller.user_id, "Access to foreign quiz refused");
            return Err(Error::rejected_with(
                Rejection::Forbidden,
                "Only the quiz's creator can do this.",
            ));
        }
        Ok(quiz)
    }
}
