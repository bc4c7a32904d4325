use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz::{NewQuiz, Quiz};
use crate::models::quiz_result::{NewQuizResult, QuizResult};

/// Persistence capability the quiz core runs against.
///
/// `insert_result_if_absent` is the single atomic conditional insert that
/// guards the one-result-per-(quiz, user) invariant; callers must not
/// emulate it with `find_result` followed by a plain insert.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Writes the quiz and all of its questions as one unit.
    async fn create_quiz(&self, quiz: NewQuiz) -> Result<(Quiz, Vec<Question>)>;

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>>;

    /// Questions of a quiz in authoring order.
    async fn find_questions(&self, quiz_id: Uuid) -> Result<Vec<Question>>;

    /// Quizzes whose window contains `now`.
    async fn list_open_quizzes(&self, now: DateTime<Utc>) -> Result<Vec<Quiz>>;

    /// Quizzes created by `created_by`, newest first.
    async fn list_quizzes_by_creator(&self, created_by: &str) -> Result<Vec<Quiz>>;

    async fn count_questions(&self, quiz_id: Uuid) -> Result<i64>;

    /// Removes the quiz together with its questions and results.
    async fn delete_quiz(&self, quiz_id: Uuid) -> Result<bool>;

    async fn find_result(&self, quiz_id: Uuid, user_id: &str) -> Result<Option<QuizResult>>;

    /// Creates the result unless one already exists for the same
    /// (quiz, user). Returns `None` when the key was already taken.
    async fn insert_result_if_absent(&self, result: NewQuizResult) -> Result<Option<QuizResult>>;

    /// Results for a quiz, highest score first.
    async fn list_results(&self, quiz_id: Uuid) -> Result<Vec<QuizResult>>;
}
