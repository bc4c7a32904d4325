use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The graded outcome of one student's attempt. At most one exists per
/// (quiz, user); it is written once and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: Decimal,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuizResult {
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: Decimal,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
}
