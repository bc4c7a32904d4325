use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{NewQuestion, Question};
use crate::models::quiz::{NewQuiz, Quiz};
use crate::models::quiz_result::QuizResult;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 2, max = 10))]
    pub options: Vec<String>,
    pub correct_answer_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub questions: Vec<CreateQuestionPayload>,
}

impl CreateQuizPayload {
    pub fn into_new_quiz(self, created_by: &str) -> NewQuiz {
        NewQuiz {
            title: self.title.trim().to_string(),
            subject: self.subject.trim().to_string(),
            created_by: created_by.to_string(),
            available_from: self.available_from,
            available_to: self.available_to,
            questions: self
                .questions
                .into_iter()
                .map(|q| NewQuestion {
                    question_text: q.question_text,
                    options: q.options,
                    correct_option: q.correct_answer_index,
                })
                .collect(),
        }
    }
}

/// Question as served for an attempt: no answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuestion {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
}

impl From<Question> for StudentQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id.to_string(),
            question_text: q.question_text,
            options: q.options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuiz {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub created_by: String,
    pub available_to: DateTime<Utc>,
    pub questions: Vec<StudentQuestion>,
}

/// Listing entry for students. Window and question content are left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub created_by: String,
}

impl From<Quiz> for QuizSummary {
    fn from(q: Quiz) -> Self {
        Self {
            id: q.id,
            title: q.title,
            subject: q.subject,
            created_by: q.created_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedQuiz {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub available_from: DateTime<Utc>,
    pub available_to: DateTime<Utc>,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: String,
    pub selected_option: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<AnswerSubmission>,
}

/// The graded result as shown to the student. This is the only source of
/// the displayed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultView {
    pub quiz_id: Uuid,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub submitted_at: DateTime<Utc>,
}

impl From<&QuizResult> for QuizResultView {
    fn from(r: &QuizResult) -> Self {
        Self {
            quiz_id: r.quiz_id,
            score: r.score.to_f64().unwrap_or(0.0),
            total_questions: r.total_questions,
            correct_answers: r.correct_answers,
            wrong_answers: r.wrong_answers,
            submitted_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub user_id: String,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub submitted_at: DateTime<Utc>,
}

impl From<&QuizResult> for ResultEntry {
    fn from(r: &QuizResult) -> Self {
        Self {
            user_id: r.user_id.clone(),
            score: r.score.to_f64().unwrap_or(0.0),
            total_questions: r.total_questions,
            correct_answers: r.correct_answers,
            wrong_answers: r.wrong_answers,
            submitted_at: r.created_at,
        }
    }
}

/// Flat row handed to the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultExportRow {
    pub rank: usize,
    pub quiz_title: String,
    pub subject: String,
    pub user_id: String,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub unanswered: i32,
    pub percentage: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeQuizResponse {
    pub success: bool,
    pub quiz: StudentQuiz,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizResponse {
    pub success: bool,
    pub message: String,
    pub result: QuizResultView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
}
