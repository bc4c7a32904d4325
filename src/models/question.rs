use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored multiple-choice question. Carries the answer key, so it never
/// leaves the server as-is; see `StudentQuestion` for the attempt payload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub position: i32,
    pub question_text: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_option: i32,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option: i32,
}

impl NewQuestion {
    pub fn correct_index_in_bounds(&self) -> bool {
        self.correct_option >= 0 && (self.correct_option as usize) < self.options.len()
    }
}
