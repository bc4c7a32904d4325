use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::QuizStore;
use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz::{NewQuiz, Quiz};
use crate::models::quiz_result::{NewQuizResult, QuizResult};

#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn create_quiz(&self, new_quiz: NewQuiz) -> Result<(Quiz, Vec<Question>)> {
        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (title, subject, created_by, available_from, available_to)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, subject, created_by, available_from, available_to, created_at
            "#,
        )
        .bind(&new_quiz.title)
        .bind(&new_quiz.subject)
        .bind(&new_quiz.created_by)
        .bind(new_quiz.available_from)
        .bind(new_quiz.available_to)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(new_quiz.questions.len());
        for (position, q) in new_quiz.questions.iter().enumerate() {
            let question = sqlx::query_as::<_, Question>(
                r#"
                INSERT INTO questions (quiz_id, position, question_text, options, correct_option)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, quiz_id, position, question_text, options, correct_option
                "#,
            )
            .bind(quiz.id)
            .bind(position as i32)
            .bind(&q.question_text)
            .bind(&q.options)
            .bind(q.correct_option)
            .fetch_one(&mut *tx)
            .await?;
            questions.push(question);
        }

        tx.commit().await?;
        Ok((quiz, questions))
    }

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"SELECT id, title, subject, created_by, available_from, available_to, created_at
               FROM quizzes WHERE id = $1"#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz)
    }

    async fn find_questions(&self, quiz_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT id, quiz_id, position, question_text, options, correct_option
               FROM questions WHERE quiz_id = $1 ORDER BY position ASC"#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn list_open_quizzes(&self, now: DateTime<Utc>) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, title, subject, created_by, available_from, available_to, created_at
            FROM quizzes
            WHERE available_from <= $1 AND available_to > $1
            ORDER BY available_to ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    async fn list_quizzes_by_creator(&self, created_by: &str) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, title, subject, created_by, available_from, available_to, created_at
            FROM quizzes
            WHERE created_by = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(created_by)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    async fn count_questions(&self, quiz_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM questions WHERE quiz_id = $1"#)
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_quiz(&self, quiz_id: Uuid) -> Result<bool> {
        // questions and quiz_results cascade through their foreign keys
        let result = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_result(&self, quiz_id: Uuid, user_id: &str) -> Result<Option<QuizResult>> {
        let result = sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT id, quiz_id, user_id, score, total_questions, correct_answers, wrong_answers, created_at
            FROM quiz_results
            WHERE quiz_id = $1 AND user_id = $2
            "#,
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }

    async fn insert_result_if_absent(&self, new_result: NewQuizResult) -> Result<Option<QuizResult>> {
        let inserted = sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO quiz_results (quiz_id, user_id, score, total_questions, correct_answers, wrong_answers)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (quiz_id, user_id) DO NOTHING
            RETURNING id, quiz_id, user_id, score, total_questions, correct_answers, wrong_answers, created_at
            "#,
        )
        .bind(new_result.quiz_id)
        .bind(&new_result.user_id)
        .bind(new_result.score)
        .bind(new_result.total_questions)
        .bind(new_result.correct_answers)
        .bind(new_result.wrong_answers)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn list_results(&self, quiz_id: Uuid) -> Result<Vec<QuizResult>> {
        let results = sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT id, quiz_id, user_id, score, total_questions, correct_answers, wrong_answers, created_at
            FROM quiz_results
            WHERE quiz_id = $1
            ORDER BY score DESC, created_at ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(results)
    }
}
