use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::QuizStore;
use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz::{NewQuiz, Quiz};
use crate::models::quiz_result::{NewQuizResult, QuizResult};

#[derive(Default)]
struct Tables {
    quizzes: HashMap<Uuid, Quiz>,
    questions: HashMap<Uuid, Vec<Question>>,
    results: HashMap<(Uuid, String), QuizResult>,
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryQuizStore {
    tables: RwLock<Tables>,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizStore for MemoryQuizStore {
    async fn create_quiz(&self, new_quiz: NewQuiz) -> Result<(Quiz, Vec<Question>)> {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: new_quiz.title,
            subject: new_quiz.subject,
            created_by: new_quiz.created_by,
            available_from: new_quiz.available_from,
            available_to: new_quiz.available_to,
            created_at: Utc::now(),
        };
        let questions: Vec<Question> = new_quiz
            .questions
            .into_iter()
            .enumerate()
            .map(|(position, q)| Question {
                id: Uuid::new_v4(),
                quiz_id: quiz.id,
                position: position as i32,
                question_text: q.question_text,
                options: q.options,
                correct_option: q.correct_option,
            })
            .collect();

        let mut tables = self.tables.write().await;
        tables.quizzes.insert(quiz.id, quiz.clone());
        tables.questions.insert(quiz.id, questions.clone());
        Ok((quiz, questions))
    }

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>> {
        Ok(self.tables.read().await.quizzes.get(&quiz_id).cloned())
    }

    async fn find_questions(&self, quiz_id: Uuid) -> Result<Vec<Question>> {
        Ok(self
            .tables
            .read()
            .await
            .questions
            .get(&quiz_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_open_quizzes(&self, now: DateTime<Utc>) -> Result<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let mut open: Vec<Quiz> = tables
            .quizzes
            .values()
            .filter(|q| q.is_open_at(now))
            .cloned()
            .collect();
        open.sort_by_key(|q| q.available_to);
        Ok(open)
    }

    async fn list_quizzes_by_creator(&self, created_by: &str) -> Result<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let mut mine: Vec<Quiz> = tables
            .quizzes
            .values()
            .filter(|q| q.created_by == created_by)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn count_questions(&self, quiz_id: Uuid) -> Result<i64> {
        Ok(self
            .tables
            .read()
            .await
            .questions
            .get(&quiz_id)
            .map(|qs| qs.len() as i64)
            .unwrap_or(0))
    }

    async fn delete_quiz(&self, quiz_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.quizzes.remove(&quiz_id).is_some();
        tables.questions.remove(&quiz_id);
        tables.results.retain(|(qid, _), _| *qid != quiz_id);
        Ok(removed)
    }

    async fn find_result(&self, quiz_id: Uuid, user_id: &str) -> Result<Option<QuizResult>> {
        Ok(self
            .tables
            .read()
            .await
            .results
            .get(&(quiz_id, user_id.to_string()))
            .cloned())
    }

    async fn insert_result_if_absent(&self, new_result: NewQuizResult) -> Result<Option<QuizResult>> {
        let mut tables = self.tables.write().await;
        let key = (new_result.quiz_id, new_result.user_id.clone());
        if tables.results.contains_key(&key) {
            return Ok(None);
        }
        let stored = QuizResult {
            id: Uuid::new_v4(),
            quiz_id: new_result.quiz_id,
            user_id: new_result.user_id,
            score: new_result.score,
            total_questions: new_result.total_questions,
            correct_answers: new_result.correct_answers,
            wrong_answers: new_result.wrong_answers,
            created_at: Utc::now(),
        };
        tables.results.insert(key, stored.clone());
        Ok(Some(stored))
    }

    async fn list_results(&self, quiz_id: Uuid) -> Result<Vec<QuizResult>> {
        let tables = self.tables.read().await;
        let mut results: Vec<QuizResult> = tables
            .results
            .values()
            .filter(|r| r.quiz_id == quiz_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::NewQuestion;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn sample_quiz(created_by: &str) -> NewQuiz {
        let now = Utc::now();
        NewQuiz {
            title: "Cells".into(),
            subject: "Biology".into(),
            created_by: created_by.into(),
            available_from: now - chrono::Duration::hours(1),
            available_to: now + chrono::Duration::hours(1),
            questions: vec![NewQuestion {
                question_text: "Powerhouse of the cell?".into(),
                options: vec!["Nucleus".into(), "Mitochondria".into()],
                correct_option: 1,
            }],
        }
    }

    fn result_for(quiz_id: Uuid, user: &str, score: i64) -> NewQuizResult {
        NewQuizResult {
            quiz_id,
            user_id: user.into(),
            score: Decimal::new(score, 0),
            total_questions: 1,
            correct_answers: score as i32,
            wrong_answers: 0,
        }
    }

    #[tokio::test]
    async fn second_insert_for_same_key_is_refused() {
        let store = MemoryQuizStore::new();
        let (quiz, _) = store.create_quiz(sample_quiz("edu")).await.unwrap();

        let first = store.insert_result_if_absent(result_for(quiz.id, "stu", 1)).await.unwrap();
        let second = store.insert_result_if_absent(result_for(quiz.id, "stu", 0)).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        let stored = store.find_result(quiz.id, "stu").await.unwrap().unwrap();
        assert_eq!(stored.score, Decimal::new(1, 0));
    }

    #[tokio::test]
    async fn concurrent_inserts_create_exactly_one_result() {
        let store = Arc::new(MemoryQuizStore::new());
        let (quiz, _) = store.create_quiz(sample_quiz("edu")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_result_if_absent(result_for(quiz.id, "stu", 1)).await.unwrap()
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_questions_and_results() {
        let store = MemoryQuizStore::new();
        let (quiz, _) = store.create_quiz(sample_quiz("edu")).await.unwrap();
        store.insert_result_if_absent(result_for(quiz.id, "stu", 1)).await.unwrap();

        assert!(store.delete_quiz(quiz.id).await.unwrap());
        assert!(store.find_quiz(quiz.id).await.unwrap().is_none());
        assert!(store.find_questions(quiz.id).await.unwrap().is_empty());
        assert!(store.list_results(quiz.id).await.unwrap().is_empty());
        assert!(!store.delete_quiz(quiz.id).await.unwrap());
    }
}
