use rust_decimal::prelude::ToPrimitive;

use crate::dto::quiz_dto::ResultExportRow;
use crate::models::quiz::Quiz;
use crate::models::quiz_result::QuizResult;

pub struct ExportService;

impl ExportService {
    /// Flattens a quiz's results into ranked rows for the reporting side.
    ///
    /// `results` is expected best-first; tied scores share a rank.
    pub fn result_rows(quiz: &Quiz, results: &[QuizResult]) -> Vec<ResultExportRow> {
        let mut rows = Vec::with_capacity(results.len());
        let mut rank = 0;
        let mut previous_score = None;

        for (idx, result) in results.iter().enumerate() {
            if previous_score != Some(result.score) {
                rank = idx + 1;
                previous_score = Some(result.score);
            }

            let score = result.score.to_f64().unwrap_or(0.0);
            let percentage = if result.total_questions > 0 {
                ((score / result.total_questions as f64) * 10000.0).round() / 100.0
            } else {
                0.0
            };

            rows.push(ResultExportRow {
                rank,
                quiz_title: quiz.title.clone(),
                subject: quiz.subject.clone(),
                user_id: result.user_id.clone(),
                score,
                total_questions: result.total_questions,
                correct_answers: result.correct_answers,
                wrong_answers: result.wrong_answers,
                unanswered: (result.total_questions - result.correct_answers - result.wrong_answers)
                    .max(0),
                percentage,
                submitted_at: result.created_at,
            });
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn result(user: &str, score: Decimal, correct: i32, wrong: i32) -> QuizResult {
        QuizResult {
            id: Uuid::new_v4(),
            quiz_id: Uuid::nil(),
            user_id: user.into(),
            score,
            total_questions: 4,
            correct_answers: correct,
            wrong_answers: wrong,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rows_are_ranked_with_ties_sharing_a_rank() {
        let now = Utc::now();
        let quiz = Quiz {
            id: Uuid::nil(),
            title: "Vectors".into(),
            subject: "Physics".into(),
            created_by: "edu".into(),
            available_from: now,
            available_to: now,
            created_at: now,
        };
        let results = vec![
            result("a", Decimal::new(3, 0), 3, 0),
            result("b", Decimal::new(175, 2), 2, 1),
            result("c", Decimal::new(175, 2), 2, 1),
            result("d", Decimal::ZERO, 0, 4),
        ];

        let rows = ExportService::result_rows(&quiz, &results);

        let ranks: Vec<usize> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
        assert_eq!(rows[1].unanswered, 1);
        assert_eq!(rows[1].percentage, 43.75);
        assert_eq!(rows[0].quiz_title, "Vectors");
    }
}
