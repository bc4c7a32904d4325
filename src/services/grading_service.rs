use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dto::quiz_dto::AnswerSubmission;
use crate::models::question::Question;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub score: Decimal,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
}

pub struct GradingService;

impl GradingService {
    pub fn correct_award() -> Decimal {
        Decimal::ONE
    }

    pub fn wrong_penalty() -> Decimal {
        Decimal::new(25, 2)
    }

    /// Negative-marking grade of a submission.
    ///
    /// +1 per correct answer, -0.25 per wrong one, nothing for questions
    /// left out of `answers`. Question ids are matched as UUIDs, in any
    /// spelling `Uuid::parse_str` accepts. Answers naming a question outside
    /// the quiz are skipped, and only the first answer per question counts.
    /// The final score never drops below zero.
    pub fn grade(questions: &[Question], answers: &[AnswerSubmission]) -> GradeOutcome {
        let key: HashMap<Uuid, i32> = questions.iter().map(|q| (q.id, q.correct_option)).collect();

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut score = Decimal::ZERO;
        let mut correct_answers = 0;
        let mut wrong_answers = 0;

        for answer in answers {
            let Ok(question_id) = Uuid::parse_str(&answer.question_id) else {
                continue;
            };
            let Some(&correct) = key.get(&question_id) else {
                continue;
            };
            if !seen.insert(question_id) {
                continue;
            }

            if answer.selected_option == i64::from(correct) {
                score += Self::correct_award();
                correct_answers += 1;
            } else {
                score -= Self::wrong_penalty();
                wrong_answers += 1;
            }
        }

        GradeOutcome {
            score: score.max(Decimal::ZERO),
            total_questions: questions.len() as i32,
            correct_answers,
            wrong_answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(correct: &[i32]) -> Vec<Question> {
        let quiz_id = Uuid::new_v4();
        correct
            .iter()
            .enumerate()
            .map(|(i, &c)| Question {
                id: Uuid::new_v4(),
                quiz_id,
                position: i as i32,
                question_text: format!("Question {}", i + 1),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option: c,
            })
            .collect()
    }

    fn answer(q: &Question, option: i64) -> AnswerSubmission {
        AnswerSubmission {
            question_id: q.id.to_string(),
            selected_option: option,
        }
    }

    #[test]
    fn fully_correct_submission_scores_every_question() {
        let qs = questions(&[0, 1, 2, 3, 1]);
        let answers: Vec<_> = qs.iter().map(|q| answer(q, q.correct_option as i64)).collect();

        let outcome = GradingService::grade(&qs, &answers);

        assert_eq!(outcome.score, Decimal::new(5, 0));
        assert_eq!(outcome.correct_answers, 5);
        assert_eq!(outcome.total_questions, 5);
        assert_eq!(outcome.wrong_answers, 0);
    }

    #[test]
    fn all_wrong_is_clamped_to_zero() {
        let qs = questions(&[0, 0, 0, 0]);
        let answers: Vec<_> = qs.iter().map(|q| answer(q, 3)).collect();

        let outcome = GradingService::grade(&qs, &answers);

        assert_eq!(outcome.score, Decimal::ZERO);
        assert_eq!(outcome.wrong_answers, 4);
        assert_eq!(outcome.correct_answers, 0);
    }

    #[test]
    fn mixed_submission_applies_negative_marking() {
        let qs = questions(&[0, 1, 2, 3]);
        let answers = vec![answer(&qs[0], 0), answer(&qs[1], 1), answer(&qs[2], 0)];

        let outcome = GradingService::grade(&qs, &answers);

        assert_eq!(outcome.score, Decimal::new(175, 2));
        assert_eq!(outcome.correct_answers, 2);
        assert_eq!(outcome.wrong_answers, 1);
        assert_eq!(outcome.total_questions, 4);
    }

    #[test]
    fn unknown_question_ids_are_ignored() {
        let qs = questions(&[2]);
        let answers = vec![
            AnswerSubmission {
                question_id: "not-a-question".into(),
                selected_option: 0,
            },
            AnswerSubmission {
                question_id: Uuid::new_v4().to_string(),
                selected_option: 2,
            },
            answer(&qs[0], 2),
        ];

        let outcome = GradingService::grade(&qs, &answers);

        assert_eq!(outcome.score, Decimal::ONE);
        assert_eq!(outcome.correct_answers, 1);
        assert_eq!(outcome.wrong_answers, 0);
    }

    #[test]
    fn repeated_answers_count_once() {
        let qs = questions(&[1, 1]);
        let answers = vec![answer(&qs[0], 1), answer(&qs[0], 1), answer(&qs[0], 0)];

        let outcome = GradingService::grade(&qs, &answers);

        assert_eq!(outcome.score, Decimal::ONE);
        assert_eq!(outcome.correct_answers, 1);
        assert_eq!(outcome.wrong_answers, 0);
    }

    #[test]
    fn question_ids_match_in_any_uuid_spelling() {
        let qs = questions(&[1, 2]);
        let answers = vec![
            AnswerSubmission {
                question_id: qs[0].id.to_string().to_uppercase(),
                selected_option: 1,
            },
            AnswerSubmission {
                question_id: qs[1].id.simple().to_string(),
                selected_option: 0,
            },
            // Same question as the first entry, spelled differently.
            answer(&qs[0], 0),
        ];

        let outcome = GradingService::grade(&qs, &answers);

        assert_eq!(outcome.correct_answers, 1);
        assert_eq!(outcome.wrong_answers, 1);
        assert_eq!(outcome.score, Decimal::new(75, 2));
    }

    #[test]
    fn empty_submission_scores_zero_against_full_total() {
        let qs = questions(&[0, 1, 2]);
        let outcome = GradingService::grade(&qs, &[]);
        assert_eq!(outcome.score, Decimal::ZERO);
        assert_eq!(outcome.total_questions, 3);
    }
}
