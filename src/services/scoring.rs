use serde::Serialize;

use crate::models::question::Question;

#[derive(Debug, Clone, Serialize)]
pub struct GradedAnswer {
    pub question_id: i32,
    pub answer_text: String,
    pub is_correct: bool,
    pub points_earned: i32,
    pub max_points: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub score: i32,
    pub max_score: i32,
    pub graded: Vec<GradedAnswer>,
}

/// Exact-match comparator: both sides are trimmed of surrounding whitespace
/// and compared case-sensitively. Full points on a match, zero otherwise.
/// No partial credit.
pub fn is_correct(correct_answer: &str, submitted: &str) -> bool {
    submitted.trim() == correct_answer.trim()
}

/// Grades one submission against the exam's question snapshot. Unanswered
/// questions earn zero but still count toward `max_score`. Answers that
/// reference a question id outside the snapshot are dropped.
pub fn score_answers(questions: &[Question], answers: &[(i32, String)]) -> ScoreResult {
    let mut score = 0;
    let mut max_score = 0;
    let mut graded = Vec::with_capacity(answers.len());

    for q in questions {
        max_score += q.points;

        let Some((_, raw)) = answers.iter().find(|(id, _)| *id == q.id) else {
            continue;
        };

        let trimmed = raw.trim().to_string();
        let correct = is_correct(&q.correct_answer, &trimmed);
        let points_earned = if correct { q.points } else { 0 };
        score += points_earned;

        graded.push(GradedAnswer {
            question_id: q.id,
            answer_text: trimmed,
            is_correct: correct,
            points_earned,
            max_points: q.points,
        });
    }

    ScoreResult {
        score,
        max_score,
        graded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;

    fn mcq(id: i32, correct: &str, points: i32) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            question_type: QuestionType::Mcq,
            options: Some(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
            correct_answer: correct.to_string(),
            points,
        }
    }

    #[test]
    fn trimming_does_not_relax_case_sensitivity() {
        // "a " against correct "A": trimmed, but the case mismatch stands.
        let questions = vec![mcq(1, "A", 5)];
        let result = score_answers(&questions, &[(1, "a ".to_string())]);
        assert!(!result.graded[0].is_correct);
        assert_eq!(result.score, 0);
        assert_eq!(result.max_score, 5);
    }

    #[test]
    fn exact_match_after_trim_earns_full_points() {
        let questions = vec![mcq(1, "A", 5)];
        let result = score_answers(&questions, &[(1, "  A ".to_string())]);
        assert!(result.graded[0].is_correct);
        assert_eq!(result.score, 5);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![mcq(1, "Nairobi", 3)];
        let answers = vec![(1, "Nairobi".to_string())];
        let first = score_answers(&questions, &answers);
        let second = score_answers(&questions, &answers);
        assert_eq!(first.score, second.score);
        assert_eq!(first.graded[0].is_correct, second.graded[0].is_correct);
    }

    #[test]
    fn points_sum_across_questions() {
        let questions = vec![mcq(1, "A", 5), mcq(2, "B", 3), mcq(3, "C", 2)];
        let answers = vec![
            (1, "A".to_string()),
            (2, "wrong".to_string()),
            (3, "C".to_string()),
        ];
        let result = score_answers(&questions, &answers);
        assert_eq!(result.score, 7);
        assert_eq!(result.max_score, 10);
    }

    #[test]
    fn unanswered_questions_count_toward_max_only() {
        let questions = vec![mcq(1, "A", 5), mcq(2, "B", 5)];
        let result = score_answers(&questions, &[(1, "A".to_string())]);
        assert_eq!(result.score, 5);
        assert_eq!(result.max_score, 10);
        assert_eq!(result.graded.len(), 1);
    }

    #[test]
    fn unknown_question_ids_are_dropped() {
        let questions = vec![mcq(1, "A", 5)];
        let result = score_answers(&questions, &[(99, "A".to_string())]);
        assert_eq!(result.score, 0);
        assert!(result.graded.is_empty());
    }
}
