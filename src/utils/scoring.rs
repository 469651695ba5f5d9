// src/utils/scoring.rs

use std::collections::HashMap;

use crate::models::question::{AnswerLetter, Question};

/// Result of comparing one submitted answer with the stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: i64,
    pub position: i64,
    /// `None` when the question was skipped or the answer was not A..D.
    pub selected: Option<AnswerLetter>,
    pub correct: Option<AnswerLetter>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub score: i64,
    pub total: i64,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Scores `answers` (question position -> letter) against the question set.
///
/// One point per matching letter, nothing for skipped questions.
/// Positions not present in `questions` are ignored, so the score always
/// stays within `0..=questions.len()`.
pub fn grade(questions: &[Question], answers: &HashMap<i64, String>) -> Grade {
    let outcomes: Vec<QuestionOutcome> = questions
        .iter()
        .map(|q| {
            let selected = answers
                .get(&q.position)
                .and_then(|raw| AnswerLetter::parse(raw));
            let correct = q.correct_letter();
            QuestionOutcome {
                question_id: q.id,
                position: q.position,
                selected,
                correct,
                is_correct: selected.is_some() && selected == correct,
            }
        })
        .collect();

    let score = outcomes.iter().filter(|o| o.is_correct).count() as i64;

    Grade {
        score,
        total: questions.len() as i64,
        outcomes,
    }
}

/// Colour band used for a score on the results page and the score chart.
pub fn score_color(score: i64, total: i64) -> &'static str {
    if total <= 0 {
        return "red";
    }
    // Integer maths: score/total <= 3/10 and <= 6/10.
    if score * 10 <= total * 3 {
        "red"
    } else if score * 10 <= total * 6 {
        "orange"
    } else {
        "green"
    }
}
