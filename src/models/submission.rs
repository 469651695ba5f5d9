// src/models/submission.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    models::question::{AnswerLetter, PublicQuestion, Question},
    utils::scoring::{QuestionOutcome, score_color},
};

/// Represents the 'submissions' table in the database.
/// One completed quiz attempt. Never updated after insert.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: i64,
    pub set_id: i64,
    pub ip_address: String,
    pub score: i64,
    pub total: i64,
    /// Seconds between quiz start and submission.
    pub time_taken: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl Submission {
    pub async fn latest_for_ip<'e, E>(executor: E, ip: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Submission>(
            r#"
            SELECT id, set_id, ip_address, score, total, time_taken, submitted_at
            FROM submissions
            WHERE ip_address = $1
            ORDER BY submitted_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(ip)
        .fetch_optional(executor)
        .await
    }
}

/// Represents the 'responses' table: the answer given to one question.
#[derive(Debug, Clone, FromRow)]
pub struct ResponseRow {
    pub question_id: i64,
    pub selected_option: Option<String>,
    pub is_correct: bool,
}

/// DTO returned when a quiz starts.
#[derive(Debug, Serialize)]
pub struct QuizPaper {
    pub questions: Vec<PublicQuestion>,
    /// Must be sent back with the answers.
    pub quiz_token: String,
    pub expires_in: u64, // seconds
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// The token received when the quiz started.
    pub quiz_token: String,

    /// User's answers map.
    /// Key: question position (1-based)
    /// Value: selected option letter
    #[serde(default)]
    pub answers: HashMap<i64, String>,
}

#[derive(Debug, Serialize)]
pub struct ResponseOption {
    pub label: AnswerLetter,
    pub text: String,
    pub is_selected: bool,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct ResponseDetail {
    pub question_id: i64,
    pub position: i64,
    pub number: i64,
    pub body: String,
    pub selected_option: Option<AnswerLetter>,
    pub correct_option: Option<AnswerLetter>,
    pub is_correct: bool,
    pub options: Vec<ResponseOption>,
}

impl ResponseDetail {
    pub fn new(question: &Question, outcome: &QuestionOutcome) -> Self {
        let options = question
            .labeled_options()
            .into_iter()
            .map(|opt| ResponseOption {
                is_selected: outcome.selected == Some(opt.label),
                is_correct: outcome.correct == Some(opt.label),
                label: opt.label,
                text: opt.text,
            })
            .collect();

        ResponseDetail {
            question_id: question.id,
            position: question.position,
            number: question.source_number,
            body: question.body.clone(),
            selected_option: outcome.selected,
            correct_option: outcome.correct,
            is_correct: outcome.is_correct,
            options,
        }
    }
}

/// Result page data for one submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub submission_id: i64,
    pub score: i64,
    pub total: i64,
    pub score_color: &'static str,
    pub time_taken: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub responses: Vec<ResponseDetail>,
}

impl SubmissionResult {
    /// Pairs each question with its outcome by question id. Questions
    /// without an outcome are left out.
    pub fn build(submission: &Submission, questions: &[Question], outcomes: &[QuestionOutcome]) -> Self {
        let by_id: HashMap<i64, &QuestionOutcome> =
            outcomes.iter().map(|o| (o.question_id, o)).collect();

        let responses = questions
            .iter()
            .filter_map(|q| by_id.get(&q.id).map(|o| ResponseDetail::new(q, o)))
            .collect();

        SubmissionResult {
            success: true,
            submission_id: submission.id,
            score: submission.score,
            total: submission.total,
            score_color: score_color(submission.score, submission.total),
            time_taken: submission.time_taken,
            submitted_at: submission.submitted_at,
            responses,
        }
    }
}

/// Short summary shown on the "already completed" page.
#[derive(Debug, Serialize)]
pub struct SubmissionSummary {
    pub submission_id: i64,
    pub score: i64,
    pub total: i64,
    pub score_color: &'static str,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Submission> for SubmissionSummary {
    fn from(s: &Submission) -> Self {
        SubmissionSummary {
            submission_id: s.id,
            score: s.score,
            total: s.total,
            score_color: score_color(s.score, s.total),
            submitted_at: s.submitted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletedView {
    pub status: &'static str,
    pub message: &'static str,
    pub submission: Option<SubmissionSummary>,
}
