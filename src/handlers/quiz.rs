// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::{AnswerLetter, PublicQuestion, Question, QuestionSet},
        submission::{
            CompletedView, QuizPaper, ResponseRow, SubmissionResult, SubmitQuizRequest, Submission,
            SubmissionSummary,
        },
    },
    utils::{
        gate::{self, ClientIp, LockOutcome},
        jwt::{issue_quiz_ticket, now_unix, verify_quiz_ticket},
        scoring::{self, QuestionOutcome},
    },
};

/// Where gated clients are sent.
pub const COMPLETED_PATH: &str = "/api/quiz/completed";

fn already_completed() -> Response {
    Redirect::to(COMPLETED_PATH).into_response()
}

/// Landing page data.
pub async fn status(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    ClientIp(ip): ClientIp,
) -> Result<impl IntoResponse, AppError> {
    let question_count = match QuestionSet::active(&pool).await? {
        Some(set) => {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions WHERE set_id = $1")
                .bind(set.id)
                .fetch_one(&pool)
                .await?;
            count
        }
        None => 0,
    };

    let has_completed = config.ip_lock_enabled && gate::is_locked(&pool, &ip).await?;

    Ok(Json(json!({
        "question_count": question_count,
        "has_completed": has_completed,
        "ip_lock_enabled": config.ip_lock_enabled,
    })))
}

/// Starts a quiz.
///
/// Returns the active question set without answers plus a signed ticket
/// that has to come back with the submission. Gated clients are
/// redirected to the "already completed" page.
pub async fn start_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    ClientIp(ip): ClientIp,
) -> Result<Response, AppError> {
    if config.ip_lock_enabled && gate::is_locked(&pool, &ip).await? {
        tracing::info!("Quiz start refused for {}: already completed", ip);
        return Ok(already_completed());
    }

    let set = QuestionSet::active(&pool).await?.ok_or_else(|| {
        AppError::NotFound("No questions available. Please contact administrator.".to_string())
    })?;

    let questions = Question::fetch_for_set(&pool, set.id).await.map_err(|e| {
        tracing::error!("Failed to fetch quiz questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if questions.is_empty() {
        return Err(AppError::NotFound(
            "No questions available. Please contact administrator.".to_string(),
        ));
    }

    sqlx::query("INSERT INTO quiz_starts (ip_address, started_at) VALUES ($1, $2)")
        .bind(&ip)
        .bind(Utc::now())
        .execute(&pool)
        .await?;

    let quiz_token = issue_quiz_ticket(set.id, &config.jwt_secret, config.quiz_ticket_ttl)?;

    let paper = QuizPaper {
        questions: questions.iter().map(PublicQuestion::from).collect(),
        quiz_token,
        expires_in: config.quiz_ticket_ttl,
    };

    Ok(Json(paper).into_response())
}

/// Submits a user's answers and calculates the score.
///
/// * Verifies the quiz ticket and loads the question set it was issued for.
/// * Scores one point per matching letter.
/// * Stores the submission, one response per question and, when gating is
///   on, the IP lock. All in one transaction.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    ClientIp(ip): ClientIp,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Response, AppError> {
    let ticket = verify_quiz_ticket(&req.quiz_token, &config.jwt_secret)?;
    let time_taken = now_unix()?.saturating_sub(ticket.iat) as i64;

    // Take the write lock before the gate lookup. Under a deferred BEGIN two
    // attempts from one IP both read, then one fails to upgrade with SQLITE_BUSY.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    if config.ip_lock_enabled && gate::is_locked(&mut *tx, &ip).await? {
        tracing::warn!("Duplicate submission from {} refused", ip);
        tx.rollback().await?;
        return Ok(already_completed());
    }

    let questions = Question::fetch_for_set(&mut *tx, ticket.set_id).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound(
            "This quiz is no longer available. Please start again.".to_string(),
        ));
    }

    let grade = scoring::grade(&questions, &req.answers);
    let submitted_at = Utc::now();

    let (submission_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO submissions (set_id, ip_address, score, total, time_taken, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(ticket.set_id)
    .bind(&ip)
    .bind(grade.score)
    .bind(grade.total)
    .bind(time_taken)
    .bind(submitted_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "INSERT INTO responses (submission_id, question_id, selected_option, is_correct) ",
    );
    builder.push_values(&grade.outcomes, |mut row, outcome| {
        row.push_bind(submission_id)
            .push_bind(outcome.question_id)
            .push_bind(outcome.selected.map(|l| l.as_str()))
            .push_bind(outcome.is_correct);
    });
    builder.build().execute(&mut *tx).await?;

    if config.ip_lock_enabled
        && gate::lock(&mut *tx, &ip, submission_id).await? == LockOutcome::AlreadyLocked
    {
        tracing::warn!("Concurrent submission from {} lost the lock, rolling back", ip);
        tx.rollback().await?;
        return Ok(already_completed());
    }

    tx.commit().await?;

    tracing::info!(
        "Submission {} from {}: {}/{} in {}s",
        submission_id,
        ip,
        grade.score,
        grade.total,
        time_taken
    );

    let submission = Submission {
        id: submission_id,
        set_id: ticket.set_id,
        ip_address: ip,
        score: grade.score,
        total: grade.total,
        time_taken,
        submitted_at,
    };

    Ok(Json(SubmissionResult::build(&submission, &questions, &grade.outcomes)).into_response())
}

/// The "already completed" page.
pub async fn completed(
    State(pool): State<SqlitePool>,
    ClientIp(ip): ClientIp,
) -> Result<impl IntoResponse, AppError> {
    let submission = Submission::latest_for_ip(&pool, &ip).await?;

    Ok(Json(CompletedView {
        status: "already_completed",
        message: "You have already completed this quiz.",
        submission: submission.as_ref().map(SubmissionSummary::from),
    }))
}

/// Result page data for one submission.
///
/// Only visible from the address that made the submission.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, set_id, ip_address, score, total, time_taken, submitted_at
        FROM submissions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .filter(|s| s.ip_address == ip)
    .ok_or(AppError::NotFound("Result not found".to_string()))?;

    let questions = Question::fetch_for_set(&pool, submission.set_id).await?;

    let responses = sqlx::query_as::<_, ResponseRow>(
        "SELECT question_id, selected_option, is_correct FROM responses WHERE submission_id = $1",
    )
    .bind(submission.id)
    .fetch_all(&pool)
    .await?;

    let by_question: HashMap<i64, &ResponseRow> =
        responses.iter().map(|r| (r.question_id, r)).collect();

    let outcomes: Vec<QuestionOutcome> = questions
        .iter()
        .filter_map(|q| {
            by_question.get(&q.id).map(|r| QuestionOutcome {
                question_id: q.id,
                position: q.position,
                selected: r.selected_option.as_deref().and_then(AnswerLetter::parse),
                correct: q.correct_letter(),
                is_correct: r.is_correct,
            })
        })
        .collect();

    Ok(Json(SubmissionResult::build(&submission, &questions, &outcomes)))
}
