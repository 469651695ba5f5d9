// src/handlers/api.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::{PublicQuestion, Question, QuestionSet},
        stats::QuickStats,
    },
};

/// Lists the active questions, without answers.
pub async fn list_questions(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let questions = match QuestionSet::active(&pool).await? {
        Some(set) => Question::fetch_for_set(&pool, set.id).await.map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?,
        None => Vec::new(),
    };

    let public: Vec<PublicQuestion> = questions.iter().map(PublicQuestion::from).collect();

    Ok(Json(public))
}

/// Submission count and average time taken.
pub async fn quick_stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(QuickStats::fetch(&pool).await?))
}
