// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        question::{Question, QuestionSet},
        stats::{self, Dashboard, QuickStats},
        submission::{ResponseRow, Submission},
    },
    utils::{document, html::to_plain_text, parser},
};

/// Rows per INSERT statement, well below SQLite's bind parameter limit.
const INSERT_CHUNK: usize = 500;

/// Maximum number of parser warnings echoed back after an upload.
const MAX_REPORTED_WARNINGS: usize = 20;

/// Aggregated statistics for the dashboard.
/// Admin only.
pub async fn dashboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let QuickStats {
        total_attempts,
        average_time,
    } = QuickStats::fetch(&pool).await?;

    let (quiz_starts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quiz_starts")
        .fetch_one(&pool)
        .await?;

    let timestamps: Vec<(DateTime<Utc>,)> = sqlx::query_as("SELECT submitted_at FROM submissions")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch submission timestamps: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    let timestamps: Vec<DateTime<Utc>> = timestamps.into_iter().map(|(ts,)| ts).collect();

    let active_set = QuestionSet::active(&pool).await?;

    let (questions, responses, scores) = match &active_set {
        Some(set) => {
            let questions = Question::fetch_for_set(&pool, set.id).await?;

            let responses = sqlx::query_as::<_, ResponseRow>(
                r#"
                SELECT r.question_id, r.selected_option, r.is_correct
                FROM responses r
                JOIN questions q ON q.id = r.question_id
                WHERE q.set_id = $1
                "#,
            )
            .bind(set.id)
            .fetch_all(&pool)
            .await?;

            let scores: Vec<(i64,)> = sqlx::query_as("SELECT score FROM submissions WHERE set_id = $1")
                .bind(set.id)
                .fetch_all(&pool)
                .await?;

            (questions, responses, scores.into_iter().map(|(s,)| s).collect())
        }
        None => (Vec::new(), Vec::new(), Vec::<i64>::new()),
    };

    let question_stats = stats::question_stats(&questions, &responses);
    let distribution = stats::score_distribution(&scores, questions.len() as i64);

    let dashboard = Dashboard {
        total_attempts,
        quiz_starts,
        completion_rate: stats::percentage(total_attempts, quiz_starts).min(100.0),
        average_time,
        active_set,
        hourly_chart: stats::hourly_chart(&stats::hourly_buckets(&timestamps)),
        score_chart: stats::score_chart(&distribution),
        most_correct: stats::most_correct(&question_stats),
        most_wrong: stats::most_wrong(&question_stats),
        question_stats,
    };

    Ok(Json(dashboard))
}

/// Imports questions from an uploaded .docx or .txt file.
/// Admin only.
///
/// A successful upload becomes the active question set. Earlier sets stay
/// in the database so existing submissions keep their questions.
pub async fn upload_questions(
    State(pool): State<SqlitePool>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = upload
        .filter(|(name, _)| !name.is_empty())
        .ok_or(AppError::BadRequest("No file selected".to_string()))?;

    let lines = document::extract_lines(&file_name, &bytes)?;
    let parsed = parser::parse_lines(lines.iter().map(String::as_str)).map_err(|e| {
        tracing::warn!("Upload '{}' rejected: {}", file_name, e);
        AppError::from(e)
    })?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE question_sets SET is_active = 0 WHERE is_active = 1")
        .execute(&mut *tx)
        .await?;

    let (set_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO question_sets (source_name, is_active, created_at)
        VALUES ($1, 1, $2)
        RETURNING id
        "#,
    )
    .bind(&file_name)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question set: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let numbered: Vec<(i64, &parser::ParsedQuestion)> = parsed
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| (i as i64 + 1, q))
        .collect();

    for chunk in numbered.chunks(INSERT_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO questions (set_id, position, source_number, body, options, correct_answer) ",
        );
        builder.push_values(chunk, |mut row, (position, q)| {
            let options: Vec<String> = q
                .options
                .iter()
                .map(|o| to_plain_text(o).into_owned())
                .collect();
            row.push_bind(set_id)
                .push_bind(*position)
                .push_bind(q.number as i64)
                .push_bind(to_plain_text(&q.text).into_owned())
                .push_bind(SqlJson(options))
                .push_bind(q.answer.as_str());
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Imported {} questions from '{}' as set {} ({} warnings)",
        parsed.questions.len(),
        file_name,
        set_id,
        parsed.warnings.len()
    );

    let warnings: Vec<&String> = parsed.warnings.iter().take(MAX_REPORTED_WARNINGS).collect();

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "question_set_id": set_id,
            "imported": parsed.questions.len(),
            "warning_count": parsed.warnings.len(),
            "warnings": warnings,
            "message": format!("Successfully imported {} questions", parsed.questions.len()),
        })),
    ))
}

/// Deletes every question set, submission, lock and quiz start.
/// Admin only.
pub async fn clear_all(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    for table in [
        "ip_locks",
        "responses",
        "submissions",
        "questions",
        "question_sets",
        "quiz_starts",
    ] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to clear {}: {:?}", table, e);
                AppError::InternalServerError(e.to_string())
            })?;
    }

    tx.commit().await?;
    tracing::info!("All quiz data cleared");

    Ok(Json(serde_json::json!({
        "message": "All quiz data cleared successfully"
    })))
}

/// Exports all submissions as CSV, newest first.
/// Admin only.
pub async fn export_csv(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, set_id, ip_address, score, total, time_taken, submitted_at
        FROM submissions
        ORDER BY submitted_at DESC, id DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["IP Address", "Score", "Total", "Time Taken (s)", "Timestamp"])?;
    for s in &submissions {
        writer.write_record([
            s.ip_address.clone(),
            s.score.to_string(),
            s.total.to_string(),
            s.time_taken.to_string(),
            s.submitted_at.to_rfc3339(),
        ])?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=quiz_results.csv",
            ),
        ],
        data,
    ))
}
