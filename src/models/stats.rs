// src/models/stats.rs

//! Dashboard aggregates. Charts are drawn client-side; these types only
//! carry the series.

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::{
    models::{
        question::{AnswerLetter, Question, QuestionSet},
        submission::ResponseRow,
    },
    utils::scoring::score_color,
};

const TOP_N: usize = 5;
const BODY_PREVIEW_CHARS: usize = 80;

/// One bar chart for the plotting library on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<&'static str>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionStat {
    pub label: AnswerLetter,
    pub text: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStat {
    pub question_id: i64,
    pub position: i64,
    pub number: i64,
    pub body: String,
    /// Responses that picked an option. Skipped questions are not counted.
    pub answered: i64,
    pub correct_count: i64,
    pub wrong_count: i64,
    pub correct_percentage: f64,
    pub wrong_percentage: f64,
    pub correct_answer: String,
    pub options: Vec<OptionStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedQuestion {
    pub position: i64,
    pub number: i64,
    pub body: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_attempts: i64,
    pub quiz_starts: i64,
    pub completion_rate: f64,
    pub average_time: i64,
    pub active_set: Option<QuestionSet>,
    pub hourly_chart: ChartSeries,
    pub score_chart: ChartSeries,
    pub most_correct: Vec<RankedQuestion>,
    pub most_wrong: Vec<RankedQuestion>,
    pub question_stats: Vec<QuestionStat>,
}

#[derive(Debug, Serialize)]
pub struct QuickStats {
    pub total_attempts: i64,
    /// Mean time taken in whole seconds, 0 without submissions.
    pub average_time: i64,
}

impl QuickStats {
    pub async fn fetch<'e, E>(executor: E) -> Result<Self, sqlx::Error>
    where
        E: sqlx::SqliteExecutor<'e>,
    {
        let (total_attempts, average): (i64, Option<f64>) =
            sqlx::query_as("SELECT COUNT(*), AVG(time_taken) FROM submissions")
                .fetch_one(executor)
                .await?;

        Ok(QuickStats {
            total_attempts,
            average_time: average.map(|a| a as i64).unwrap_or(0),
        })
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole` as a percentage with one decimal, 0 when `whole` is 0.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

pub fn truncate_body(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

/// Submission counts per UTC hour of day.
pub fn hourly_buckets(timestamps: &[DateTime<Utc>]) -> [i64; 24] {
    let mut hours = [0_i64; 24];
    for ts in timestamps {
        hours[ts.hour() as usize] += 1;
    }
    hours
}

pub fn hourly_chart(hours: &[i64; 24]) -> ChartSeries {
    ChartSeries {
        title: "Quiz Activity by Hour of Day",
        x_label: "Hour (0-23)",
        y_label: "Number of Attempts",
        x: (0..24).collect(),
        y: hours.to_vec(),
        colors: None,
    }
}

/// Number of submissions for every score in `0..=total`.
/// Scores outside that range (from an older, larger set) are ignored.
pub fn score_distribution(scores: &[i64], total: i64) -> Vec<i64> {
    let total = total.max(0);
    let mut counts = vec![0_i64; total as usize + 1];
    for &score in scores {
        if (0..=total).contains(&score) {
            counts[score as usize] += 1;
        }
    }
    counts
}

pub fn score_chart(distribution: &[i64]) -> ChartSeries {
    let total = distribution.len() as i64 - 1;
    let x: Vec<i64> = (0..distribution.len() as i64).collect();
    let colors = x.iter().map(|&s| score_color(s, total)).collect();

    ChartSeries {
        title: "Score Distribution",
        x_label: "Score",
        y_label: "Number of Users",
        x,
        y: distribution.to_vec(),
        colors: Some(colors),
    }
}

/// Per-question and per-option figures, computed from the stored responses.
pub fn question_stats(questions: &[Question], responses: &[ResponseRow]) -> Vec<QuestionStat> {
    let mut by_question: HashMap<i64, Vec<&ResponseRow>> = HashMap::new();
    for r in responses {
        by_question.entry(r.question_id).or_default().push(r);
    }

    questions
        .iter()
        .map(|q| {
            let rows = by_question.get(&q.id).map(Vec::as_slice).unwrap_or(&[]);

            let mut selections = [0_i64; 4];
            let mut answered = 0;
            let mut correct_count = 0;
            for r in rows {
                if let Some(letter) = r.selected_option.as_deref().and_then(AnswerLetter::parse) {
                    selections[letter.index()] += 1;
                    answered += 1;
                    if r.is_correct {
                        correct_count += 1;
                    }
                }
            }
            let wrong_count = answered - correct_count;

            let options = q
                .labeled_options()
                .into_iter()
                .map(|opt| OptionStat {
                    count: selections[opt.label.index()],
                    percentage: percentage(selections[opt.label.index()], answered),
                    label: opt.label,
                    text: opt.text,
                })
                .collect();

            QuestionStat {
                question_id: q.id,
                position: q.position,
                number: q.source_number,
                body: q.body.clone(),
                answered,
                correct_count,
                wrong_count,
                correct_percentage: percentage(correct_count, answered),
                wrong_percentage: percentage(wrong_count, answered),
                correct_answer: q.correct_answer.clone(),
                options,
            }
        })
        .collect()
}

/// Top questions by number of correct answers.
pub fn most_correct(stats: &[QuestionStat]) -> Vec<RankedQuestion> {
    let mut ranked: Vec<&QuestionStat> = stats.iter().filter(|s| s.correct_count > 0).collect();
    ranked.sort_by(|a, b| {
        b.correct_count
            .cmp(&a.correct_count)
            .then(a.position.cmp(&b.position))
    });

    ranked
        .into_iter()
        .take(TOP_N)
        .map(|s| RankedQuestion {
            position: s.position,
            number: s.number,
            body: truncate_body(&s.body),
            count: s.correct_count,
            percentage: s.correct_percentage,
        })
        .collect()
}

/// Top questions by share of wrong answers among those who answered.
pub fn most_wrong(stats: &[QuestionStat]) -> Vec<RankedQuestion> {
    let mut ranked: Vec<&QuestionStat> = stats
        .iter()
        .filter(|s| s.answered > 0 && s.wrong_count > 0)
        .collect();
    ranked.sort_by(|a, b| {
        b.wrong_percentage
            .total_cmp(&a.wrong_percentage)
            .then(a.position.cmp(&b.position))
    });

    ranked
        .into_iter()
        .take(TOP_N)
        .map(|s| RankedQuestion {
            position: s.position,
            number: s.number,
            body: truncate_body(&s.body),
            count: s.wrong_count,
            percentage: s.wrong_percentage,
        })
        .collect()
}
