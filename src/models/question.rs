// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, prelude::FromRow, types::Json};

/// Label of one of the four options of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [
        AnswerLetter::A,
        AnswerLetter::B,
        AnswerLetter::C,
        AnswerLetter::D,
    ];

    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "A" | "a" => Some(AnswerLetter::A),
            "B" | "b" => Some(AnswerLetter::B),
            "C" | "c" => Some(AnswerLetter::C),
            "D" | "d" => Some(AnswerLetter::D),
            _ => None,
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(AnswerLetter::A),
            'B' => Some(AnswerLetter::B),
            'C' => Some(AnswerLetter::C),
            'D' => Some(AnswerLetter::D),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'question_sets' table. One row per upload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionSet {
    pub id: i64,
    pub source_name: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl QuestionSet {
    /// The set currently served to quiz takers, if any upload happened yet.
    pub async fn active<'e, E>(executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, QuestionSet>(
            r#"
            SELECT id, source_name, is_active, created_at
            FROM question_sets
            WHERE is_active = 1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(executor)
        .await
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub set_id: i64,

    /// 1-based order of the question inside its set.
    pub position: i64,

    /// The number written in the uploaded document. Informational only.
    pub source_number: i64,

    pub body: String,

    /// The four options in A..D order, stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// Always one of "A".."D" (enforced by a CHECK constraint).
    pub correct_answer: String,
}

impl Question {
    pub async fn fetch_for_set<'e, E>(executor: E, set_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Question>(
            r#"
            SELECT id, set_id, position, source_number, body, options, correct_answer
            FROM questions
            WHERE set_id = $1
            ORDER BY position
            "#,
        )
        .bind(set_id)
        .fetch_all(executor)
        .await
    }

    pub fn correct_letter(&self) -> Option<AnswerLetter> {
        AnswerLetter::parse(&self.correct_answer)
    }

    pub fn labeled_options(&self) -> Vec<OptionView> {
        AnswerLetter::ALL
            .iter()
            .zip(self.options.0.iter())
            .map(|(label, text)| OptionView {
                label: *label,
                text: text.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub label: AnswerLetter,
    pub text: String,
}

/// DTO for sending question to client (excludes the correct answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i64,
    pub number: i64,
    pub body: String,
    pub options: Vec<OptionView>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            position: q.position,
            number: q.source_number,
            body: q.body.clone(),
            options: q.labeled_options(),
        }
    }
}
