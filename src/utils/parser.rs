// src/utils/parser.rs

//! Line grammar for uploaded question documents.
//!
//! ```text
//! Question 1: 2+2=?
//! A. 3
//! B. 4
//! C. 5
//! D. 6
//! Question 1 Answer: B
//! ```
//!
//! Malformed blocks are skipped with a warning and parsing carries on.
//! Answer lines may follow their block directly or appear later in the
//! document, e.g. as an answer key at the end.

use std::{fmt, mem, sync::LazyLock};

use regex::Regex;

use crate::models::question::AnswerLetter;

static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^question\s+(\d+)\s*:\s*(.+)$").expect("valid regex"));

static ANSWER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^question\s+(\d+)\s+answer\s*:\s*(\S+)$").expect("valid regex")
});

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z])\.\s*(.+)$").expect("valid regex"));

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent<'a> {
    Blank,
    Question { number: u32, text: &'a str },
    Option { label: char, text: &'a str },
    Answer { number: u32, letter: &'a str },
    Other(&'a str),
}

impl<'a> LineEvent<'a> {
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        if line.is_empty() {
            return LineEvent::Blank;
        }

        // Answer lines are checked first: they also start with "Question N".
        if let Some(caps) = ANSWER_LINE.captures(line) {
            if let Ok(number) = caps[1].parse() {
                let letter = caps.get(2).map_or("", |m| m.as_str());
                return LineEvent::Answer { number, letter };
            }
        }

        if let Some(caps) = QUESTION_LINE.captures(line) {
            if let Ok(number) = caps[1].parse() {
                let text = caps.get(2).map_or("", |m| m.as_str().trim());
                return LineEvent::Question { number, text };
            }
        }

        if let Some(caps) = OPTION_LINE.captures(line) {
            let label = caps[1].chars().next().unwrap_or_default();
            let text = caps.get(2).map_or("", |m| m.as_str().trim());
            return LineEvent::Option { label, text };
        }

        LineEvent::Other(line)
    }
}

/// A complete, valid question record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    /// The number as written in the document.
    pub number: u32,
    pub text: String,
    pub options: [String; 4],
    pub answer: AnswerLetter,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub questions: Vec<ParsedQuestion>,
    /// Skipped blocks and ignored lines, in document order.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    NoValidQuestions { warnings: Vec<String> },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoValidQuestions { warnings } => {
                write!(f, "no valid questions parsed ({} warnings)", warnings.len())
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A question block under construction.
#[derive(Debug)]
struct Draft {
    number: u32,
    text: String,
    options: Vec<String>,
    answer: Option<AnswerLetter>,
}

impl Draft {
    fn new(number: u32, text: &str) -> Self {
        Self {
            number,
            text: text.to_string(),
            options: Vec::with_capacity(4),
            answer: None,
        }
    }
}

#[derive(Debug)]
enum State {
    AwaitingQuestion,
    CollectingOptions(Draft),
    AwaitingAnswer(Draft),
}

struct Accumulator {
    state: State,
    /// Blocks with all four options, in document order. Some may still lack an answer.
    blocks: Vec<Draft>,
    warnings: Vec<String>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            state: State::AwaitingQuestion,
            blocks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn feed(&mut self, event: LineEvent<'_>) {
        let state = mem::replace(&mut self.state, State::AwaitingQuestion);

        let next = match (state, event) {
            (state, LineEvent::Blank) => state,

            (state, LineEvent::Question { number, text }) => {
                self.close(state);
                State::CollectingOptions(Draft::new(number, text))
            }

            (State::CollectingOptions(mut draft), LineEvent::Option { label, text }) => {
                let expected = AnswerLetter::ALL[draft.options.len()];
                if AnswerLetter::from_char(label) != Some(expected) {
                    self.warn(format!(
                        "Question {} has option {} where {} was expected",
                        draft.number,
                        label.to_ascii_uppercase(),
                        expected
                    ));
                    State::AwaitingQuestion
                } else {
                    draft.options.push(text.to_string());
                    if draft.options.len() == AnswerLetter::ALL.len() {
                        State::AwaitingAnswer(draft)
                    } else {
                        State::CollectingOptions(draft)
                    }
                }
            }

            (State::AwaitingAnswer(draft), LineEvent::Option { label, .. }) => {
                self.warn(format!(
                    "Question {} has more than four options (extra option {})",
                    draft.number,
                    label.to_ascii_uppercase()
                ));
                State::AwaitingQuestion
            }

            (State::AwaitingQuestion, LineEvent::Option { .. }) => State::AwaitingQuestion,

            (state, LineEvent::Answer { number, letter }) => self.answer(state, number, letter),

            (State::AwaitingQuestion, LineEvent::Other(_)) => State::AwaitingQuestion,

            (state, LineEvent::Other(line)) => {
                if !line.starts_with('#') {
                    if let State::CollectingOptions(draft) | State::AwaitingAnswer(draft) = &state {
                        let preview: String = line.chars().take(50).collect();
                        self.warn(format!(
                            "Unexpected line in Question {}: {}",
                            draft.number, preview
                        ));
                    }
                }
                state
            }
        };
        self.state = next;
    }

    fn answer(&mut self, state: State, number: u32, letter: &str) -> State {
        let Some(letter) = AnswerLetter::parse(letter) else {
            self.warn(format!(
                "Question {} has an invalid answer '{}'",
                number, letter
            ));
            return state;
        };

        match state {
            State::AwaitingAnswer(mut draft) if draft.number == number => {
                draft.answer = Some(letter);
                self.blocks.push(draft);
                State::AwaitingQuestion
            }
            State::CollectingOptions(draft) if draft.number == number => {
                self.warn(format!("Question {} missing options", draft.number));
                State::AwaitingQuestion
            }
            state => {
                match self.blocks.iter_mut().rev().find(|b| b.number == number) {
                    Some(block) => {
                        if block.answer.is_some() {
                            self.warnings.push(format!(
                                "Question {} answered more than once, keeping the last answer",
                                number
                            ));
                        }
                        block.answer = Some(letter);
                    }
                    None => self
                        .warnings
                        .push(format!("Answer for unknown Question {}", number)),
                }
                state
            }
        }
    }

    /// Ends the block held by `state`, if any.
    fn close(&mut self, state: State) {
        match state {
            State::AwaitingQuestion => {}
            State::CollectingOptions(draft) => {
                self.warn(format!("Question {} missing options", draft.number));
            }
            State::AwaitingAnswer(draft) => self.blocks.push(draft),
        }
    }

    fn finish(mut self) -> Result<ParsedDocument, ParseError> {
        let state = mem::replace(&mut self.state, State::AwaitingQuestion);
        self.close(state);

        let mut questions = Vec::with_capacity(self.blocks.len());
        for block in self.blocks {
            let Some(answer) = block.answer else {
                self.warnings
                    .push(format!("Question {} missing answer", block.number));
                continue;
            };
            match <[String; 4]>::try_from(block.options) {
                Ok(options) => questions.push(ParsedQuestion {
                    number: block.number,
                    text: block.text,
                    options,
                    answer,
                }),
                Err(_) => self
                    .warnings
                    .push(format!("Question {} missing options", block.number)),
            }
        }

        if questions.is_empty() {
            return Err(ParseError::NoValidQuestions {
                warnings: self.warnings,
            });
        }

        Ok(ParsedDocument {
            questions,
            warnings: self.warnings,
        })
    }

    fn warn(&mut self, message: String) {
        tracing::debug!("parser: {}", message);
        self.warnings.push(message);
    }
}

/// Parses an ordered sequence of lines (or document paragraphs).
pub fn parse_lines<'a, I>(lines: I) -> Result<ParsedDocument, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut acc = Accumulator::new();
    for line in lines {
        acc.feed(LineEvent::classify(line));
    }
    acc.finish()
}

pub fn parse_text(text: &str) -> Result<ParsedDocument, ParseError> {
    parse_lines(text.lines())
}
