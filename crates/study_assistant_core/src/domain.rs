//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These types carry `serde` derives because they are persisted through the
//! key-value store port and sent over the wire unchanged.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded coursebook and its extracted plain text.
///
/// The raw file is kept as a `data:` URL so it survives a round trip through
/// any JSON-only store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub data_url: String,
    pub extracted_text: String,
}

impl Document {
    /// Builds a document from freshly uploaded bytes.
    ///
    /// The id is derived from the file name and the creation timestamp.
    pub fn new(name: &str, raw_bytes: &[u8], extracted_text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}-{}", name, created_at.timestamp_millis()),
            name: name.to_string(),
            data_url: encode_data_url(mime_type_for(name), raw_bytes),
            extracted_text,
        }
    }

    /// Decodes the stored data URL back into the original file bytes.
    pub fn raw_bytes(&self) -> Option<Vec<u8>> {
        let (_, payload) = self.data_url.split_once(',')?;
        STANDARD.decode(payload).ok()
    }

    /// The MIME type recorded in the data URL header.
    pub fn mime_type(&self) -> &str {
        self.data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or("application/octet-stream")
    }
}

fn mime_type_for(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// The three question shapes a quiz can be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    LongAnswer,
}

impl QuestionType {
    /// Human readable plural used in generation prompts.
    pub fn description(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice Questions",
            QuestionType::ShortAnswer => "Short Answer Questions",
            QuestionType::LongAnswer => "Long Answer Questions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortAnswerQuestion {
    pub question: String,
    /// Reference answer. Not used for grading.
    pub answer: String,
    pub explanation: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongAnswerQuestion {
    pub question: String,
    pub answer_keywords: Vec<String>,
    pub explanation: String,
    pub topic: String,
}

/// A generated quiz question, tagged by its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    MultipleChoice(MultipleChoiceQuestion),
    ShortAnswer(ShortAnswerQuestion),
    LongAnswer(LongAnswerQuestion),
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self {
            Question::MultipleChoice(_) => QuestionType::MultipleChoice,
            Question::ShortAnswer(_) => QuestionType::ShortAnswer,
            Question::LongAnswer(_) => QuestionType::LongAnswer,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.question,
            Question::ShortAnswer(q) => &q.question,
            Question::LongAnswer(q) => &q.question,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.topic,
            Question::ShortAnswer(q) => &q.topic,
            Question::LongAnswer(q) => &q.topic,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.explanation,
            Question::ShortAnswer(q) => &q.explanation,
            Question::LongAnswer(q) => &q.explanation,
        }
    }

    /// Grades a recorded answer.
    ///
    /// Multiple choice is an exact, case-sensitive match against the correct
    /// option. Free-text questions are credited for any non-empty answer.
    pub fn is_correct(&self, answer: Option<&str>) -> bool {
        match self {
            Question::MultipleChoice(q) => answer == Some(q.correct_answer.as_str()),
            Question::ShortAnswer(_) | Question::LongAnswer(_) => {
                answer.is_some_and(|a| !a.is_empty())
            }
        }
    }
}

/// The graded outcome of a single question inside an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub question: String,
    pub is_correct: bool,
    pub topic: String,
}

/// The persisted record of one completed quiz session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub timestamp: DateTime<Utc>,
    pub score: u32,
    pub total_questions: u32,
    pub results: Vec<AttemptResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Model,
}

/// A single entry in a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Model, text: text.into() }
    }
}
