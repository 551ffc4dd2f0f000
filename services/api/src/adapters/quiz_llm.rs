//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for the quiz-generating LLM.
//! It implements the `QuizGenerationService` port from the `core` crate by asking
//! an OpenAI-compatible chat endpoint for JSON that matches a per-variant schema.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;
use study_assistant_core::{
    domain::{LongAnswerQuestion, MultipleChoiceQuestion, Question, QuestionType, ShortAnswerQuestion},
    ports::{PortError, PortResult, QuizGenerationService},
};
use tracing::{error, info, warn};

/// Message surfaced to the user whenever generation fails for any reason.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate quiz from the document. The content might not be suitable or the AI service is currently unavailable.";

const TOPIC_DESCRIPTION: &str = "A short topic category for this question.";

/// Matches a reply wrapped in a markdown code fence, capturing the body.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuizAdapter {
    /// Creates a new `OpenAiQuizAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    async fn request_questions(
        &self,
        text: &str,
        question_type: QuestionType,
        count: u8,
    ) -> PortResult<Vec<Question>> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(build_prompt(text, question_type, count))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some(format!("A list of {}", question_type.description())),
                    name: "quiz".to_string(),
                    schema: Some(quiz_schema(question_type)),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Quiz generation LLM response contained no text content.".to_string())
            })?;

        parse_questions(&content, question_type, count)
    }
}

//=========================================================================================
// Prompt, Schema and Response Parsing
//=========================================================================================

fn build_prompt(text: &str, question_type: QuestionType, count: u8) -> String {
    format!(
        "Based on the following text from a coursebook, generate {} unique {}. Ensure the questions cover different aspects of the text and vary in difficulty.\n\nContext from the document:\n---\n{}\n---\n",
        count,
        question_type.description(),
        text
    )
}

fn item_schema(question_type: QuestionType) -> Value {
    match question_type {
        QuestionType::MultipleChoice => json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "options": { "type": "array", "items": { "type": "string" } },
                "correct_answer": { "type": "string", "description": "Must be exactly one of the options." },
                "explanation": { "type": "string" },
                "topic": { "type": "string", "description": TOPIC_DESCRIPTION }
            },
            "required": ["question", "options", "correct_answer", "explanation", "topic"],
            "additionalProperties": false
        }),
        QuestionType::ShortAnswer => json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "answer": { "type": "string", "description": "A concise, correct answer." },
                "explanation": { "type": "string" },
                "topic": { "type": "string", "description": TOPIC_DESCRIPTION }
            },
            "required": ["question", "answer", "explanation", "topic"],
            "additionalProperties": false
        }),
        QuestionType::LongAnswer => json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "answer_keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "A list of keywords or key phrases expected in a good answer."
                },
                "explanation": { "type": "string", "description": "A detailed explanation of the ideal answer." },
                "topic": { "type": "string", "description": TOPIC_DESCRIPTION }
            },
            "required": ["question", "answer_keywords", "explanation", "topic"],
            "additionalProperties": false
        }),
    }
}

/// Structured outputs need an object at the root, so the list is wrapped.
fn quiz_schema(question_type: QuestionType) -> Value {
    json!({
        "type": "object",
        "properties": {
            "questions": { "type": "array", "items": item_schema(question_type) }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuizPayload<T> {
    Wrapped { questions: Vec<T> },
    Bare(Vec<T>),
}

impl<T> QuizPayload<T> {
    fn into_questions(self) -> Vec<T> {
        match self {
            QuizPayload::Wrapped { questions } => questions,
            QuizPayload::Bare(questions) => questions,
        }
    }
}

/// Strips a surrounding markdown code fence, if the model added one.
fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw.trim(), |m| m.as_str())
}

fn decode<T: DeserializeOwned>(json: &str) -> PortResult<Vec<T>> {
    serde_json::from_str::<QuizPayload<T>>(json)
        .map(QuizPayload::into_questions)
        .map_err(|e| PortError::Unexpected(format!("Malformed quiz JSON: {}", e)))
}

fn parse_questions(raw: &str, question_type: QuestionType, count: u8) -> PortResult<Vec<Question>> {
    let json = strip_code_fence(raw);
    let questions: Vec<Question> = match question_type {
        QuestionType::MultipleChoice => decode::<MultipleChoiceQuestion>(json)?
            .into_iter()
            .map(Question::MultipleChoice)
            .collect(),
        QuestionType::ShortAnswer => decode::<ShortAnswerQuestion>(json)?
            .into_iter()
            .map(Question::ShortAnswer)
            .collect(),
        QuestionType::LongAnswer => decode::<LongAnswerQuestion>(json)?
            .into_iter()
            .map(Question::LongAnswer)
            .collect(),
    };

    for question in &questions {
        if let Question::MultipleChoice(q) = question {
            if !q.options.contains(&q.correct_answer) {
                warn!("Correct answer for '{}' is not among its options.", q.question);
            }
        }
    }

    Ok(questions.into_iter().take(count as usize).collect())
}

//=========================================================================================
// `QuizGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizGenerationService for OpenAiQuizAdapter {
    async fn generate_quiz(
        &self,
        text: &str,
        question_type: QuestionType,
        count: u8,
    ) -> PortResult<Vec<Question>> {
        match self.request_questions(text, question_type, count).await {
            Ok(questions) => {
                info!("Generated {} {:?} questions.", questions.len(), question_type);
                Ok(questions)
            }
            Err(e) => {
                error!("Error generating quiz: {}", e);
                Err(PortError::Generation(GENERATION_FAILED_MESSAGE.to_string()))
            }
        }
    }
}
