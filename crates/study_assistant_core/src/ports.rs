//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{ChatMessage, Question, QuestionType};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The uploaded file could not be turned into text.
    #[error("Text extraction failed: {0}")]
    Extraction(String),
    /// Quiz generation failed. The message is shown to the user as-is.
    #[error("{0}")]
    Generation(String),
    #[error("Chat generation failed: {0}")]
    Chat(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A lazy, finite, non-restartable sequence of chat text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extracts plain text from raw file bytes, pages in order separated by a blank line.
    async fn extract_text(&self, file_bytes: &[u8]) -> PortResult<String>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Generates `count` questions of the given shape from the document text.
    async fn generate_quiz(
        &self,
        text: &str,
        question_type: QuestionType,
        count: u8,
    ) -> PortResult<Vec<Question>>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Starts a streamed answer to `message`, grounded in the document text.
    async fn chat_stream(
        &self,
        text: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> PortResult<TextStream>;
}

/// Keys used in the persistent store.
pub mod keys {
    pub const DOCUMENTS: &str = "documents";
    pub const QUIZ_ATTEMPTS: &str = "quiz_attempts";
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored JSON value, or `None` if the key was never set.
    async fn get(&self, key: &str) -> PortResult<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> PortResult<()>;
}

/// Loads a typed value from the store, falling back to `T::default()` when absent.
pub async fn load_or_default<T>(store: &dyn KeyValueStore, key: &str) -> PortResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| PortError::Storage(format!("Malformed value under '{}': {}", key, e))),
        None => Ok(T::default()),
    }
}

/// Serializes and writes a typed value to the store.
pub async fn save<T: serde::Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> PortResult<()> {
    let json = serde_json::to_value(value).map_err(|e| PortError::Storage(e.to_string()))?;
    store.set(key, json).await
}
