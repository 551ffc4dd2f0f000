//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the document chat LLM.
//! It implements the `ChatService` port from the `core` crate, streaming the
//! model's reply fragment by fragment.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use study_assistant_core::{
    domain::{ChatMessage, ChatRole},
    ports::{ChatService, PortError, PortResult, TextStream},
};
use tracing::error;

fn system_instructions(document_text: &str) -> String {
    format!(
        "You are a helpful study assistant. Your goal is to answer questions based *only* on the provided document context. If the answer is not in the document, say so. Be concise and clear in your explanations. Here is the document context: \n\n---\n{}\n---",
        document_text
    )
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Builds the request transcript: system instructions, prior turns, then the new message.
fn build_messages(
    document_text: &str,
    history: &[ChatMessage],
    message: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len() + 2);
    messages.push(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_instructions(document_text))
            .build()?
            .into(),
    );
    for turn in history {
        let entry: ChatCompletionRequestMessage = match turn.role {
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.text.as_str())
                .build()?
                .into(),
            ChatRole::Model => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.text.as_str())
                .build()?
                .into(),
        };
        messages.push(entry);
    }
    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(message)
            .build()?
            .into(),
    );
    Ok(messages)
}

//=========================================================================================
// `ChatService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatService for OpenAiChatAdapter {
    async fn chat_stream(
        &self,
        text: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> PortResult<TextStream> {
        let messages = build_messages(text, history, message)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Error in chat stream: {}", e);
                PortError::Chat(e.to_string())
            })?;

        let fragments = async_stream::try_stream! {
            while let Some(chunk) = upstream.next().await {
                let chunk = chunk.map_err(|e| {
                    error!("Chat stream interrupted: {}", e);
                    PortError::Chat(e.to_string())
                })?;
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            yield content;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}
