//! crates/study_assistant_core/src/chat.rs
//!
//! A linear chat transcript about one document.
//!
//! A send appends the user message and an empty model placeholder right away.
//! Streamed fragments then rewrite the placeholder with the cumulative reply,
//! and a failed stream replaces it with a fixed apology.

use futures::StreamExt;
use tracing::{info, warn};

use crate::context::truncate_for_generation;
use crate::domain::{ChatMessage, Document};
use crate::ports::ChatService;

/// Shown in place of the reply when the chat stream fails.
pub const CHAT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// A chat request captured at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub text: String,
    /// Transcript as it was before this send.
    pub history: Vec<ChatMessage>,
    pub message: String,
    /// Index of the model placeholder this turn fills in.
    pub reply_index: usize,
}

pub struct ChatSession {
    document_id: String,
    document_text: String,
    messages: Vec<ChatMessage>,
    pending: Option<PendingReply>,
}

struct PendingReply {
    index: usize,
    text: String,
}

impl ChatSession {
    pub fn new(document: &Document) -> Self {
        Self {
            document_id: document.id.clone(),
            document_text: document.extracted_text.clone(),
            messages: Vec::new(),
            pending: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a send. Returns `None` for blank input or while a reply is in flight.
    pub fn begin_send(&mut self, user_text: &str) -> Option<ChatTurn> {
        if user_text.trim().is_empty() {
            return None;
        }
        if self.pending.is_some() {
            info!("Dropping chat message for {}: a reply is in flight.", self.document_id);
            return None;
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(user_text));
        self.messages.push(ChatMessage::model(""));
        let reply_index = self.messages.len() - 1;
        self.pending = Some(PendingReply {
            index: reply_index,
            text: String::new(),
        });

        Some(ChatTurn {
            text: truncate_for_generation(&self.document_text).to_string(),
            history,
            message: user_text.to_string(),
            reply_index,
        })
    }

    /// Folds a fragment into the pending reply and returns the text so far.
    pub fn push_fragment(&mut self, fragment: &str) -> Option<&str> {
        let pending = self.pending.as_mut()?;
        pending.text.push_str(fragment);
        let slot = self.messages.get_mut(pending.index)?;
        slot.text = pending.text.clone();
        Some(slot.text.as_str())
    }

    /// Replaces the pending reply with the apology and clears the in-flight flag.
    pub fn fail(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Some(slot) = self.messages.get_mut(pending.index) {
                slot.text = CHAT_ERROR_REPLY.to_string();
            }
        }
    }

    /// Clears the in-flight flag after the stream ends.
    pub fn finish(&mut self) {
        self.pending = None;
    }

    /// Sends a message and consumes the whole reply stream.
    ///
    /// Returns `false` if the send was dropped.
    pub async fn send(&mut self, service: &dyn ChatService, user_text: &str) -> bool {
        let Some(turn) = self.begin_send(user_text) else {
            return false;
        };

        let mut stream = match service.chat_stream(&turn.text, &turn.history, &turn.message).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.fail();
                return true;
            }
        };

        while let Some(fragment) = stream.next().await {
            match fragment {
                Ok(fragment) => {
                    self.push_fragment(&fragment);
                }
                Err(e) => {
                    warn!("Chat stream failed: {}", e);
                    self.fail();
                    return true;
                }
            }
        }
        self.finish();
        true
    }
}
