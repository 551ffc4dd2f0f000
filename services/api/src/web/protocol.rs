//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for one study session (a quiz and a chat bound to a single document).

use crate::error::ApiError;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, Sink, SinkExt};
use serde::{Deserialize, Serialize};
use study_assistant_core::{ChatMessage, ProgressSummary, QuestionType, QuizView};
use tokio::sync::Mutex;

/// The write half of a connection, shared between the handler and its spawned tasks.
pub type WsSender = SplitSink<WebSocket, Message>;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Initializes a session. This must be the first message sent on the connection.
    /// Without a document id the library's active document is used.
    Init {
        #[serde(default)]
        document_id: Option<String>,
    },

    /// Updates the quiz configuration. The count is clamped to `[1, 10]`.
    ConfigureQuiz {
        question_type: QuestionType,
        question_count: i64,
    },

    GenerateQuiz,

    /// Records an answer for the current question.
    AnswerQuestion { answer: String },

    NextQuestion,

    PreviousQuestion,

    SubmitQuiz,

    /// Appends the finished quiz to the attempt log.
    SaveResults,

    /// Discards the finished quiz and returns to configuration.
    NewQuiz,

    SendChat { text: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized {
        document_id: String,
        document_name: String,
    },

    /// A fresh snapshot of the quiz after any change.
    QuizUpdated { quiz: QuizView },

    /// A message was appended to the chat transcript.
    ChatMessageAdded { index: usize, message: ChatMessage },

    /// The pending reply at `index` now reads `text` (cumulative, not a delta).
    ChatReplyUpdated { index: usize, text: String },

    /// The reply at `index` will not change again.
    ChatReplyFinished { index: usize },

    /// The attempt was stored; `progress` is the recomputed dashboard.
    ResultsSaved {
        attempt_id: String,
        progress: ProgressSummary,
    },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}

/// Encodes a server message as a WebSocket text frame.
pub fn encode(message: &ServerMessage) -> Result<Message, ApiError> {
    let json = serde_json::to_string(message)?;
    Ok(Message::Text(json.into()))
}

/// Sends a server message over the shared sender.
pub async fn send<S>(sender: &Mutex<S>, message: &ServerMessage) -> Result<(), ApiError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let frame = encode(message)?;
    sender.lock().await.send(frame).await?;
    Ok(())
}

/// A capturing sink for exercising the session tasks without a socket.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use futures::channel::mpsc::{self, SendError, UnboundedReceiver, UnboundedSender};
    use futures::sink::SinkMapErr;
    use futures::{FutureExt, StreamExt};
    use serde_json::Value;
    use std::sync::Arc;

    pub type CaptureSink = SinkMapErr<UnboundedSender<Message>, fn(SendError) -> axum::Error>;

    fn to_axum_error(error: SendError) -> axum::Error {
        axum::Error::new(error)
    }

    pub fn capture() -> (Arc<Mutex<CaptureSink>>, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded();
        let sink = tx.sink_map_err(to_axum_error as fn(SendError) -> axum::Error);
        (Arc::new(Mutex::new(sink)), rx)
    }

    /// Decodes the text frames already queued, leaving the sink open for spawned tasks.
    pub fn ready_frames(rx: &mut UnboundedReceiver<Message>) -> Vec<Value> {
        let mut sent = Vec::new();
        while let Some(Some(frame)) = rx.next().now_or_never() {
            if let Message::Text(text) = frame {
                if let Ok(value) = serde_json::from_str(text.as_str()) {
                    sent.push(value);
                }
            }
        }
        sent
    }

    /// Closes the sink and decodes every captured text frame.
    pub async fn frames(sender: Arc<Mutex<CaptureSink>>, rx: UnboundedReceiver<Message>) -> Vec<Value> {
        drop(sender);
        rx.filter_map(|frame| async move {
            match frame {
                Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
                _ => None,
            }
        })
        .collect()
        .await
    }
}
