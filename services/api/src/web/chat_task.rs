//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! streaming a single chat reply into the session transcript.

use crate::{
    error::ApiError,
    web::{
        protocol::{self, ServerMessage},
        state::SessionState,
    },
};
use axum::extract::ws::Message;
use futures::{Sink, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use study_assistant_core::{ChatService, ChatTurn, CHAT_ERROR_REPLY};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Streams the reply for a turn started with `ChatSession::begin_send`.
///
/// Each fragment replaces the placeholder with the cumulative text and is pushed
/// to the client. A failing stream turns the placeholder into the apology text.
/// The in-flight flag is cleared on every path that returns.
pub async fn chat_process<S>(
    chat_service: Arc<dyn ChatService>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<S>>,
    turn: ChatTurn,
) -> Result<(), ApiError>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    let start_time = Instant::now();
    let index = turn.reply_index;

    match stream_reply(chat_service.as_ref(), &session_state_lock, &ws_sender, &turn).await {
        Ok(()) => {
            session_state_lock.lock().await.chat.finish();
            info!("⏱️ Chat reply took: {:?}", start_time.elapsed());
        }
        Err(ApiError::Port(e)) => {
            warn!("Chat reply failed: {}", e);
            session_state_lock.lock().await.chat.fail();
            protocol::send(
                &ws_sender,
                &ServerMessage::ChatReplyUpdated {
                    index,
                    text: CHAT_ERROR_REPLY.to_string(),
                },
            )
            .await?;
        }
        Err(other) => {
            session_state_lock.lock().await.chat.finish();
            return Err(other);
        }
    }

    protocol::send(&ws_sender, &ServerMessage::ChatReplyFinished { index }).await
}

async fn stream_reply<S>(
    chat_service: &dyn ChatService,
    session_state_lock: &Mutex<SessionState>,
    ws_sender: &Mutex<S>,
    turn: &ChatTurn,
) -> Result<(), ApiError>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    let mut fragments = chat_service
        .chat_stream(&turn.text, &turn.history, &turn.message)
        .await?;

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        let text = {
            let mut session = session_state_lock.lock().await;
            session.chat.push_fragment(&fragment).map(str::to_string)
        };
        if let Some(text) = text {
            protocol::send(
                ws_sender,
                &ServerMessage::ChatReplyUpdated {
                    index: turn.reply_index,
                    text,
                },
            )
            .await?;
        }
    }
    Ok(())
}
