//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It drives the session's quiz and chat state machines and delegates the
//! long-running requests to spawned tasks.

use crate::{
    error::ApiError,
    web::{
        chat_task::chat_process,
        protocol::{self, ClientMessage, ServerMessage, WsSender},
        quiz_task::quiz_generation_process,
        state::{AppState, SessionState},
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, Sink};
use std::future::Future;
use std::sync::Arc;
use study_assistant_core::{summarize, ChatMessage, QuizConfig, QuizPhase};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: Arc<Mutex<WsSender>> = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let session_state_lock = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { document_id }) => {
                info!("Initializing session for document: {:?}", document_id);
                match SessionState::new(&app_state, document_id.as_deref()).await {
                    Ok(state) => Arc::new(Mutex::new(state)),
                    Err(e) => {
                        error!("Failed to initialize session state: {:?}", e);
                        let err_msg = ServerMessage::Error {
                            message: format!("Failed to load session data: {}", e),
                        };
                        let _ = protocol::send(&ws_sender, &err_msg).await;
                        return;
                    }
                }
            }
            _ => {
                error!("First message was not a valid Init message.");
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let greeting = {
        let session = session_state_lock.lock().await;
        [
            ServerMessage::SessionInitialized {
                document_id: session.document.id.clone(),
                document_name: session.document.name.clone(),
            },
            ServerMessage::QuizUpdated {
                quiz: session.quiz.view(),
            },
        ]
    };
    for message in &greeting {
        if let Err(e) = protocol::send(&ws_sender, message).await {
            error!("Failed to send session initialized message: {}", e);
            return;
        }
    }

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                if let Err(e) = process_text_message(&text, &app_state, &session_state_lock, &ws_sender).await {
                    warn!("Failed to reply to client: {}", e);
                    break;
                }
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    session_state_lock.lock().await.cancellation_token.cancel();
    info!("WebSocket connection closed.");
}

/// Handles one client message, answering a rejected request with an `error` frame.
///
/// Only a failure to reach the client is returned.
async fn process_text_message<S>(
    text: &str,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<S>>,
) -> Result<(), ApiError>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
{
    match handle_text_message(text, app_state, session_state_lock, ws_sender).await {
        Err(ApiError::Websocket(e)) => Err(ApiError::Websocket(e)),
        Err(e) => {
            warn!("Rejected client message: {}", e);
            let err_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            protocol::send(ws_sender, &err_msg).await
        }
        Ok(()) => Ok(()),
    }
}

/// Applies one client message to the session, replying or spawning work as needed.
async fn handle_text_message<S>(
    text: &str,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<S>>,
) -> Result<(), ApiError>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
{
    let client_msg = serde_json::from_str::<ClientMessage>(text)?;
    let mut session = session_state_lock.lock().await;

    let replies = match client_msg {
        ClientMessage::ConfigureQuiz {
            question_type,
            question_count,
        } => {
            session
                .quiz
                .configure(QuizConfig::new(question_type, question_count))?;
            vec![quiz_updated(&session)]
        }
        ClientMessage::GenerateQuiz => {
            if session.quiz.phase() == QuizPhase::Loading {
                info!("GenerateQuiz received while a quiz is loading; ignored.");
                return Ok(());
            }
            let request = session.quiz.begin_generation()?;
            spawn_cancellable(
                "Quiz generation",
                session.cancellation_token.clone(),
                quiz_generation_process(
                    app_state.quiz_generator.clone(),
                    session_state_lock.clone(),
                    ws_sender.clone(),
                    request,
                ),
            );
            vec![quiz_updated(&session)]
        }
        ClientMessage::AnswerQuestion { answer } => {
            session.quiz.answer(answer)?;
            vec![quiz_updated(&session)]
        }
        ClientMessage::NextQuestion => {
            session.quiz.next()?;
            vec![quiz_updated(&session)]
        }
        ClientMessage::PreviousQuestion => {
            session.quiz.prev()?;
            vec![quiz_updated(&session)]
        }
        ClientMessage::SubmitQuiz => {
            session.quiz.submit()?;
            vec![quiz_updated(&session)]
        }
        ClientMessage::SaveResults => {
            let mut attempts = app_state.attempts.lock().await;
            let attempt = session.quiz.save(&mut attempts).await?;
            info!("Saved attempt {} for document {}.", attempt.id, attempt.document_id);
            vec![ServerMessage::ResultsSaved {
                attempt_id: attempt.id,
                progress: summarize(attempts.attempts()),
            }]
        }
        ClientMessage::NewQuiz => {
            session.quiz.start_new()?;
            vec![quiz_updated(&session)]
        }
        ClientMessage::SendChat { text } => {
            let Some(turn) = session.chat.begin_send(&text) else {
                info!("Chat message dropped (blank or a reply is in flight).");
                return Ok(());
            };
            let reply_index = turn.reply_index;
            spawn_cancellable(
                "Chat",
                session.cancellation_token.clone(),
                chat_process(
                    app_state.chat_service.clone(),
                    session_state_lock.clone(),
                    ws_sender.clone(),
                    turn,
                ),
            );
            vec![
                ServerMessage::ChatMessageAdded {
                    index: reply_index - 1,
                    message: ChatMessage::user(text),
                },
                ServerMessage::ChatMessageAdded {
                    index: reply_index,
                    message: ChatMessage::model(""),
                },
            ]
        }
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
            return Ok(());
        }
    };
    // Replies go out before a spawned task can take the session lock.
    for reply in &replies {
        protocol::send(ws_sender, reply).await?;
    }
    Ok(())
}

fn quiz_updated(session: &SessionState) -> ServerMessage {
    ServerMessage::QuizUpdated {
        quiz: session.quiz.view(),
    }
}

/// Spawns a session task that stops when the connection's token is cancelled.
fn spawn_cancellable<F>(name: &'static str, token: CancellationToken, task: F)
where
    F: Future<Output = Result<(), ApiError>> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => info!("{} task cancelled.", name),
            result = task => {
                if let Err(e) = result {
                    error!("{} task failed: {:?}", name, e);
                }
            }
        }
    });
}
