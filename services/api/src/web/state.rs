//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use std::sync::Arc;
use study_assistant_core::{
    AttemptLog, ChatService, ChatSession, Document, DocumentLibrary, KeyValueStore, PortError,
    PortResult, QuizGenerationService, QuizSession, TextExtractor,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<dyn TextExtractor>,
    pub quiz_generator: Arc<dyn QuizGenerationService>,
    pub chat_service: Arc<dyn ChatService>,
    /// Every uploaded document plus the active marker.
    pub library: Mutex<DocumentLibrary>,
    /// The append-only attempt log behind the dashboard.
    pub attempts: Mutex<AttemptLog>,
}

impl AppState {
    /// Loads the persisted library and attempt log from the store.
    pub async fn load(
        config: Arc<Config>,
        store: Arc<dyn KeyValueStore>,
        extractor: Arc<dyn TextExtractor>,
        quiz_generator: Arc<dyn QuizGenerationService>,
        chat_service: Arc<dyn ChatService>,
    ) -> PortResult<Self> {
        let library = DocumentLibrary::load(store.clone()).await?;
        let attempts = AttemptLog::load(store).await?;
        Ok(Self {
            config,
            extractor,
            quiz_generator,
            chat_service,
            library: Mutex::new(library),
            attempts: Mutex::new(attempts),
        })
    }
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub document: Document,
    pub quiz: QuizSession,
    pub chat: ChatSession,
    /// Cancelled when the connection closes, stopping any spawned work.
    pub cancellation_token: CancellationToken,
}

impl SessionState {
    /// Binds a new session to the requested document, or to the active one.
    ///
    /// An explicit id also becomes the library's active document.
    pub async fn new(app_state: &AppState, document_id: Option<&str>) -> PortResult<Self> {
        let document = {
            let mut library = app_state.library.lock().await;
            match document_id {
                Some(id) => library.select(id)?,
                None => library
                    .active()
                    .cloned()
                    .ok_or_else(|| PortError::NotFound("No document is active".to_string()))?,
            }
        };

        Ok(Self::for_document(document))
    }

    pub fn for_document(document: Document) -> Self {
        Self {
            quiz: QuizSession::new(&document),
            chat: ChatSession::new(&document),
            document,
            cancellation_token: CancellationToken::new(),
        }
    }
}
