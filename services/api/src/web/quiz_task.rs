//! services/api/src/web/quiz_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! a single quiz generation request.

use crate::{
    error::ApiError,
    web::{
        protocol::{self, ServerMessage},
        state::SessionState,
    },
};
use axum::extract::ws::Message;
use futures::Sink;
use std::sync::Arc;
use std::time::Instant;
use study_assistant_core::{GenerationRequest, QuizGenerationService};
use tokio::sync::Mutex;
use tracing::info;

/// Runs a request started with `QuizSession::begin_generation` and reports the
/// resulting quiz (or the surfaced error, back in `Config`) to the client.
pub async fn quiz_generation_process<S>(
    generator: Arc<dyn QuizGenerationService>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<S>>,
    request: GenerationRequest,
) -> Result<(), ApiError>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    let start_time = Instant::now();
    let result = generator
        .generate_quiz(&request.text, request.question_type, request.question_count)
        .await;
    info!("⏱️ Quiz generation took: {:?}", start_time.elapsed());

    let view = {
        let mut session = session_state_lock.lock().await;
        session.quiz.complete_generation(result)?;
        session.quiz.view()
    };

    protocol::send(&ws_sender, &ServerMessage::QuizUpdated { quiz: view }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::protocol::testing::{capture, frames};
    use async_trait::async_trait;
    use chrono::Utc;
    use study_assistant_core::{
        Document, PortError, PortResult, Question, QuestionType, QuizPhase, ShortAnswerQuestion,
    };

    struct ScriptedGenerator {
        result: PortResult<Vec<Question>>,
    }

    #[async_trait]
    impl QuizGenerationService for ScriptedGenerator {
        async fn generate_quiz(&self, _: &str, _: QuestionType, _: u8) -> PortResult<Vec<Question>> {
            self.result.clone()
        }
    }

    fn short_answer(prompt: &str) -> Question {
        Question::ShortAnswer(ShortAnswerQuestion {
            question: prompt.to_string(),
            answer: "Ribosomes".to_string(),
            explanation: "They build proteins.".to_string(),
            topic: "Organelles".to_string(),
        })
    }

    fn session() -> Arc<Mutex<SessionState>> {
        let document = Document::new("cells.pdf", b"%PDF", "Cells are small.".to_string(), Utc::now());
        Arc::new(Mutex::new(SessionState::for_document(document)))
    }

    #[tokio::test]
    async fn test_generated_quiz_is_sent_without_reference_answers() {
        let session_lock = session();
        let request = session_lock.lock().await.quiz.begin_generation().unwrap();
        let (sender, rx) = capture();
        let generator: Arc<dyn QuizGenerationService> = Arc::new(ScriptedGenerator {
            result: Ok(vec![short_answer("What builds proteins?")]),
        });

        quiz_generation_process(generator, session_lock.clone(), sender.clone(), request)
            .await
            .unwrap();

        let sent = frames(sender, rx).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "quiz_updated");
        assert_eq!(sent[0]["quiz"]["phase"], "active");
        assert_eq!(sent[0]["quiz"]["questions"][0]["question"], "What builds proteins?");
        assert!(sent[0]["quiz"]["questions"][0]["explanation"].is_null());
        assert_eq!(session_lock.lock().await.quiz.phase(), QuizPhase::Active);
    }

    #[tokio::test]
    async fn test_failure_returns_to_config_with_the_message() {
        let session_lock = session();
        let request = session_lock.lock().await.quiz.begin_generation().unwrap();
        let (sender, rx) = capture();
        let generator: Arc<dyn QuizGenerationService> = Arc::new(ScriptedGenerator {
            result: Err(PortError::Generation("Service unavailable".to_string())),
        });

        quiz_generation_process(generator, session_lock.clone(), sender.clone(), request)
            .await
            .unwrap();

        let sent = frames(sender, rx).await;
        assert_eq!(sent[0]["quiz"]["phase"], "config");
        assert_eq!(sent[0]["quiz"]["error"], "Service unavailable");
        assert_eq!(session_lock.lock().await.quiz.phase(), QuizPhase::Config);
    }

    #[tokio::test]
    async fn test_result_for_a_session_not_loading_is_rejected() {
        let session_lock = session();
        let request = GenerationRequest {
            text: "Cells are small.".to_string(),
            question_type: QuestionType::ShortAnswer,
            question_count: 1,
        };
        let (sender, _rx) = capture();
        let generator: Arc<dyn QuizGenerationService> = Arc::new(ScriptedGenerator {
            result: Ok(vec![short_answer("Q")]),
        });

        let result = quiz_generation_process(generator, session_lock, sender, request).await;
        assert!(matches!(result, Err(ApiError::Quiz(_))));
    }
}
