//! crates/study_assistant_core/src/quiz.rs
//!
//! The quiz session state machine:
//!
//! ```text
//! Config -> Loading -> Active -> Results
//!   ^          |                    |
//!   +----------+ (failure)          |
//!   +-------------------------------+ (start new)
//! ```
//!
//! Generation is split into `begin_generation` and `complete_generation` so a
//! caller can release its lock while the request is in flight. `generate`
//! runs both halves for callers that own the session outright.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::attempts::AttemptLog;
use crate::context::truncate_for_generation;
use crate::domain::{AttemptResult, Document, Question, QuestionType, QuizAttempt};
use crate::ports::{PortError, PortResult, QuizGenerationService};

pub const MIN_QUESTIONS: u8 = 1;
pub const MAX_QUESTIONS: u8 = 10;
const DEFAULT_QUESTIONS: u8 = 5;

/// Phase of the quiz wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Config,
    Loading,
    Active,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("quiz is in the {actual:?} phase, expected {expected:?}")]
    WrongState { expected: QuizPhase, actual: QuizPhase },
    #[error("the quiz can only be submitted from the last question")]
    NotOnLastQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub question_type: QuestionType,
    pub question_count: u8,
}

impl QuizConfig {
    /// Builds a config with the count clamped to `[1, 10]`.
    pub fn new(question_type: QuestionType, question_count: i64) -> Self {
        let clamped = question_count.clamp(MIN_QUESTIONS as i64, MAX_QUESTIONS as i64) as u8;
        Self {
            question_type,
            question_count: clamped,
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_type: QuestionType::MultipleChoice,
            question_count: DEFAULT_QUESTIONS,
        }
    }
}

/// Everything the generation service needs, captured when a quiz is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub text: String,
    pub question_type: QuestionType,
    pub question_count: u8,
}

pub struct QuizSession {
    document_id: String,
    document_name: String,
    document_text: String,
    config: QuizConfig,
    phase: QuizPhase,
    questions: Vec<Question>,
    answers: Vec<Option<String>>,
    current: usize,
    error: Option<String>,
}

impl QuizSession {
    pub fn new(document: &Document) -> Self {
        Self {
            document_id: document.id.clone(),
            document_name: document.name.clone(),
            document_text: document.extracted_text.clone(),
            config: QuizConfig::default(),
            phase: QuizPhase::Config,
            questions: Vec::new(),
            answers: Vec::new(),
            current: 0,
            error: None,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn config(&self) -> QuizConfig {
        self.config
    }

    /// The last generation error, if the previous request failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    fn expect_phase(&self, expected: QuizPhase) -> Result<(), QuizError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(QuizError::WrongState {
                expected,
                actual: self.phase,
            })
        }
    }

    pub fn configure(&mut self, config: QuizConfig) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Config)?;
        self.config = config;
        Ok(())
    }

    /// Moves to `Loading` and returns the request to send.
    ///
    /// Fails while a request is already in flight, so repeated clicks are dropped.
    pub fn begin_generation(&mut self) -> Result<GenerationRequest, QuizError> {
        self.expect_phase(QuizPhase::Config)?;
        self.phase = QuizPhase::Loading;
        self.error = None;
        info!(
            "Requesting {} {:?} questions for document {}.",
            self.config.question_count, self.config.question_type, self.document_id
        );
        Ok(GenerationRequest {
            text: truncate_for_generation(&self.document_text).to_string(),
            question_type: self.config.question_type,
            question_count: self.config.question_count,
        })
    }

    /// Applies the outcome of a generation request started by `begin_generation`.
    pub fn complete_generation(&mut self, result: PortResult<Vec<Question>>) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Loading)?;
        match result {
            Ok(questions) if questions.is_empty() => {
                warn!("Generation returned no questions for document {}.", self.document_id);
                self.fail_generation("The generation service returned no questions.".to_string());
            }
            Ok(questions) => {
                info!("Quiz ready with {} questions.", questions.len());
                self.answers = vec![None; questions.len()];
                self.questions = questions;
                self.current = 0;
                self.phase = QuizPhase::Active;
            }
            Err(PortError::Generation(message)) => self.fail_generation(message),
            Err(other) => self.fail_generation(other.to_string()),
        }
        Ok(())
    }

    fn fail_generation(&mut self, message: String) {
        warn!("Quiz generation failed: {}", message);
        self.error = Some(message);
        self.phase = QuizPhase::Config;
    }

    /// Requests a quiz and waits for it.
    pub async fn generate(&mut self, generator: &dyn QuizGenerationService) -> Result<(), QuizError> {
        let request = self.begin_generation()?;
        let result = generator
            .generate_quiz(&request.text, request.question_type, request.question_count)
            .await;
        self.complete_generation(result)
    }

    /// Records the answer for the current question, replacing any earlier one.
    pub fn answer(&mut self, value: impl Into<String>) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Active)?;
        self.answers[self.current] = Some(value.into());
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Active)?;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
        Ok(())
    }

    pub fn prev(&mut self) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Active)?;
        self.current = self.current.saturating_sub(1);
        Ok(())
    }

    /// Finishes the quiz. Unanswered questions are allowed.
    pub fn submit(&mut self) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Active)?;
        if self.current + 1 != self.questions.len() {
            return Err(QuizError::NotOnLastQuestion);
        }
        self.phase = QuizPhase::Results;
        info!("Quiz submitted with score {}/{}.", self.score(), self.questions.len());
        Ok(())
    }

    /// Grades every question against its recorded answer.
    pub fn results(&self) -> Vec<AttemptResult> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(question, answer)| AttemptResult {
                question: question.prompt().to_string(),
                is_correct: question.is_correct(answer.as_deref()),
                topic: question.topic().to_string(),
            })
            .collect()
    }

    pub fn score(&self) -> u32 {
        self.results().iter().filter(|r| r.is_correct).count() as u32
    }

    /// Builds the attempt record for the finished quiz.
    pub fn attempt(&self) -> Result<QuizAttempt, QuizError> {
        self.expect_phase(QuizPhase::Results)?;
        let results = self.results();
        Ok(QuizAttempt {
            id: format!("attempt-{}", Uuid::new_v4()),
            document_id: self.document_id.clone(),
            document_name: self.document_name.clone(),
            timestamp: Utc::now(),
            score: results.iter().filter(|r| r.is_correct).count() as u32,
            total_questions: self.questions.len() as u32,
            results,
        })
    }

    /// Appends the finished quiz to the attempt log.
    ///
    /// Every call appends a new attempt.
    pub async fn save(&self, log: &mut AttemptLog) -> PortResult<QuizAttempt> {
        let attempt = self
            .attempt()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        log.append(attempt.clone()).await?;
        Ok(attempt)
    }

    /// Returns to `Config`, discarding the finished quiz.
    pub fn start_new(&mut self) -> Result<(), QuizError> {
        self.expect_phase(QuizPhase::Results)?;
        self.questions.clear();
        self.answers.clear();
        self.current = 0;
        self.phase = QuizPhase::Config;
        Ok(())
    }

    /// A serializable snapshot for clients.
    ///
    /// Reference answers are only included once the quiz is in `Results`.
    pub fn view(&self) -> QuizView {
        let questions = match self.phase {
            QuizPhase::Active => self
                .questions
                .iter()
                .zip(&self.answers)
                .map(|(q, a)| QuestionView::prompt_only(q, a.clone()))
                .collect(),
            QuizPhase::Results => self
                .questions
                .iter()
                .zip(&self.answers)
                .map(|(q, a)| QuestionView::reviewed(q, a.clone()))
                .collect(),
            QuizPhase::Config | QuizPhase::Loading => Vec::new(),
        };
        QuizView {
            phase: self.phase,
            config: self.config,
            error: self.error.clone(),
            current_index: self.current,
            score: (self.phase == QuizPhase::Results).then(|| self.score()),
            questions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizView {
    pub phase: QuizPhase,
    pub config: QuizConfig,
    pub error: Option<String>,
    pub current_index: usize,
    pub score: Option<u32>,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub kind: QuestionType,
    pub question: String,
    /// Present for multiple choice only.
    pub options: Option<Vec<String>>,
    pub answer: Option<String>,
    pub is_correct: Option<bool>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub topic: Option<String>,
}

impl QuestionView {
    fn prompt_only(question: &Question, answer: Option<String>) -> Self {
        let options = match question {
            Question::MultipleChoice(q) => Some(q.options.clone()),
            _ => None,
        };
        Self {
            kind: question.question_type(),
            question: question.prompt().to_string(),
            options,
            answer,
            is_correct: None,
            correct_answer: None,
            explanation: None,
            topic: None,
        }
    }

    fn reviewed(question: &Question, answer: Option<String>) -> Self {
        let is_correct = question.is_correct(answer.as_deref());
        let mut view = Self::prompt_only(question, answer);
        if let Question::MultipleChoice(q) = question {
            view.correct_answer = Some(q.correct_answer.clone());
        }
        view.is_correct = Some(is_correct);
        view.explanation = Some(question.explanation().to_string());
        view.topic = Some(question.topic().to_string());
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MAX_TEXT_LENGTH;
    use crate::domain::{MultipleChoiceQuestion, ShortAnswerQuestion};
    use crate::memory_store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every request and replies with a fixed result.
    struct ScriptedGenerator {
        reply: PortResult<Vec<Question>>,
        seen: Mutex<Vec<(String, QuestionType, u8)>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: PortResult<Vec<Question>>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuizGenerationService for ScriptedGenerator {
        async fn generate_quiz(
            &self,
            text: &str,
            question_type: QuestionType,
            count: u8,
        ) -> PortResult<Vec<Question>> {
            self.seen
                .lock()
                .unwrap()
                .push((text.to_string(), question_type, count));
            self.reply.clone()
        }
    }

    fn document(text: &str) -> Document {
        Document {
            id: "bio.pdf-1".to_string(),
            name: "bio.pdf".to_string(),
            data_url: "data:application/pdf;base64,".to_string(),
            extracted_text: text.to_string(),
        }
    }

    fn mcq(correct: &str, topic: &str) -> Question {
        Question::MultipleChoice(MultipleChoiceQuestion {
            question: format!("Which is {}?", correct),
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: correct.to_string(),
            explanation: "See chapter 1.".to_string(),
            topic: topic.to_string(),
        })
    }

    fn saq(topic: &str) -> Question {
        Question::ShortAnswer(ShortAnswerQuestion {
            question: "Describe it.".to_string(),
            answer: "It is green.".to_string(),
            explanation: "Chlorophyll.".to_string(),
            topic: topic.to_string(),
        })
    }

    async fn active_session(questions: Vec<Question>) -> QuizSession {
        let mut session = QuizSession::new(&document("text"));
        let generator = ScriptedGenerator::replying(Ok(questions));
        session.generate(&generator).await.unwrap();
        assert_eq!(session.phase(), QuizPhase::Active);
        session
    }

    fn go_to_last(session: &mut QuizSession) {
        for _ in 0..session.questions().len() {
            session.next().unwrap();
        }
    }

    #[test]
    fn test_config_count_is_clamped() {
        assert_eq!(QuizConfig::new(QuestionType::ShortAnswer, 0).question_count, 1);
        assert_eq!(QuizConfig::new(QuestionType::ShortAnswer, -4).question_count, 1);
        assert_eq!(QuizConfig::new(QuestionType::ShortAnswer, 7).question_count, 7);
        assert_eq!(QuizConfig::new(QuestionType::ShortAnswer, 42).question_count, 10);
    }

    #[tokio::test]
    async fn test_generation_truncates_document_text() {
        let text = "x".repeat(70_000);
        let mut session = QuizSession::new(&document(&text));
        session
            .configure(QuizConfig::new(QuestionType::LongAnswer, 3))
            .unwrap();
        let generator = ScriptedGenerator::replying(Ok(vec![saq("A")]));

        session.generate(&generator).await.unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.len(), MAX_TEXT_LENGTH);
        assert_eq!(seen[0].0, text[..MAX_TEXT_LENGTH]);
        assert_eq!(seen[0].1, QuestionType::LongAnswer);
        assert_eq!(seen[0].2, 3);
    }

    #[tokio::test]
    async fn test_generation_failure_returns_to_config_with_message() {
        let mut session = QuizSession::new(&document("text"));
        let config = QuizConfig::new(QuestionType::ShortAnswer, 4);
        session.configure(config).unwrap();
        let generator =
            ScriptedGenerator::replying(Err(PortError::Generation("service down".to_string())));

        session.generate(&generator).await.unwrap();

        assert_eq!(session.phase(), QuizPhase::Config);
        assert_eq!(session.error(), Some("service down"));
        assert_eq!(session.config(), config);
    }

    #[tokio::test]
    async fn test_empty_question_list_is_a_failure() {
        let mut session = QuizSession::new(&document(""));
        session
            .generate(&ScriptedGenerator::replying(Ok(Vec::new())))
            .await
            .unwrap();

        assert_eq!(session.phase(), QuizPhase::Config);
        assert!(session.error().is_some());
    }

    #[test]
    fn test_generate_is_ignored_while_loading() {
        let mut session = QuizSession::new(&document("text"));
        session.begin_generation().unwrap();

        let again = session.begin_generation();
        assert_eq!(
            again,
            Err(QuizError::WrongState {
                expected: QuizPhase::Config,
                actual: QuizPhase::Loading
            })
        );
        assert!(session.configure(QuizConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_retry_clears_previous_error() {
        let mut session = QuizSession::new(&document("text"));
        session
            .generate(&ScriptedGenerator::replying(Err(PortError::Generation("boom".into()))))
            .await
            .unwrap();
        assert!(session.error().is_some());

        session.begin_generation().unwrap();
        assert!(session.error().is_none());
        session.complete_generation(Ok(vec![saq("A")])).unwrap();
        assert_eq!(session.phase(), QuizPhase::Active);
        assert_eq!(session.answers(), &[None::<String>]);
    }

    #[tokio::test]
    async fn test_cursor_is_clamped_at_both_ends() {
        let mut session = active_session(vec![mcq("A", "t"), mcq("B", "t"), mcq("C", "t")]).await;

        session.prev().unwrap();
        assert_eq!(session.current_index(), 0);

        go_to_last(&mut session);
        assert_eq!(session.current_index(), 2);
        session.next().unwrap();
        assert_eq!(session.current_index(), 2);
    }

    #[tokio::test]
    async fn test_answer_overwrites_current_question() {
        let mut session = active_session(vec![mcq("A", "t"), mcq("B", "t")]).await;
        session.answer("C").unwrap();
        session.answer("A").unwrap();
        session.next().unwrap();
        session.answer("B").unwrap();

        assert_eq!(session.answers(), &[Some("A".to_string()), Some("B".to_string())]);
    }

    #[tokio::test]
    async fn test_submit_only_from_last_question() {
        let mut session = active_session(vec![mcq("A", "t"), mcq("B", "t")]).await;

        assert_eq!(session.submit(), Err(QuizError::NotOnLastQuestion));
        assert_eq!(session.phase(), QuizPhase::Active);

        session.next().unwrap();
        session.submit().unwrap();
        assert_eq!(session.phase(), QuizPhase::Results);
    }

    #[tokio::test]
    async fn test_partial_answers_score_only_correct_ones() {
        let questions = vec![
            mcq("A", "t"),
            mcq("B", "t"),
            mcq("C", "t"),
            mcq("A", "t"),
            mcq("B", "t"),
        ];
        let mut session = active_session(questions).await;
        session.answer("A").unwrap();
        session.next().unwrap();
        session.answer("b").unwrap();
        session.next().unwrap();
        session.answer("C").unwrap();
        go_to_last(&mut session);
        session.submit().unwrap();

        let attempt = session.attempt().unwrap();
        assert_eq!(attempt.total_questions, 5);
        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.results.len(), 5);
        assert!(!attempt.results[3].is_correct);
    }

    #[tokio::test]
    async fn test_unanswered_quiz_scores_zero() {
        let mut session = active_session(vec![saq("A"), saq("B"), saq("C")]).await;
        go_to_last(&mut session);
        session.submit().unwrap();

        let attempt = session.attempt().unwrap();
        assert_eq!(attempt.score, 0);
        assert_eq!(attempt.total_questions, 3);
    }

    #[tokio::test]
    async fn test_save_appends_every_time() {
        let store = Arc::new(InMemoryStore::new());
        let mut log = AttemptLog::load(store).await.unwrap();
        let mut session = active_session(vec![saq("Cells")]).await;
        session.answer(" x").unwrap();
        session.submit().unwrap();

        let first = session.save(&mut log).await.unwrap();
        let second = session.save(&mut log).await.unwrap();

        assert_eq!(log.attempts().len(), 2);
        assert_ne!(first.id, second.id);
        assert_eq!(first.score, 1);
        assert_eq!(first.document_name, "bio.pdf");
        assert_eq!(first.results[0].topic, "Cells");
    }

    #[tokio::test]
    async fn test_save_before_results_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let mut log = AttemptLog::load(store).await.unwrap();
        let session = active_session(vec![saq("Cells")]).await;

        assert!(session.save(&mut log).await.is_err());
        assert!(log.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_start_new_discards_quiz_but_keeps_config() {
        let mut session = QuizSession::new(&document("text"));
        let config = QuizConfig::new(QuestionType::MultipleChoice, 2);
        session.configure(config).unwrap();
        session
            .generate(&ScriptedGenerator::replying(Ok(vec![mcq("A", "t")])))
            .await
            .unwrap();
        session.submit().unwrap();

        session.start_new().unwrap();

        assert_eq!(session.phase(), QuizPhase::Config);
        assert!(session.questions().is_empty());
        assert!(session.answers().is_empty());
        assert_eq!(session.config(), config);
    }

    #[tokio::test]
    async fn test_view_hides_reference_answers_until_results() {
        let mut session = active_session(vec![mcq("B", "Letters")]).await;
        session.answer("A").unwrap();

        let active = session.view();
        assert_eq!(active.questions[0].options.as_ref().map(|o| o.len()), Some(3));
        assert!(active.questions[0].correct_answer.is_none());
        assert!(active.score.is_none());

        session.submit().unwrap();
        let results = session.view();
        assert_eq!(results.score, Some(0));
        assert_eq!(results.questions[0].correct_answer.as_deref(), Some("B"));
        assert_eq!(results.questions[0].is_correct, Some(false));
        assert_eq!(results.questions[0].explanation.as_deref(), Some("See chapter 1."));
    }
}
