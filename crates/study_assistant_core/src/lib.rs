pub mod attempts;
pub mod chat;
pub mod context;
pub mod dashboard;
pub mod domain;
pub mod library;
pub mod memory_store;
pub mod ports;
pub mod quiz;

pub use attempts::AttemptLog;
pub use chat::{ChatSession, ChatTurn, CHAT_ERROR_REPLY};
pub use dashboard::{summarize, ProgressSummary, TopicPerformance};
pub use domain::{
    AttemptResult, ChatMessage, ChatRole, Document, LongAnswerQuestion, MultipleChoiceQuestion,
    Question, QuestionType, QuizAttempt, ShortAnswerQuestion,
};
pub use library::DocumentLibrary;
pub use memory_store::InMemoryStore;
pub use ports::{
    ChatService, KeyValueStore, PortError, PortResult, QuizGenerationService, TextExtractor,
    TextStream,
};
pub use quiz::{GenerationRequest, QuizConfig, QuizError, QuizPhase, QuizSession, QuizView};
