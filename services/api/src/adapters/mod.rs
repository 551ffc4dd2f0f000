pub mod chat_llm;
pub mod pdf;
pub mod quiz_llm;
pub mod store;

pub use chat_llm::OpenAiChatAdapter;
pub use pdf::LopdfExtractor;
pub use quiz_llm::OpenAiQuizAdapter;
pub use store::PgKeyValueStore;
