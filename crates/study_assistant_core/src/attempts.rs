//! crates/study_assistant_core/src/attempts.rs
//!
//! The append-only log of completed quiz attempts.

use std::sync::Arc;
use tracing::info;

use crate::domain::QuizAttempt;
use crate::ports::{self, keys, KeyValueStore, PortResult};

pub struct AttemptLog {
    store: Arc<dyn KeyValueStore>,
    attempts: Vec<QuizAttempt>,
}

impl AttemptLog {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> PortResult<Self> {
        let attempts: Vec<QuizAttempt> =
            ports::load_or_default(store.as_ref(), keys::QUIZ_ATTEMPTS).await?;
        Ok(Self { store, attempts })
    }

    pub fn attempts(&self) -> &[QuizAttempt] {
        &self.attempts
    }

    /// Persists the log with `attempt` appended. Nothing is deduplicated.
    pub async fn append(&mut self, attempt: QuizAttempt) -> PortResult<()> {
        let mut updated = self.attempts.clone();
        updated.push(attempt);
        ports::save(self.store.as_ref(), keys::QUIZ_ATTEMPTS, &updated).await?;

        self.attempts = updated;
        info!("Attempt log now holds {} attempts.", self.attempts.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStore;
    use chrono::Utc;

    fn attempt(id: &str) -> QuizAttempt {
        QuizAttempt {
            id: id.to_string(),
            document_id: "doc".to_string(),
            document_name: "doc.pdf".to_string(),
            timestamp: Utc::now(),
            score: 0,
            total_questions: 0,
            results: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_append_keeps_order_and_persists() {
        let store = Arc::new(InMemoryStore::new());
        let mut log = AttemptLog::load(store.clone()).await.unwrap();

        log.append(attempt("first")).await.unwrap();
        log.append(attempt("second")).await.unwrap();

        let reloaded = AttemptLog::load(store).await.unwrap();
        let ids: Vec<&str> = reloaded.attempts().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_identical_attempts_are_both_kept() {
        let store = Arc::new(InMemoryStore::new());
        let mut log = AttemptLog::load(store).await.unwrap();

        log.append(attempt("same")).await.unwrap();
        log.append(attempt("same")).await.unwrap();

        assert_eq!(log.attempts().len(), 2);
    }
}
