//! crates/study_assistant_core/src/library.rs
//!
//! The document library: every uploaded coursebook, deduplicated by file name,
//! plus which one is currently active.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::Document;
use crate::ports::{self, keys, KeyValueStore, PortError, PortResult, TextExtractor};

pub struct DocumentLibrary {
    store: Arc<dyn KeyValueStore>,
    documents: Vec<Document>,
    active_id: Option<String>,
}

impl DocumentLibrary {
    /// Loads the persisted document list. No document is active after loading.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> PortResult<Self> {
        let documents: Vec<Document> = ports::load_or_default(store.as_ref(), keys::DOCUMENTS).await?;
        info!("Loaded {} documents from the store.", documents.len());
        Ok(Self {
            store,
            documents,
            active_id: None,
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn active(&self) -> Option<&Document> {
        let id = self.active_id.as_deref()?;
        self.find(id)
    }

    pub fn find(&self, document_id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == document_id)
    }

    /// Adds a document, or returns the existing one if the name is already known.
    ///
    /// A known name short-circuits before the extractor runs. On extraction or
    /// persistence failure the library is left untouched.
    pub async fn upload(
        &mut self,
        extractor: &dyn TextExtractor,
        file_bytes: &[u8],
        file_name: &str,
    ) -> PortResult<Document> {
        if let Some(existing) = self.documents.iter().find(|d| d.name == file_name) {
            info!("Document '{}' already uploaded; reusing {}.", file_name, existing.id);
            let existing = existing.clone();
            self.active_id = Some(existing.id.clone());
            return Ok(existing);
        }

        let text = extractor.extract_text(file_bytes).await?;
        let document = Document::new(file_name, file_bytes, text, Utc::now());

        let mut updated = self.documents.clone();
        updated.push(document.clone());
        ports::save(self.store.as_ref(), keys::DOCUMENTS, &updated).await?;

        info!(
            "Stored document {} ({} characters of text).",
            document.id,
            document.extracted_text.chars().count()
        );
        self.documents = updated;
        self.active_id = Some(document.id.clone());
        Ok(document)
    }

    /// Marks a document as active.
    pub fn select(&mut self, document_id: &str) -> PortResult<Document> {
        let document = self
            .find(document_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        self.active_id = Some(document.id.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextExtractor for CountingExtractor {
        async fn extract_text(&self, file_bytes: &[u8]) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} bytes of text\n\n", file_bytes.len()))
        }
    }

    struct BrokenExtractor;

    #[async_trait]
    impl TextExtractor for BrokenExtractor {
        async fn extract_text(&self, _file_bytes: &[u8]) -> PortResult<String> {
            Err(PortError::Extraction("not a pdf".to_string()))
        }
    }

    async fn empty_library() -> (Arc<InMemoryStore>, DocumentLibrary) {
        let store = Arc::new(InMemoryStore::new());
        let library = DocumentLibrary::load(store.clone()).await.unwrap();
        (store, library)
    }

    #[tokio::test]
    async fn test_upload_adds_and_activates_document() {
        let (_, mut library) = empty_library().await;
        let extractor = CountingExtractor::default();

        let doc = library.upload(&extractor, b"abc", "bio.pdf").await.unwrap();

        assert_eq!(library.documents().len(), 1);
        assert_eq!(library.active().map(|d| d.id.as_str()), Some(doc.id.as_str()));
        assert_eq!(doc.extracted_text, "3 bytes of text\n\n");
    }

    #[tokio::test]
    async fn test_reupload_with_same_name_reuses_document() {
        let (_, mut library) = empty_library().await;
        let extractor = CountingExtractor::default();

        let first = library.upload(&extractor, b"abc", "bio.pdf").await.unwrap();
        library.upload(&extractor, b"other", "chem.pdf").await.unwrap();
        let again = library.upload(&extractor, b"different bytes", "bio.pdf").await.unwrap();

        assert_eq!(first, again);
        assert_eq!(library.documents().len(), 2);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(library.active().map(|d| d.id.clone()), Some(first.id));
    }

    #[tokio::test]
    async fn test_extraction_failure_leaves_library_unchanged() {
        let (store, mut library) = empty_library().await;

        let result = library.upload(&BrokenExtractor, b"junk", "junk.pdf").await;

        assert!(matches!(result, Err(PortError::Extraction(_))));
        assert!(library.documents().is_empty());
        assert!(library.active().is_none());
        assert!(store.get(keys::DOCUMENTS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_documents_survive_reload() {
        let (store, mut library) = empty_library().await;
        library
            .upload(&CountingExtractor::default(), b"abc", "bio.pdf")
            .await
            .unwrap();

        let reloaded = DocumentLibrary::load(store).await.unwrap();
        assert_eq!(reloaded.documents(), library.documents());
        assert!(reloaded.active().is_none());
    }

    #[tokio::test]
    async fn test_select_unknown_document_is_not_found() {
        let (_, mut library) = empty_library().await;
        let doc = library
            .upload(&CountingExtractor::default(), b"abc", "bio.pdf")
            .await
            .unwrap();

        let result = library.select("missing");
        assert!(matches!(result, Err(PortError::NotFound(_))));
        assert_eq!(library.active().map(|d| d.id.clone()), Some(doc.id.clone()));

        let selected = library.select(&doc.id).unwrap();
        assert_eq!(selected.id, doc.id);
    }
}
