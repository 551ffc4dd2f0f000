//! services/api/src/adapters/pdf.rs
//!
//! This module contains the adapter for PDF text extraction.
//! It implements the `TextExtractor` port from the `core` crate using `lopdf`.

use async_trait::async_trait;
use study_assistant_core::ports::{PortError, PortResult, TextExtractor};
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextExtractor` for PDF files.
#[derive(Clone, Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parses the document and returns the text of each page in page order.
    /// Pages that fail to decode contribute empty text.
    fn extract_pages(file_bytes: &[u8]) -> PortResult<Vec<String>> {
        let document = lopdf::Document::load_mem(file_bytes)
            .map_err(|e| PortError::Extraction(e.to_string()))?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    warn!("Could not extract text from page {}: {}", page_number, e);
                    pages.push(String::new());
                }
            }
        }
        debug!("Extracted text from {} pages.", pages.len());
        Ok(pages)
    }
}

/// Joins page texts, collapsing runs of whitespace inside a page to single
/// spaces and following every page with a blank line.
fn join_pages(pages: &[String]) -> String {
    let mut all_text = String::new();
    for page in pages {
        let words: Vec<&str> = page.split_whitespace().collect();
        all_text.push_str(&words.join(" "));
        all_text.push_str("\n\n");
    }
    all_text
}

//=========================================================================================
// `TextExtractor` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextExtractor for LopdfExtractor {
    async fn extract_text(&self, file_bytes: &[u8]) -> PortResult<String> {
        let owned = file_bytes.to_vec();
        let pages = tokio::task::spawn_blocking(move || Self::extract_pages(&owned))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))??;
        Ok(join_pages(&pages))
    }
}
