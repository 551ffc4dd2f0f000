//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use study_assistant_core::{summarize, Document, PortError, ProgressSummary, QuizAttempt};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

/// Shown when an uploaded file cannot be turned into text.
pub const EXTRACTION_FAILED_MESSAGE: &str = "Failed to process PDF. Please try another file.";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_document_handler,
        list_documents_handler,
        select_document_handler,
        document_file_handler,
        list_attempts_handler,
        dashboard_handler,
    ),
    components(
        schemas(DocumentSummary, DocumentListResponse)
    ),
    tags(
        (name = "Study Assistant API", description = "Document library, quiz history and progress endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A document without its raw bytes or text.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct DocumentSummary {
    id: String,
    name: String,
    /// Length of the extracted text, in characters.
    text_length: usize,
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            name: document.name.clone(),
            text_length: document.extracted_text.chars().count(),
        }
    }
}

/// The library listing, in upload order.
#[derive(Serialize, ToSchema, Debug)]
pub struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
    active_id: Option<String>,
}

type HandlerError = (StatusCode, String);

fn port_error_response(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Extraction(cause) => {
            warn!("Text extraction failed: {}", cause);
            (StatusCode::UNPROCESSABLE_ENTITY, EXTRACTION_FAILED_MESSAGE.to_string())
        }
        other => {
            error!("Request failed: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Upload a PDF into the library.
///
/// Accepts a multipart/form-data request with a single file part. A file whose
/// name is already in the library is not extracted again; the stored document
/// is returned and becomes active.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content_type = "multipart/form-data", description = "The PDF to upload."),
    responses(
        (status = 201, description = "Document stored (or reused) and made active", body = DocumentSummary),
        (status = 400, description = "Bad request (e.g., missing file)"),
        (status = 422, description = "The file could not be read as a PDF"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_document_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let (file_name, file_bytes) =
        if let Some(field) = multipart.next_field().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read multipart data: {}", e),
            )
        })? {
            let name = field.file_name().unwrap_or("untitled.pdf").to_string();
            let data = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read file bytes: {}", e),
                )
            })?;
            (name, data)
        } else {
            return Err((
                StatusCode::BAD_REQUEST,
                "Multipart form must include a file".to_string(),
            ));
        };

    let summary = upload_document(&app_state, &file_name, &file_bytes).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn upload_document(
    app_state: &AppState,
    file_name: &str,
    file_bytes: &[u8],
) -> Result<DocumentSummary, HandlerError> {
    info!("Uploading '{}' ({} bytes).", file_name, file_bytes.len());
    let mut library = app_state.library.lock().await;
    let document = library
        .upload(app_state.extractor.as_ref(), file_bytes, file_name)
        .await
        .map_err(port_error_response)?;
    Ok(DocumentSummary::from(&document))
}

/// List every document in the library.
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "All documents and the active id", body = DocumentListResponse)
    )
)]
pub async fn list_documents_handler(State(app_state): State<Arc<AppState>>) -> Json<DocumentListResponse> {
    let library = app_state.library.lock().await;
    Json(DocumentListResponse {
        documents: library.documents().iter().map(DocumentSummary::from).collect(),
        active_id: library.active().map(|d| d.id.clone()),
    })
}

/// Make a document the active one.
#[utoipa::path(
    post,
    path = "/documents/{id}/select",
    params(
        ("id" = String, Path, description = "The document id.")
    ),
    responses(
        (status = 200, description = "Document is now active", body = DocumentSummary),
        (status = 404, description = "No document has that id")
    )
)]
pub async fn select_document_handler(
    State(app_state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentSummary>, HandlerError> {
    let mut library = app_state.library.lock().await;
    let document = library.select(&document_id).map_err(port_error_response)?;
    Ok(Json(DocumentSummary::from(&document)))
}

/// Download the original file of a document.
#[utoipa::path(
    get,
    path = "/documents/{id}/file",
    params(
        ("id" = String, Path, description = "The document id.")
    ),
    responses(
        (status = 200, description = "The raw file, with its original content type"),
        (status = 404, description = "No document has that id")
    )
)]
pub async fn document_file_handler(
    State(app_state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let library = app_state.library.lock().await;
    let document = library.find(&document_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Document {} not found", document_id),
        )
    })?;
    let bytes = document.raw_bytes().ok_or_else(|| {
        error!("Stored data URL for {} is malformed.", document.id);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stored file is unreadable".to_string(),
        )
    })?;
    Ok(([(header::CONTENT_TYPE, document.mime_type().to_string())], bytes))
}

/// List every saved quiz attempt, oldest first.
#[utoipa::path(
    get,
    path = "/attempts",
    responses(
        (status = 200, description = "The attempt log as a JSON array")
    )
)]
pub async fn list_attempts_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<QuizAttempt>> {
    let attempts = app_state.attempts.lock().await;
    Json(attempts.attempts().to_vec())
}

/// Progress statistics recomputed from the attempt log.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Quiz count, average score, per-topic performance, strengths and weaknesses")
    )
)]
pub async fn dashboard_handler(State(app_state): State<Arc<AppState>>) -> Json<ProgressSummary> {
    let attempts = app_state.attempts.lock().await;
    Json(summarize(attempts.attempts()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::testing::{app_state_with, Unused};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use chrono::Utc;
    use study_assistant_core::{PortResult, TextExtractor};

    struct FixedText(&'static str);

    #[async_trait]
    impl TextExtractor for FixedText {
        async fn extract_text(&self, _file_bytes: &[u8]) -> PortResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn document(name: &str) -> Document {
        Document::new(name, b"%PDF-1.4 body", "Chlorophyll absorbs light.".to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_upload_stores_and_activates_document() {
        let state = Arc::new(app_state_with(vec![], Arc::new(FixedText("Photosynthesis"))).await);

        let summary = upload_document(&state, "bio.pdf", b"%PDF").await.unwrap();
        assert_eq!(summary.name, "bio.pdf");
        assert_eq!(summary.text_length, "Photosynthesis".len());

        let listing = list_documents_handler(State(state)).await.0;
        assert_eq!(listing.documents, vec![summary]);
        assert_eq!(listing.active_id, Some(listing.documents[0].id.clone()));
    }

    #[tokio::test]
    async fn test_unreadable_upload_is_unprocessable() {
        let state = Arc::new(app_state_with(vec![], Arc::new(Unused)).await);

        let (status, message) = upload_document(&state, "broken.pdf", b"junk").await.unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, EXTRACTION_FAILED_MESSAGE);
        assert!(state.library.lock().await.documents().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_document_is_not_found() {
        let doc = document("bio.pdf");
        let state = Arc::new(app_state_with(vec![doc.clone()], Arc::new(Unused)).await);

        let missing = select_document_handler(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(missing.unwrap_err().0, StatusCode::NOT_FOUND);
        assert!(state.library.lock().await.active().is_none());

        let selected = select_document_handler(State(state.clone()), Path(doc.id.clone()))
            .await
            .unwrap();
        assert_eq!(selected.0.id, doc.id);
    }

    #[tokio::test]
    async fn test_file_is_served_with_its_mime_type() {
        let doc = document("bio.pdf");
        let state = Arc::new(app_state_with(vec![doc.clone()], Arc::new(Unused)).await);

        let response = document_file_handler(State(state), Path(doc.id.clone()))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn test_dashboard_is_empty_without_attempts() {
        let state = Arc::new(app_state_with(vec![], Arc::new(Unused)).await);
        let summary = dashboard_handler(State(state.clone())).await.0;
        assert_eq!(summary.total_quizzes, 0);
        assert_eq!(summary.average_score, 0.0);
        assert!(list_attempts_handler(State(state)).await.0.is_empty());
    }
}
