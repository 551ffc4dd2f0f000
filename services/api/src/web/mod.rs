pub mod chat_task;
pub mod protocol;
pub mod quiz_task;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers to make them easily accessible
// to the binary that will build the web server router.
pub use rest::{
    dashboard_handler, document_file_handler, list_attempts_handler, list_documents_handler,
    select_document_handler, upload_document_handler,
};
pub use ws_handler::ws_handler;
