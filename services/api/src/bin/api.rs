//! services/api/src/bin/api.rs

use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_api::{
    adapters::{LopdfExtractor, OpenAiChatAdapter, OpenAiQuizAdapter, PgKeyValueStore},
    config::Config,
    error::ApiError,
    web::{
        dashboard_handler, document_file_handler, list_attempts_handler, list_documents_handler,
        rest::ApiDoc, select_document_handler, state::AppState, upload_document_handler,
        ws_handler,
    },
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgKeyValueStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.api_key.clone())
        .with_api_base(config.api_base.clone());
    let openai_client = Client::with_config(openai_config);

    let quiz_generator = Arc::new(OpenAiQuizAdapter::new(
        openai_client.clone(),
        config.quiz_model.clone(),
    ));
    let chat_service = Arc::new(OpenAiChatAdapter::new(
        openai_client,
        config.chat_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(
        AppState::load(
            config.clone(),
            store,
            Arc::new(LopdfExtractor::new()),
            quiz_generator,
            chat_service,
        )
        .await?,
    );

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let api_router = Router::new()
        .route("/documents", post(upload_document_handler).get(list_documents_handler))
        .route("/documents/{id}/select", post(select_document_handler))
        .route("/documents/{id}/file", get(document_file_handler))
        .route("/attempts", get(list_attempts_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
