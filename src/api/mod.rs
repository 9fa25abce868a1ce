//! JSON-over-HTTP surface.
//!
//! Every handler runs as the configured owner. Database work is pushed onto
//! the blocking pool through [`crate::db::with_db`].

pub mod agenda;
pub mod chat;
pub mod knowledge;
pub mod radar;
pub mod tasks;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AssistantConfig;
use crate::db::SharedDb;
use crate::error::AppError;
use crate::llm::{ChatProvider, EmbeddingProvider};

pub struct AppState {
    pub db: SharedDb,
    pub config: Arc<AssistantConfig>,
    /// `None` when no chat API key is configured.
    pub chat: Option<Arc<dyn ChatProvider>>,
    /// `None` when no embedding API key is configured.
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl AppState {
    pub fn owner(&self) -> String {
        self.config.storage.owner.clone()
    }

    pub fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>, AppError> {
        self.embedder.clone().ok_or_else(|| {
            AppError::Upstream("embedding provider not configured: set OPENAI_API_KEY".to_string())
        })
    }
}

pub type ApiResult<T> = Result<Json<T>, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Today's date in local time, used when a request carries no reference date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", post(tasks::create))
        .route("/tasks/today", get(tasks::list_today))
        .route("/tasks/week", get(tasks::list_week))
        .route("/tasks/next", get(tasks::list_next))
        .route("/tasks/{id}", get(tasks::get_one).delete(tasks::delete_one))
        .route("/tasks/{id}/complete", post(tasks::complete))
        .route("/radar", get(radar::list).post(radar::create))
        .route("/agenda/overview", get(agenda::overview))
        .route("/knowledge/sync_local", post(knowledge::sync_local))
        .route("/knowledge/items", get(knowledge::list_items))
        .route("/knowledge/search", get(knowledge::search))
        .route("/knowledge/chunk", post(knowledge::chunk))
        .route("/knowledge/embed", post(knowledge::embed))
        .route("/knowledge/semantic_search", get(knowledge::semantic_search))
        .route("/knowledge/{id}", get(knowledge::get_item))
        .route("/chat/preview", post(chat::preview))
        .route("/chat/respond", post(chat::respond))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
