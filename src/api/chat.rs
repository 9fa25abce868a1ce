use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use super::{ApiResult, AppState};
use crate::chat::{self, PreviewRequest, PreviewResponse, RespondRequest, RespondResponse};
use crate::db::with_db;

pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<PreviewResponse> {
    let owner = state.owner();
    let response = with_db(&state.db, move |conn| chat::preview(conn, &owner, &request)).await?;
    Ok(Json(response))
}

pub async fn respond(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RespondRequest>,
) -> ApiResult<RespondResponse> {
    let owner = state.owner();
    let response = chat::respond(&state.db, state.chat.as_deref(), &owner, request).await?;
    Ok(Json(response))
}
