use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ApiResult, AppState};
use crate::db::with_db;
use crate::radar::{self, NewRadarItem, RadarItem};

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<RadarItem>> {
    let owner = state.owner();
    let items = with_db(&state.db, move |conn| radar::list_radar_items(conn, &owner)).await?;
    Ok(Json(items))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewRadarItem>,
) -> ApiResult<Value> {
    let owner = state.owner();
    let item = with_db(&state.db, move |conn| {
        radar::create_radar_item(conn, &owner, &input)
    })
    .await?;
    Ok(Json(json!({ "ok": true, "id": item.id })))
}
