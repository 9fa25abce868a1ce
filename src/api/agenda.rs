use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::{today, ApiResult, AppState};
use crate::agenda::{self, AgendaOverview};
use crate::db::with_db;
use crate::tasks::types::DEFAULT_NEXT_DAYS;

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub date_ref: Option<NaiveDate>,
    pub days: Option<i64>,
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OverviewQuery>,
) -> ApiResult<AgendaOverview> {
    let owner = state.owner();
    let date_ref = q.date_ref.unwrap_or_else(today);
    let days = q.days.unwrap_or(DEFAULT_NEXT_DAYS);
    let overview = with_db(&state.db, move |conn| {
        agenda::overview(conn, &owner, date_ref, days, true)
    })
    .await?;
    Ok(Json(overview))
}
