use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::{ApiResult, AppState};
use crate::db::with_db;
use crate::error::AppError;
use crate::knowledge::chunking::Chunker;
use crate::knowledge::embed;
use crate::knowledge::search::{keyword_search, normalize_search_limit};
use crate::knowledge::store::{self, DEFAULT_LIST_LIMIT};
use crate::knowledge::sync;
use crate::knowledge::types::{
    ChunkOutcome, ChunkRequest, EmbedOutcome, EmbedRequest, KeywordHit, KnowledgeDocument,
    KnowledgeItem, SemanticHit, SyncResult,
};

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SemanticQuery {
    pub q: String,
    pub k: Option<i64>,
}

pub async fn sync_local(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SyncQuery>,
) -> ApiResult<SyncResult> {
    let owner = state.owner();
    let dir: PathBuf = state.config.resolved_knowledge_dir();
    let result = with_db(&state.db, move |conn| {
        sync::sync_local(conn, &owner, &dir, q.dry_run)
    })
    .await?;
    Ok(Json(result))
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Vec<KnowledgeItem>> {
    let owner = state.owner();
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let items = with_db(&state.db, move |conn| store::list_items(conn, &owner, limit)).await?;
    Ok(Json(items))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Vec<KeywordHit>> {
    if q.q.trim().is_empty() {
        return Err(AppError::InvalidArgument("q must not be empty".to_string()));
    }
    let owner = state.owner();
    let limit = normalize_search_limit(q.limit.unwrap_or(0)) as usize;
    let matches = with_db(&state.db, move |conn| keyword_search(conn, &owner, &q.q, limit)).await?;
    Ok(Json(matches.iter().map(|m| m.hit()).collect()))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<KnowledgeDocument> {
    let owner = state.owner();
    let doc = with_db(&state.db, move |conn| store::get_item(conn, &owner, id)).await?;
    Ok(Json(doc))
}

pub async fn chunk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChunkRequest>,
) -> ApiResult<ChunkOutcome> {
    let owner = state.owner();
    let defaults = &state.config.knowledge;
    let chunker = Chunker::new(
        request.chunk_size.unwrap_or(defaults.chunk_size),
        request.overlap.unwrap_or(defaults.chunk_overlap),
    );
    let outcome = with_db(&state.db, move |conn| {
        store::regenerate_chunks(conn, &owner, request.item_id, chunker)
    })
    .await?;
    Ok(Json(outcome))
}

pub async fn embed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmbedRequest>,
) -> ApiResult<EmbedOutcome> {
    let embedder = state.embedder()?;
    let owner = state.owner();
    let outcome = embed::embed_chunks(&state.db, embedder.as_ref(), &owner, request).await?;
    Ok(Json(outcome))
}

pub async fn semantic_search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SemanticQuery>,
) -> ApiResult<Vec<SemanticHit>> {
    let embedder = state.embedder()?;
    let owner = state.owner();
    let k = q.k.unwrap_or(embed::DEFAULT_K);
    let hits = embed::semantic_search(&state.db, embedder.as_ref(), &owner, &q.q, k).await?;
    Ok(Json(hits))
}
