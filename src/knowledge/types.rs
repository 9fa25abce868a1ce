//! Knowledge base records and operation results.

use serde::{Deserialize, Serialize};

/// Source label for files ingested from the local knowledge directory.
pub const LOCAL_SOURCE: &str = "localfs";

/// Listing view of a knowledge item.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeItem {
    pub id: i64,
    pub source: String,
    pub folder_date: Option<String>,
    pub file_path: String,
    pub updated_at: String,
}

/// A knowledge item together with its stored JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeDocument {
    #[serde(flatten)]
    pub item: KnowledgeItem,
    pub content_hash: Option<String>,
    pub last_synced_at: Option<String>,
    pub raw_json: Option<String>,
}

/// The parts of an item the retriever and context assembler work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRecord {
    pub id: i64,
    pub file_path: String,
    pub folder_date: Option<String>,
    pub content_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub ok: bool,
    pub scanned_files: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
    pub knowledge_dir: String,
    pub errors_detail: Vec<SyncError>,
}

/// Keyword search result row.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordHit {
    pub id: i64,
    pub file_path: String,
    pub folder_date: Option<String>,
    pub snippet: String,
}

/// Semantic search result row. `score` is `1 / (1 + cosine distance)`.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticHit {
    pub chunk_id: i64,
    pub item_id: i64,
    pub file_path: String,
    pub folder_date: Option<String>,
    pub score: f64,
    pub text: String,
}

/// Sizes default to the configured chunking settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkRequest {
    pub item_id: i64,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkOutcome {
    pub ok: bool,
    pub item_id: i64,
    pub chunks: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub item_id: Option<i64>,
    /// Defaults to the configured embedding model.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedOutcome {
    pub ok: bool,
    pub embedded: usize,
    pub model: String,
    pub item_id: Option<i64>,
}

/// A chunk selected for embedding.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub id: i64,
    pub text: String,
}
