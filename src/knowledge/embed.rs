//! Chunk embedding and vector similarity search.
//!
//! Vectors are stored on `knowledge_chunks.embedding` as little-endian `f32`
//! blobs and ranked with sqlite-vec's `vec_distance_cosine`.

use rusqlite::{params, Connection};
use tracing::info;

use super::flatten::truncate_chars;
use super::types::{EmbedOutcome, EmbedRequest, PendingChunk, SemanticHit};
use crate::db::{now_timestamp, with_db, SharedDb};
use crate::error::{AppError, AppResult};
use crate::llm::{EmbeddingProvider, LlmError};

pub const DEFAULT_EMBED_LIMIT: i64 = 200;
pub const MAX_EMBED_LIMIT: i64 = 2000;
pub const DEFAULT_K: i64 = 5;
pub const MAX_K: i64 = 25;
pub const MAX_HIT_TEXT_CHARS: usize = 1200;

pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub fn normalize_embed_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if (1..=MAX_EMBED_LIMIT).contains(&l) => l,
        _ => DEFAULT_EMBED_LIMIT,
    }
}

pub fn normalize_k(k: i64) -> i64 {
    if (1..=MAX_K).contains(&k) {
        k
    } else {
        DEFAULT_K
    }
}

/// Chunks to embed, oldest first: those without a vector, or all when `force`.
pub fn pending_chunks(
    conn: &Connection,
    owner: &str,
    item_id: Option<i64>,
    force: bool,
    limit: i64,
) -> AppResult<Vec<PendingChunk>> {
    let mut stmt = conn.prepare(
        "SELECT id, text FROM knowledge_chunks
         WHERE owner = ?1
           AND (?2 IS NULL OR item_id = ?2)
           AND (?3 OR embedding IS NULL)
         ORDER BY id ASC
         LIMIT ?4",
    )?;
    let chunks = stmt
        .query_map(params![owner, item_id, force, limit], |row| {
            Ok(PendingChunk {
                id: row.get(0)?,
                text: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(chunks)
}

/// Write one vector per chunk in a single transaction.
pub fn store_embeddings(
    conn: &mut Connection,
    chunks: &[PendingChunk],
    vectors: &[Vec<f32>],
    model: &str,
) -> AppResult<usize> {
    if chunks.len() != vectors.len() {
        return Err(LlmError::CountMismatch {
            expected: chunks.len(),
            got: vectors.len(),
        }
        .into());
    }

    let tx = conn.transaction()?;
    let now = now_timestamp();
    {
        let mut update = tx.prepare(
            "UPDATE knowledge_chunks SET embedding = ?1, embedding_model = ?2, updated_at = ?3
             WHERE id = ?4",
        )?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            update.execute(params![embedding_to_bytes(vector), model, now, chunk.id])?;
        }
    }
    crate::db::migrations::set_embedding_model(&tx, model)?;
    tx.commit()?;
    Ok(chunks.len())
}

/// Embed pending chunks in one provider batch and store the vectors.
pub async fn embed_chunks(
    db: &SharedDb,
    embedder: &dyn EmbeddingProvider,
    owner: &str,
    request: EmbedRequest,
) -> AppResult<EmbedOutcome> {
    let limit = normalize_embed_limit(request.limit);
    let model = request
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| embedder.default_model().to_string());

    let chunks = {
        let owner = owner.to_string();
        let (item_id, force) = (request.item_id, request.force);
        with_db(db, move |conn| pending_chunks(conn, &owner, item_id, force, limit)).await?
    };

    if chunks.is_empty() {
        return Ok(EmbedOutcome {
            ok: true,
            embedded: 0,
            model,
            item_id: request.item_id,
        });
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts, &model).await?;

    let embedded = {
        let model = model.clone();
        with_db(db, move |conn| store_embeddings(conn, &chunks, &vectors, &model)).await?
    };

    info!(embedded, model = %model, item_id = ?request.item_id, "chunks embedded");
    Ok(EmbedOutcome {
        ok: true,
        embedded,
        model,
        item_id: request.item_id,
    })
}

/// Nearest chunks to `vector` among those with the same dimensionality.
pub fn search_by_vector(
    conn: &Connection,
    owner: &str,
    vector: &[f32],
    k: i64,
) -> AppResult<Vec<SemanticHit>> {
    let bytes = embedding_to_bytes(vector);
    let mut stmt = conn.prepare(
        "SELECT c.id, c.item_id, i.file_path, i.folder_date, c.text,
                vec_distance_cosine(c.embedding, ?2) AS distance
         FROM knowledge_chunks c
         JOIN knowledge_items i ON i.id = c.item_id
         WHERE c.owner = ?1 AND i.owner = ?1
           AND c.embedding IS NOT NULL AND length(c.embedding) = ?3
         ORDER BY distance ASC, c.id ASC
         LIMIT ?4",
    )?;
    let hits = stmt
        .query_map(params![owner, bytes, bytes.len() as i64, k], |row| {
            let text: String = row.get(4)?;
            let distance: f64 = row.get(5)?;
            Ok(SemanticHit {
                chunk_id: row.get(0)?,
                item_id: row.get(1)?,
                file_path: row.get(2)?,
                folder_date: row.get(3)?,
                score: 1.0 / (1.0 + distance),
                text: truncate_chars(&text, MAX_HIT_TEXT_CHARS).to_string(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hits)
}

/// Embed `query` with the provider's model and rank stored chunks against it.
pub async fn semantic_search(
    db: &SharedDb,
    embedder: &dyn EmbeddingProvider,
    owner: &str,
    query: &str,
    k: i64,
) -> AppResult<Vec<SemanticHit>> {
    if query.trim().is_empty() {
        return Err(AppError::InvalidArgument("query must not be empty".to_string()));
    }
    let k = normalize_k(k);
    let model = embedder.default_model().to_string();

    let mut vectors = embedder.embed(&[query.to_string()], &model).await?;
    if vectors.len() != 1 {
        return Err(LlmError::CountMismatch {
            expected: 1,
            got: vectors.len(),
        }
        .into());
    }
    let vector = vectors.remove(0);

    let owner = owner.to_string();
    with_db(db, move |conn| search_by_vector(conn, &owner, &vector, k)).await
}
