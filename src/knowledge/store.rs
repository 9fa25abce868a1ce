//! Knowledge item queries and chunk regeneration.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::chunking::Chunker;
use super::flatten::sha256_hex;
use super::types::{ChunkOutcome, ContextRecord, KnowledgeDocument, KnowledgeItem};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Most recently updated first. Limits outside 1..=500 fall back to 50.
pub fn list_items(conn: &Connection, owner: &str, limit: i64) -> AppResult<Vec<KnowledgeItem>> {
    let limit = if (1..=MAX_LIST_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_LIST_LIMIT
    };
    let mut stmt = conn.prepare(
        "SELECT id, source, folder_date, file_path, updated_at
         FROM knowledge_items WHERE owner = ?1
         ORDER BY updated_at DESC, id DESC LIMIT ?2",
    )?;
    let items = stmt
        .query_map(params![owner, limit], |row| {
            Ok(KnowledgeItem {
                id: row.get(0)?,
                source: row.get(1)?,
                folder_date: row.get(2)?,
                file_path: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

pub fn get_item(conn: &Connection, owner: &str, id: i64) -> AppResult<KnowledgeDocument> {
    conn.query_row(
        "SELECT id, source, folder_date, file_path, updated_at, content_hash, last_synced_at,
                raw_json
         FROM knowledge_items WHERE owner = ?1 AND id = ?2",
        params![owner, id],
        |row| {
            Ok(KnowledgeDocument {
                item: KnowledgeItem {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    folder_date: row.get(2)?,
                    file_path: row.get(3)?,
                    updated_at: row.get(4)?,
                },
                content_hash: row.get(5)?,
                last_synced_at: row.get(6)?,
                raw_json: row.get(7)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("knowledge item {id}")))
}

/// Records for `ids`, in the order given. Unknown ids are dropped.
pub fn context_records(
    conn: &Connection,
    owner: &str,
    ids: &[i64],
) -> AppResult<Vec<ContextRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, file_path, folder_date, COALESCE(content_text, '')
         FROM knowledge_items WHERE owner = ?1 AND id = ?2",
    )?;
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        let record = stmt
            .query_row(params![owner, id], |row| {
                Ok(ContextRecord {
                    id: row.get(0)?,
                    file_path: row.get(1)?,
                    folder_date: row.get(2)?,
                    content_text: row.get(3)?,
                })
            })
            .optional()?;
        if let Some(record) = record {
            records.push(record);
        }
    }
    Ok(records)
}

/// Replace every chunk of an item with a fresh split of its text.
///
/// Runs in one transaction, so an item never ends up with partial chunks.
pub fn regenerate_chunks(
    conn: &mut Connection,
    owner: &str,
    item_id: i64,
    chunker: Chunker,
) -> AppResult<ChunkOutcome> {
    let tx = conn.transaction()?;

    let text: Option<String> = tx
        .query_row(
            "SELECT content_text FROM knowledge_items WHERE owner = ?1 AND id = ?2",
            params![owner, item_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("knowledge item {item_id}")))?;
    let text = text.unwrap_or_default();

    tx.execute(
        "DELETE FROM knowledge_chunks WHERE owner = ?1 AND item_id = ?2",
        params![owner, item_id],
    )?;

    let now = now_timestamp();
    let mut written = 0;
    {
        let mut insert = tx.prepare(
            "INSERT INTO knowledge_chunks
                 (owner, item_id, chunk_index, text, text_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )?;
        for (index, chunk) in chunker.chunks(&text).enumerate() {
            insert.execute(params![owner, item_id, index as i64, chunk, sha256_hex(chunk), now])?;
            written += 1;
        }
    }

    tx.commit()?;
    info!(
        item_id,
        chunks = written,
        size = chunker.size(),
        overlap = chunker.overlap(),
        "chunks regenerated"
    );

    Ok(ChunkOutcome {
        ok: true,
        item_id,
        chunks: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_item(
        conn: &Connection,
        owner: &str,
        path: &str,
        text: &str,
        updated_at: &str,
    ) -> i64 {
        conn.execute(
            "INSERT INTO knowledge_items
                 (owner, file_path, content_text, raw_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, '{}', ?4, ?4)",
            params![owner, path, text, updated_at],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn chunk_count(conn: &Connection, item_id: i64) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE item_id = ?1",
            [item_id],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn list_is_newest_first_with_limit_fallback() {
        let conn = crate::db::open_memory_database().unwrap();
        insert_item(&conn, "default", "a.json", "a", "2024-01-01T00:00:00.000000Z");
        insert_item(&conn, "default", "b.json", "b", "2024-03-01T00:00:00.000000Z");
        insert_item(&conn, "other", "c.json", "c", "2024-05-01T00:00:00.000000Z");

        let items = list_items(&conn, "default", 0).unwrap();
        let paths: Vec<_> = items.iter().map(|i| i.file_path.as_str()).collect();
        assert_eq!(paths, vec!["b.json", "a.json"]);

        assert_eq!(list_items(&conn, "default", 1).unwrap().len(), 1);
    }

    #[test]
    fn get_item_returns_document_or_not_found() {
        let conn = crate::db::open_memory_database().unwrap();
        let id = insert_item(&conn, "default", "a.json", "a", "2024-01-01T00:00:00.000000Z");
        let doc = get_item(&conn, "default", id).unwrap();
        assert_eq!(doc.raw_json.as_deref(), Some("{}"));
        assert!(matches!(get_item(&conn, "default", id + 1), Err(AppError::NotFound(_))));
        assert!(matches!(get_item(&conn, "other", id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn context_records_keep_requested_order() {
        let conn = crate::db::open_memory_database().unwrap();
        let a = insert_item(&conn, "default", "a.json", "alpha", "2024-01-01T00:00:00.000000Z");
        let b = insert_item(&conn, "default", "b.json", "beta", "2024-01-02T00:00:00.000000Z");
        let records = context_records(&conn, "default", &[b, 999, a]).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn regenerating_replaces_previous_chunks() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let text = "x".repeat(2000);
        let id = insert_item(&conn, "default", "a.json", &text, "2024-01-01T00:00:00.000000Z");

        let outcome = regenerate_chunks(&mut conn, "default", id, Chunker::new(200, 0)).unwrap();
        assert_eq!(outcome.chunks, 10);
        assert_eq!(chunk_count(&conn, id), 10);

        let outcome = regenerate_chunks(&mut conn, "default", id, Chunker::default()).unwrap();
        assert_eq!(outcome.chunks, 2);
        assert_eq!(chunk_count(&conn, id), 2);

        let indexes: Vec<i64> = conn
            .prepare(
                "SELECT chunk_index FROM knowledge_chunks WHERE item_id = ?1 ORDER BY chunk_index",
            )
            .unwrap()
            .query_map([id], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn regenerating_unknown_item_is_not_found() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let err = regenerate_chunks(&mut conn, "default", 7, Chunker::default()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
