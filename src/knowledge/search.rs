//! Keyword retrieval over flattened knowledge text.
//!
//! Queries are reduced to a short token list; an item matches when its text
//! contains any token, case-insensitively. Matches are ranked by recency only.

use rusqlite::{params_from_iter, Connection};

use super::types::{ContextRecord, KeywordHit};
use crate::error::AppResult;

pub const MAX_TOKENS: usize = 10;
pub const MIN_TOKEN_LEN: usize = 3;
pub const SNIPPET_BEFORE: usize = 80;
pub const SNIPPET_AFTER: usize = 140;
pub const SNIPPET_FALLBACK: usize = 220;

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
pub const MAX_SEARCH_LIMIT: i64 = 50;

const STOP_WORDS: &[&str] = &[
    "como", "resolvo", "erro", "no", "na", "pro", "para", "de", "do", "da", "um", "uma", "que", "o",
    "a", "e",
];

/// Extra tokens appended when any trigger substring appears in the query.
const BOOSTS: &[(&[&str], &[&str])] = &[
    (
        &["gcs", "bucket", "storage"],
        &["bucket", "gcs", "iam", "permiss", "writer", "storage"],
    ),
    (
        &["403"],
        &["forbidden", "permission", "permiss", "iam", "writer"],
    ),
];

/// A matched record with its display snippet.
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub record: ContextRecord,
    pub snippet: String,
}

impl KeywordMatch {
    pub fn hit(&self) -> KeywordHit {
        KeywordHit {
            id: self.record.id,
            file_path: self.record.file_path.clone(),
            folder_date: self.record.folder_date.clone(),
            snippet: self.snippet.clone(),
        }
    }
}

/// Lower-case `[a-z0-9_]` runs of at least three characters, stop words
/// removed, boost tokens appended, deduplicated in order, at most ten.
pub fn tokenize(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();

    let mut tokens: Vec<String> = lowered
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect();

    for (triggers, extra) in BOOSTS {
        if triggers.iter().any(|t| lowered.contains(t)) {
            tokens.extend(extra.iter().map(|t| t.to_string()));
        }
    }

    let mut seen = std::collections::HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    tokens.truncate(MAX_TOKENS);
    tokens
}

pub fn normalize_search_limit(limit: i64) -> i64 {
    if (1..=MAX_SEARCH_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_SEARCH_LIMIT
    }
}

/// Items containing any token of `query`, most recently updated first.
pub fn keyword_search(
    conn: &Connection,
    owner: &str,
    query: &str,
    limit: usize,
) -> AppResult<Vec<KeywordMatch>> {
    let tokens = tokenize(query);
    if tokens.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let clauses = (0..tokens.len())
        .map(|i| format!("instr(lower(COALESCE(content_text, '')), ?{}) > 0", i + 2))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT id, file_path, folder_date, COALESCE(content_text, '')
         FROM knowledge_items
         WHERE owner = ?1 AND ({clauses})
         ORDER BY updated_at DESC, id DESC
         LIMIT {limit}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let bind = std::iter::once(owner).chain(tokens.iter().map(String::as_str));
    let records = stmt
        .query_map(params_from_iter(bind), |row| {
            Ok(ContextRecord {
                id: row.get(0)?,
                file_path: row.get(1)?,
                folder_date: row.get(2)?,
                content_text: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records
        .into_iter()
        .map(|record| {
            let snippet = snippet(&record.content_text, &tokens);
            KeywordMatch { record, snippet }
        })
        .collect())
}

/// Window around the first token (in token order) found in `text`, or its
/// opening characters when none is.
pub fn snippet(text: &str, tokens: &[String]) -> String {
    // ASCII lower-casing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();
    let found = tokens.iter().find_map(|t| lowered.find(t.as_str()));

    match found {
        Some(byte_idx) => {
            let char_idx = text[..byte_idx].chars().count();
            let start = char_idx.saturating_sub(SNIPPET_BEFORE);
            let end = char_idx + SNIPPET_AFTER;
            text.chars().skip(start).take(end - start).collect()
        }
        None => text.chars().take(SNIPPET_FALLBACK).collect(),
    }
}
