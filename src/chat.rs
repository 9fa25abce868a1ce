//! Retrieval-augmented chat: preview the context a message would pull in,
//! then answer it with that context attached.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{with_db, SharedDb};
use crate::error::{AppError, AppResult};
use crate::knowledge::context::{build_context_block, DEFAULT_CONTEXT_CHARS};
use crate::knowledge::search::keyword_search;
use crate::knowledge::store::context_records;
use crate::knowledge::types::KeywordHit;
use crate::llm::{ChatMessage, ChatProvider, CompletionParams};

pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const DEFAULT_PREVIEW_LIMIT: i64 = 5;
pub const MAX_PREVIEW_LIMIT: i64 = 10;
/// Matches used when a respond request approves no records.
pub const AUTO_CONTEXT_LIMIT: usize = 5;

pub const SYSTEM_PROMPT: &str = "You are a personal assistant. Answer directly and practically.\n\
If CONTEXT (memories) is provided, use it to tailor the answer to the user's history.\n\
If the context is unrelated, ignore it and answer normally.\n\
Do not invent facts.";

const CONTEXT_HEADING: &str = "CONTEXT (retrieved memories):";

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    pub message: String,
    #[serde(default = "default_true")]
    pub use_context: bool,
    #[serde(default = "default_preview_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub use_context: bool,
    pub suggested: Vec<KeywordHit>,
    pub context_preview: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondRequest {
    pub message: String,
    #[serde(default = "default_true")]
    pub use_context: bool,
    #[serde(default)]
    pub approved_ids: Vec<i64>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RespondResponse {
    pub answer: String,
    pub used_context: bool,
    pub used_ids: Vec<i64>,
}

fn default_true() -> bool {
    true
}

fn default_preview_limit() -> i64 {
    DEFAULT_PREVIEW_LIMIT
}

fn default_temperature() -> f32 {
    CompletionParams::default().temperature
}

fn default_max_tokens() -> u32 {
    CompletionParams::default().max_tokens
}

pub fn validate_message(message: &str) -> AppResult<()> {
    let len = message.chars().count();
    if len == 0 || len > MAX_MESSAGE_CHARS {
        return Err(AppError::InvalidArgument(format!(
            "message must be 1-{MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(())
}

/// Suggested records and the context block they would produce.
pub fn preview(
    conn: &Connection,
    owner: &str,
    request: &PreviewRequest,
) -> AppResult<PreviewResponse> {
    validate_message(&request.message)?;
    if !request.use_context {
        return Ok(PreviewResponse {
            use_context: false,
            suggested: Vec::new(),
            context_preview: String::new(),
        });
    }

    let limit = request.limit.clamp(1, MAX_PREVIEW_LIMIT) as usize;
    let matches = keyword_search(conn, owner, &request.message, limit)?;
    let records: Vec<_> = matches.iter().map(|m| m.record.clone()).collect();

    Ok(PreviewResponse {
        use_context: true,
        suggested: matches.iter().map(|m| m.hit()).collect(),
        context_preview: build_context_block(&records, DEFAULT_CONTEXT_CHARS),
    })
}

/// Context for a respond request: approved ids in the given order, or the
/// top keyword matches when none were approved. Returns the ids used and the block.
pub fn gather_context(
    conn: &Connection,
    owner: &str,
    request: &RespondRequest,
) -> AppResult<(Vec<i64>, String)> {
    if !request.use_context {
        return Ok((Vec::new(), String::new()));
    }

    let records = if request.approved_ids.is_empty() {
        keyword_search(conn, owner, &request.message, AUTO_CONTEXT_LIMIT)?
            .into_iter()
            .map(|m| m.record)
            .collect()
    } else {
        context_records(conn, owner, &request.approved_ids)?
    };

    let ids = records.iter().map(|r| r.id).collect();
    Ok((ids, build_context_block(&records, DEFAULT_CONTEXT_CHARS)))
}

/// The system and user messages sent to the chat provider.
pub fn build_messages(message: &str, context_block: &str) -> Vec<ChatMessage> {
    let user = if context_block.is_empty() {
        message.to_string()
    } else {
        format!("{message}\n\n{CONTEXT_HEADING}\n{context_block}")
    };
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

pub async fn respond(
    db: &SharedDb,
    provider: Option<&dyn ChatProvider>,
    owner: &str,
    request: RespondRequest,
) -> AppResult<RespondResponse> {
    validate_message(&request.message)?;
    let provider = provider.ok_or_else(|| {
        AppError::Upstream("chat provider not configured: set DEEPSEEK_API_KEY".to_string())
    })?;

    let (used_ids, context_block) = {
        let owner = owner.to_string();
        let request = request.clone();
        with_db(db, move |conn| gather_context(conn, &owner, &request)).await?
    };

    let messages = build_messages(&request.message, &context_block);
    let params = CompletionParams {
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };
    let answer = provider.complete(&messages, &params).await?;

    info!(
        provider = provider.name(),
        used_ids = ?used_ids,
        context_chars = context_block.len(),
        "chat answered"
    );
    Ok(RespondResponse {
        answer,
        used_context: !context_block.is_empty(),
        used_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn seed(conn: &Connection, path: &str, text: &str, updated_at: &str) -> i64 {
        conn.execute(
            "INSERT INTO knowledge_items
                 (owner, file_path, folder_date, content_text, created_at, updated_at)
             VALUES ('default', ?1, NULL, ?2, ?3, ?3)",
            params![path, text, updated_at],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn preview_request(message: &str, limit: i64) -> PreviewRequest {
        PreviewRequest {
            message: message.into(),
            use_context: true,
            limit,
        }
    }

    fn respond_request(message: &str, approved_ids: Vec<i64>) -> RespondRequest {
        RespondRequest {
            message: message.into(),
            use_context: true,
            approved_ids,
            temperature: 0.2,
            max_tokens: 900,
        }
    }

    #[test]
    fn preview_clamps_limit_and_builds_context() {
        let conn = crate::db::open_memory_database().unwrap();
        for i in 0..12 {
            let updated_at = format!("2024-01-{:02}T00:00:00.000000Z", i + 1);
            seed(&conn, &format!("n{i}.json"), "deploy notes", &updated_at);
        }

        let out = preview(&conn, "default", &preview_request("deploy", 50)).unwrap();
        assert_eq!(out.suggested.len(), 10);
        assert!(out.context_preview.starts_with("[MEMORY id="));

        let out = preview(&conn, "default", &preview_request("deploy", -3)).unwrap();
        assert_eq!(out.suggested.len(), 1);
    }

    #[test]
    fn preview_without_context_is_empty() {
        let conn = crate::db::open_memory_database().unwrap();
        seed(&conn, "a.json", "deploy", "2024-01-01T00:00:00.000000Z");
        let out = preview(
            &conn,
            "default",
            &PreviewRequest {
                message: "deploy".into(),
                use_context: false,
                limit: 5,
            },
        )
        .unwrap();
        assert!(out.suggested.is_empty());
        assert!(out.context_preview.is_empty());
    }

    #[test]
    fn message_length_is_validated() {
        let conn = crate::db::open_memory_database().unwrap();
        assert!(matches!(
            preview(&conn, "default", &preview_request("", 5)),
            Err(AppError::InvalidArgument(_))
        ));
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(preview(&conn, "default", &preview_request(&long, 5)).is_err());
    }

    #[test]
    fn approved_ids_take_precedence_in_order() {
        let conn = crate::db::open_memory_database().unwrap();
        let a = seed(&conn, "a.json", "alpha", "2024-01-01T00:00:00.000000Z");
        let b = seed(&conn, "b.json", "beta", "2024-01-02T00:00:00.000000Z");
        seed(&conn, "c.json", "deploy", "2024-01-03T00:00:00.000000Z");

        let request = respond_request("deploy", vec![b, a]);
        let (ids, block) = gather_context(&conn, "default", &request).unwrap();
        assert_eq!(ids, vec![b, a]);
        assert!(block.find("id=") < block.rfind("id="));
        assert!(block.starts_with(&format!("[MEMORY id={b} ")));

        let request = respond_request("deploy", vec![]);
        let (ids, _) = gather_context(&conn, "default", &request).unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn context_is_appended_under_heading() {
        let messages = build_messages("how do I deploy?", "[MEMORY id=1 file=a folder=-]\nsteps");
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages[1].content,
            "how do I deploy?\n\nCONTEXT (retrieved memories):\n\
             [MEMORY id=1 file=a folder=-]\nsteps"
        );

        let bare = build_messages("hi", "");
        assert_eq!(bare[1].content, "hi");
    }
}
