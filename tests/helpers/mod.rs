#![allow(dead_code)]

use assistant::api::AppState;
use assistant::config::AssistantConfig;
use assistant::db;
use assistant::llm::{ChatMessage, ChatProvider, CompletionParams, EmbeddingProvider, LlmError};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const OWNER: &str = "default";

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Insert a knowledge item directly. Returns its id.
pub fn insert_item(
    conn: &Connection,
    file_path: &str,
    folder: Option<&str>,
    text: &str,
    updated_at: &str,
) -> i64 {
    conn.execute(
        "INSERT INTO knowledge_items
             (owner, source, file_path, folder_date, content_text, created_at, updated_at)
         VALUES (?1, 'localfs', ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![OWNER, file_path, folder, text, updated_at],
    )
    .unwrap();
    conn.last_insert_rowid()
}

/// Write `contents` to `rel` under `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

// ── Fake collaborators ──────────────────────────────────────────────────────

/// Chat provider that answers with a fixed string and records every prompt.
#[derive(Default)]
pub struct FakeChat {
    pub answer: String,
    pub fail: bool,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeChat {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_user_message(&self) -> String {
        let calls = self.calls.lock().unwrap();
        let messages = calls.last().expect("no chat calls recorded");
        messages.iter().rfind(|m| m.role == "user").unwrap().content.clone()
    }
}

#[async_trait::async_trait]
impl ChatProvider for FakeChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(LlmError::RequestFailed("HTTP 500: boom".to_string()));
        }
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Embedder mapping text onto three topic axes: rust, garden, everything else.
pub struct FakeEmbedder;

pub fn topic_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let rust = if lower.contains("rust") { 1.0 } else { 0.0 };
    let garden = if lower.contains("garden") { 1.0 } else { 0.0 };
    vec![rust, garden, 0.1]
}

#[async_trait::async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts.iter().map(|t| topic_vector(t)).collect())
    }

    fn default_model(&self) -> &str {
        "fake-embed"
    }
}

// ── App state ───────────────────────────────────────────────────────────────

pub fn test_config(knowledge_dir: Option<&Path>) -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.storage.owner = OWNER.to_string();
    if let Some(dir) = knowledge_dir {
        config.knowledge.dir = dir.display().to_string();
    }
    config
}

/// State over an in-memory database with optional fake collaborators.
pub fn test_state(
    knowledge_dir: Option<&Path>,
    chat: Option<Arc<dyn ChatProvider>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
) -> Arc<AppState> {
    Arc::new(AppState {
        db: Arc::new(Mutex::new(test_db())),
        config: Arc::new(test_config(knowledge_dir)),
        chat,
        embedder,
    })
}
