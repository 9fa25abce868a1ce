use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssistantConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub knowledge: KnowledgeConfig,
    pub chat: ChatConfig,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Owner identity every request runs as until an auth layer supplies one.
    pub owner: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            knowledge: KnowledgeConfig::default(),
            chat: ChatConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_assistant_dir()
            .join("assistant.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            owner: "default".into(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        let dir = default_assistant_dir()
            .join("knowledge")
            .to_string_lossy()
            .into_owned();
        Self {
            dir,
            chunk_size: 1100,
            chunk_overlap: 180,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".into(),
            model: "deepseek-chat".into(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Returns `~/.assistant/`, or `./.assistant/` when no home directory is known.
pub fn default_assistant_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".assistant")
}

/// Returns the default config file path: `~/.assistant/config.toml`
pub fn default_config_path() -> PathBuf {
    default_assistant_dir().join("config.toml")
}

impl AssistantConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AssistantConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ASSISTANT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ASSISTANT_OWNER") {
            self.storage.owner = val;
        }
        if let Ok(val) = std::env::var("ASSISTANT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ASSISTANT_HOST") {
            self.server.host = val;
        }
        if let Some(port) = env_parse::<u16>("ASSISTANT_PORT") {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("KNOWLEDGE_DIR") {
            self.knowledge.dir = val;
        }

        if let Some(key) = env_non_empty("DEEPSEEK_API_KEY") {
            self.chat.api_key = Some(key);
        }
        if let Some(url) = env_non_empty("DEEPSEEK_BASE_URL") {
            self.chat.base_url = url;
        }
        if let Some(model) = env_non_empty("DEEPSEEK_MODEL") {
            self.chat.model = model;
        }
        if let Some(secs) = env_parse::<u64>("DEEPSEEK_TIMEOUT_SECONDS") {
            self.chat.timeout_secs = secs;
        }

        if let Some(key) = env_non_empty("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = env_non_empty("OPENAI_BASE_URL") {
            self.embedding.base_url = url;
        }
        if let Some(model) = env_non_empty("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dim) = env_parse::<usize>("OPENAI_EMBED_DIM") {
            self.embedding.dimensions = dim;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the knowledge source directory, expanding `~` if needed.
    pub fn resolved_knowledge_dir(&self) -> PathBuf {
        expand_tilde(&self.knowledge.dir)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|v| v.parse().ok())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
