//! HTTP server startup: open the database, build the collaborators, and serve
//! the router until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::config::AssistantConfig;
use crate::db;
use crate::llm::{ChatProvider, EmbeddingProvider, OpenAiCompatibleChat, OpenAiEmbeddings};

/// Open the database and construct whichever providers have credentials.
pub fn build_state(config: AssistantConfig) -> Result<Arc<AppState>> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    info!(db = %db_path.display(), "database ready");

    match db::migrations::embedding_model_mismatch(&conn, &config.embedding.model) {
        Ok(Some(stored)) => warn!(
            stored = %stored,
            configured = %config.embedding.model,
            "embedding model changed; re-run /knowledge/embed with force=true to refresh vectors"
        ),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "could not read stored embedding model"),
    }

    let chat: Option<Arc<dyn ChatProvider>> =
        match OpenAiCompatibleChat::from_config(&config.chat) {
            Ok(client) => {
                info!(
                    model = %config.chat.model,
                    base_url = %config.chat.base_url,
                    "chat provider ready"
                );
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!(error = %e, "chat provider disabled");
                None
            }
        };

    let embedder: Option<Arc<dyn EmbeddingProvider>> =
        match OpenAiEmbeddings::from_config(&config.embedding) {
            Ok(client) => {
                info!(
                    model = %config.embedding.model,
                    dims = config.embedding.dimensions,
                    "embedding provider ready"
                );
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!(error = %e, "embedding provider disabled");
                None
            }
        };

    Ok(Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: Arc::new(config),
        chat,
        embedder,
    }))
}

pub async fn serve(config: AssistantConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "assistant API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
