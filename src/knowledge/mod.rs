//! Knowledge base: JSON documents synced from a local directory, flattened
//! for keyword retrieval, chunked, and optionally embedded for similarity search.

pub mod chunking;
pub mod context;
pub mod embed;
pub mod flatten;
pub mod search;
pub mod store;
pub mod sync;
pub mod types;

pub use chunking::Chunker;
pub use context::{build_context_block, DEFAULT_CONTEXT_CHARS};
pub use search::{keyword_search, tokenize, KeywordMatch};
pub use sync::sync_local;
pub use types::{ContextRecord, KeywordHit, SemanticHit, SyncResult};
