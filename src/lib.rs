//! Personal assistant backend: an agenda of one-off and recurring tasks, a
//! radar list of loose follow-ups, and retrieval-augmented chat over a local
//! knowledge base of JSON documents.
//!
//! # Architecture
//!
//! - **Storage**: SQLite, with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   providing cosine distance over chunk embeddings
//! - **Recurrence**: an RRULE subset expanded per listing window, never
//!   materialized; completions are recorded per occurrence date
//! - **Retrieval**: keyword matching over flattened document text, plus
//!   optional semantic search through an OpenAI-compatible embeddings API
//! - **Transport**: JSON over HTTP (axum) and a small terminal CLI
//!
//! # Modules
//!
//! - [`tasks`]: task store, recurrence expansion, completions and windows
//! - [`radar`] and [`agenda`]: follow-up list and the combined overview
//! - [`knowledge`]: sync, flattening, chunking, retrieval and embeddings
//! - [`chat`]: context assembly and the chat round-trip
//! - [`llm`]: chat and embedding API clients
//! - [`api`] and [`server`]: HTTP routes and startup
//! - [`config`], [`db`], [`error`]: ambient plumbing

pub mod agenda;
pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod radar;
pub mod server;
pub mod tasks;
