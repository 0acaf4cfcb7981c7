//! ragdex: local RAG ingestion and query pipeline
//!
//! Splits documents into overlapping chunks, embeds them with a local or
//! remote provider, and indexes the vectors in an embedded SQLite store
//! for top-k cosine similarity queries.

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod export;
pub mod load;
pub mod store;

pub use error::{Error, Result};
