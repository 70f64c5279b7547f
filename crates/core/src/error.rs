//! Error types for the Baton domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Per-turn operations
//! never return these; they are reserved for startup-time surfaces such as
//! configuration and knowledge-base snapshots.

use thiserror::Error;

/// The top-level error type for all Baton operations that can fail.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Knowledge store errors ---
    #[error("Knowledge store error: {0}")]
    KnowledgeStore(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
