//! # Baton Core
//!
//! Shared domain types, text utilities, and error definitions for the Baton
//! reasoning-pipeline control layer. Every other crate depends inward on
//! this one.
//!
//! ## Design Philosophy
//!
//! The pipeline sits in the critical path of every conversational turn, so
//! the per-turn operations built on these types never fail: degenerate input
//! degrades to a neutral result. The error types here cover only the
//! ambient surfaces that may legitimately fail (configuration loading,
//! snapshot decoding).

pub mod error;
pub mod keywords;
pub mod memory;
pub mod sync;
pub mod text;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use keywords::{KeywordSet, TextProbe};
pub use memory::MemoryCandidate;
pub use text::{char_len, safe_ratio};
