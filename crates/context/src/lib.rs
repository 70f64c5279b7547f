//! # Baton Context
//!
//! Context-window management for the reasoning pipeline: entity/concept
//! extraction, smart compression, and the handoff optimizer that packs
//! ranked memories into a complexity-sized budget.
//!
//! Everything here is pure computation over the caller's inputs. Each
//! CPU-bound operation has an `_async` twin that runs the same code on
//! tokio's blocking pool.

pub mod compressor;
pub mod extractor;
pub mod optimizer;
pub mod token;

pub use compressor::{CompressedContext, CompressionStrategy, SmartContextCompressor};
pub use extractor::EntityExtractor;
pub use optimizer::{HandoffOptimizer, MemoryOptimizationResult, OptimizedMemory};
pub use token::estimate_tokens;
