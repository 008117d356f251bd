//! Settings and error types for context selection.

use thiserror::Error;

/// Default character budget for a single chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;
/// Default number of chunks forwarded to the generation backend.
pub const DEFAULT_TOP_K: usize = 3;

/// Errors produced while configuring or running context selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// Chunking was asked for a zero-sized budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Selection was asked to keep zero chunks.
    #[error("top_k must be greater than zero")]
    InvalidTopK,
}

/// Validated chunking and selection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Number of chunks kept after scoring.
    pub top_k: usize,
}

impl ContextSettings {
    /// Build settings, rejecting zero values.
    pub fn new(chunk_size: usize, top_k: usize) -> Result<Self, ContextError> {
        if chunk_size == 0 {
            return Err(ContextError::InvalidChunkSize);
        }
        if top_k == 0 {
            return Err(ContextError::InvalidTopK);
        }
        Ok(Self { chunk_size, top_k })
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
        }
    }
}
