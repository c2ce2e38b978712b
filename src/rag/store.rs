//! DocumentStore trait, the retrieval boundary of the agentic loop.
//!
//! Stores hold pre-embedded course-material chunks. Thresholding is the
//! store's job: a search with no qualifying chunk is an empty result, not
//! an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm::LlmError;

/// Source identity of a chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
    /// Anything else the ingestion pipeline attached.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            page_label: None,
            extra: Map::new(),
        }
    }

    pub fn with_page(mut self, page_label: impl Into<String>) -> Self {
        self.page_label = Some(page_label.into());
        self
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    /// Relevance in [0, 1], higher is better.
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// A chunk as written by the ingestion side.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to embed query: {0}")]
    Embedding(#[source] LlmError),
    #[error("embedding dimension mismatch: query has {expected}, stored chunk has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("cannot score an empty vector")]
    EmptyVector,
    #[error("invalid chunk metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Top `top_k` chunks for `query`, best first, all above the store's threshold.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, StoreError>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<usize, StoreError>;
}
