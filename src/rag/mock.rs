use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{ChunkMetadata, DocumentStore, RetrievedChunk, StoreError};

/// Returns canned results per call and records every query it was asked.
pub struct ScriptedStore {
    results: Vec<RetrievedChunk>,
    fail: bool,
    queries: Mutex<Vec<(String, usize)>>,
}

impl ScriptedStore {
    pub fn with_chunks(results: Vec<RetrievedChunk>) -> Self {
        Self {
            results,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_chunks(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|(query, _)| query.clone())
            .collect()
    }

    pub fn top_ks(&self) -> Vec<usize> {
        self.queries.lock().unwrap().iter().map(|(_, k)| *k).collect()
    }
}

pub fn chunk(text: &str, file_name: &str, page: Option<&str>, score: f32) -> RetrievedChunk {
    let mut metadata = ChunkMetadata::new(file_name);
    metadata.page_label = page.map(str::to_string);
    RetrievedChunk {
        text: text.to_string(),
        score,
        metadata,
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, StoreError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), top_k));
        if self.fail {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        if self.fail {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.results.len())
    }
}
