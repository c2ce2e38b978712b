//! SQLite-backed document store.
//!
//! Chunks live in one table with their embeddings as little-endian f32
//! blobs; search is brute-force cosine over every row.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkMetadata, DocumentStore, RetrievedChunk, StoreError, StoredChunk};
use super::vector_math::rank_by_cosine;
use crate::llm::Embedder;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    similarity_threshold: f32,
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    pub async fn with_path(
        db_path: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        similarity_threshold: f32,
    ) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            embedder,
            similarity_threshold: similarity_threshold.clamp(0.0, 1.0),
            db_path,
        };
        store.init_schema().await?;
        store.check_embedding_model().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS course_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                file_name TEXT NOT NULL DEFAULT '',
                page_label TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records the embedding model on first use; warns if the store was built with another one.
    async fn check_embedding_model(&self) -> Result<(), StoreError> {
        let configured = self.embedder.model();
        let recorded: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await?;

        match recorded {
            Some(model) if model != configured => {
                tracing::warn!(
                    "Store {} was embedded with '{}' but '{}' is configured; scores may be meaningless",
                    self.db_path.display(),
                    model,
                    configured
                );
            }
            Some(_) => {}
            None => {
                sqlx::query(
                    "INSERT OR REPLACE INTO store_meta (key, value, updated_at)
                     VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                )
                .bind(configured)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn embedding_model(&self) -> Result<Option<String>, StoreError> {
        let model =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(model)
    }

    /// Writes pre-embedded chunks in one transaction. Existing ids are replaced.
    pub async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (chunk, embedding) in &items {
            if embedding.is_empty() {
                return Err(StoreError::EmptyVector);
            }
            let blob = serialize_embedding(embedding);
            let extra = serde_json::to_string(&chunk.metadata.extra)?;

            sqlx::query(
                "INSERT OR REPLACE INTO course_chunks (chunk_id, content, file_name, page_label, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.text)
            .bind(&chunk.metadata.file_name)
            .bind(&chunk.metadata.page_label)
            .bind(&extra)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Inserted {} chunks into {}", items.len(), self.db_path.display());
        Ok(())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, StoreError> {
        let mut vectors = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(StoreError::Embedding)?;
        vectors.pop().ok_or(StoreError::EmptyVector)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_query(query).await?;

        let rows = sqlx::query(
            "SELECT content, file_name, page_label, metadata, embedding FROM course_chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let embeddings: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| deserialize_embedding(&row.get::<Vec<u8>, _>("embedding")))
            .collect();
        let ranked = rank_by_cosine(&query_embedding, embeddings.iter().map(Vec::as_slice))?;

        let scored: Vec<RetrievedChunk> = ranked
            .into_iter()
            .map(|(idx, score)| (idx, score.clamp(0.0, 1.0)))
            .filter(|(_, score)| *score >= self.similarity_threshold)
            .take(top_k)
            .map(|(idx, score)| {
                let row = &rows[idx];
                RetrievedChunk {
                    text: row.get("content"),
                    score,
                    metadata: row_to_metadata(row),
                }
            })
            .collect();

        tracing::debug!(
            "Store search scored {} chunks, kept {} at threshold {}",
            rows.len(),
            scored.len(),
            self.similarity_threshold
        );
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn row_to_metadata(row: &sqlx::sqlite::SqliteRow) -> ChunkMetadata {
    let file_name: String = row.get("file_name");
    let extra_str: String = row.get("metadata");
    let extra = match serde_json::from_str(&extra_str) {
        Ok(extra) => extra,
        Err(err) => {
            tracing::warn!(
                "Ignoring unreadable metadata for a chunk of {}: {}",
                file_name,
                err
            );
            Default::default()
        }
    };

    ChunkMetadata {
        file_name,
        page_label: row.get("page_label"),
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::KeywordEmbedder;

    const KEYWORDS: [&str; 3] = ["recursion", "loop", "pointer"];

    /// The returned directory owns the database file; keep it alive for the test.
    async fn test_store(threshold: f32) -> (SqliteDocumentStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("store-{}.db", uuid::Uuid::new_v4()));
        let store =
            SqliteDocumentStore::with_path(path, Arc::new(KeywordEmbedder::new(&KEYWORDS)), threshold)
                .await
                .unwrap();
        (store, dir)
    }

    fn chunk(id: &str, text: &str, page: &str) -> (StoredChunk, Vec<f32>) {
        let embedding = KeywordEmbedder::new(&KEYWORDS).vector_for(text);
        (
            StoredChunk {
                chunk_id: id.to_string(),
                text: text.to_string(),
                metadata: ChunkMetadata::new("intro_to_cs.pdf").with_page(page),
            },
            embedding,
        )
    }

    #[test]
    fn embedding_blob_roundtrips() {
        let vec = vec![0.25, -1.5, 3.0];
        assert_eq!(deserialize_embedding(&serialize_embedding(&vec)), vec);
    }

    #[tokio::test]
    async fn search_ranks_and_truncates() {
        let (store, _dir) = test_store(0.0).await;
        store
            .insert_batch(vec![
                chunk("c1", "Recursion: a function that calls itself. Recursion needs a base case.", "12"),
                chunk("c2", "A loop repeats; recursion can replace a loop.", "13"),
                chunk("c3", "A pointer stores an address.", "40"),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search("What is recursion?", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].text.starts_with("Recursion:"));
        assert_eq!(results[0].metadata.page_label.as_deref(), Some("12"));
        assert!(results[0].score >= results[1].score);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[tokio::test]
    async fn threshold_filters_to_empty_result() {
        let (store, _dir) = test_store(0.5).await;
        store
            .insert_batch(vec![chunk("c3", "A pointer stores an address.", "40")])
            .await
            .unwrap();

        let results = store.search("How do loops work?", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let (store, _dir) = test_store(0.3).await;
        assert!(store.search("recursion", 3).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn records_embedding_model() {
        let (store, _dir) = test_store(0.3).await;
        assert_eq!(
            store.embedding_model().await.unwrap().as_deref(),
            Some("keyword-test")
        );
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let (store, _dir) = test_store(0.0).await;
        let (stored, _) = chunk("c1", "recursion", "1");
        store.insert_batch(vec![(stored, vec![1.0, 0.0])]).await.unwrap();

        let err = store.search("recursion", 3).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn unreadable_metadata_falls_back_to_empty_extra() {
        let (store, _dir) = test_store(0.0).await;
        store
            .insert_batch(vec![chunk("c1", "Recursion needs a base case.", "12")])
            .await
            .unwrap();
        sqlx::query("UPDATE course_chunks SET metadata = '{not json'")
            .execute(&store.pool)
            .await
            .unwrap();

        let results = store.search("recursion", 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.file_name, "intro_to_cs.pdf");
        assert_eq!(results[0].metadata.page_label.as_deref(), Some("12"));
        assert!(results[0].metadata.extra.is_empty());
    }

    #[tokio::test]
    async fn threshold_applies_to_the_ranked_list() {
        let (store, _dir) = test_store(0.6).await;
        store
            .insert_batch(vec![
                chunk("c1", "A pointer stores an address.", "40"),
                chunk("c2", "Recursion: a function that calls itself.", "12"),
                chunk("c3", "A loop repeats; recursion can replace a loop.", "13"),
            ])
            .await
            .unwrap();

        let results = store.search("recursion", 3).await.unwrap();

        let pages: Vec<_> = results
            .iter()
            .map(|r| r.metadata.page_label.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(pages, vec!["12"]);
    }
}
