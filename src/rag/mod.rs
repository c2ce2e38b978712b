//! Retrieval side of the mentor: the `DocumentStore` boundary and its
//! SQLite implementation.

#[cfg(test)]
pub mod mock;
pub mod sqlite;
pub mod store;
pub mod vector_math;

pub use sqlite::SqliteDocumentStore;
pub use store::{ChunkMetadata, DocumentStore, RetrievedChunk, StoreError, StoredChunk};
