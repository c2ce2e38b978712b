pub mod error;
pub mod llama_server;
#[cfg(test)]
pub mod mock;
pub mod provider;
pub mod types;


pub use error::LlmError;
pub use llama_server::LlamaServerClient;
pub use provider::{Embedder, LlmProvider};
pub use types::CompletionRequest;
