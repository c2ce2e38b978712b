use std::sync::Arc;
use std::time::Duration;

use crate::agentic::{AgenticConfig, AgenticRagService};
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::llm::{Embedder, LlamaServerClient, LlmProvider};
use crate::rag::{DocumentStore, SqliteDocumentStore};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Contains references to:
/// - Paths and the loaded configuration
/// - The completion model client
/// - The course material store
/// - The agentic RAG service driving each query
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub agentic: Arc<AgenticRagService>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Resolving paths and loading `config.yml`
    /// 2. Creating the llama.cpp server clients for completion and embedding
    /// 3. Opening the SQLite course material store
    /// 4. Building the agentic workflow graph
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        Self::initialize_with(Arc::new(AppPaths::new())).await
    }

    /// Same as [`AppState::initialize`] with paths resolved by the caller, so
    /// logging can be installed before any startup warnings fire.
    pub async fn initialize_with(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_app_config()
            .map_err(InitializationError::Config)?;

        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let llm = Arc::new(
            LlamaServerClient::new(&config.llm.base_url, &config.llm.model, timeout)
                .map_err(InitializationError::Llm)?,
        );
        let embedder: Arc<dyn Embedder> = Arc::new(
            LlamaServerClient::new(
                config.embedding_base_url(),
                &config.embedding.model,
                timeout,
            )
            .map_err(InitializationError::Llm)?,
        );

        let store_path = paths.store_path(&config.retrieval.store_file);
        tracing::info!("Opening course material store at {}", store_path.display());
        let store = Arc::new(
            SqliteDocumentStore::with_path(
                &store_path,
                embedder,
                config.retrieval.similarity_threshold,
            )
            .await
            .map_err(InitializationError::Store)?,
        );

        Self::from_parts(paths, config, llm, store)
    }

    /// Assembles state from already constructed collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: AppConfig,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Arc<Self>, InitializationError> {
        let agentic = AgenticRagService::new(
            store.clone(),
            llm.clone(),
            AgenticConfig::from(&config),
        )
        .map_err(InitializationError::Graph)?;

        Ok(Arc::new(Self {
            paths,
            config: Arc::new(config),
            llm,
            store,
            agentic: Arc::new(agentic),
        }))
    }
}
