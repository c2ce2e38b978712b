use serde::{Deserialize, Serialize};

pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub retrieval: RetrievalSection,
    pub agentic: AgenticSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: "mistral-7b-instruct-v0.2.q5_k_m.gguf".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    /// Falls back to `llm.base_url` when unset.
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "all-MiniLM-L6-v2".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub store_file: String,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_threshold: 0.3,
            store_file: "course_materials.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgenticSection {
    pub max_rewrites: u32,
    pub relevance_fail_open: bool,
    pub grading_excerpt_chars: usize,
}

impl Default for AgenticSection {
    fn default() -> Self {
        Self {
            max_rewrites: 2,
            relevance_fail_open: true,
            grading_excerpt_chars: 300,
        }
    }
}

impl AppConfig {
    pub fn embedding_base_url(&self) -> &str {
        self.embedding
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.llm.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_sections_keep_defaults() {
        let config: AppConfig = serde_json::from_value(json!({
            "llm": { "temperature": 0.2 },
            "agentic": { "relevance_fail_open": false }
        }))
        .unwrap();

        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.max_tokens, 512);
        assert!(!config.agentic.relevance_fail_open);
        assert_eq!(config.agentic.max_rewrites, 2);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn embedding_url_falls_back_to_llm() {
        let mut config = AppConfig::default();
        assert_eq!(config.embedding_base_url(), DEFAULT_LLM_BASE_URL);

        config.embedding.base_url = Some("http://embedder:9000".to_string());
        assert_eq!(config.embedding_base_url(), "http://embedder:9000");
    }
}
