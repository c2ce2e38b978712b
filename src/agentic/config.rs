use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::events::WorkflowEvent;
use crate::core::config::AppConfig;

/// Largest rewrite budget a single query may ask for.
pub const MAX_REWRITES_LIMIT: u32 = 10;

/// Immutable settings for the agentic loop, fixed at service construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AgenticConfig {
    pub max_rewrites: u32,
    pub top_k: usize,
    pub relevance_fail_open: bool,
    pub grading_excerpt_chars: usize,
    pub generation_temperature: f32,
    pub generation_max_tokens: u32,
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            max_rewrites: 2,
            top_k: 3,
            relevance_fail_open: true,
            grading_excerpt_chars: 300,
            generation_temperature: 0.7,
            generation_max_tokens: 512,
        }
    }
}

impl From<&AppConfig> for AgenticConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_rewrites: config.agentic.max_rewrites.min(MAX_REWRITES_LIMIT),
            top_k: config.retrieval.top_k,
            relevance_fail_open: config.agentic.relevance_fail_open,
            grading_excerpt_chars: config.agentic.grading_excerpt_chars,
            generation_temperature: config.llm.temperature,
            generation_max_tokens: config.llm.max_tokens,
        }
    }
}

/// Per-call options for `AgenticRagService::run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_rewrites: Option<u32>,
    pub cancellation: Option<CancellationToken>,
    pub events: Option<UnboundedSender<WorkflowEvent>>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_rewrites(mut self, max_rewrites: u32) -> Self {
        self.max_rewrites = Some(max_rewrites);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn events(mut self, sender: UnboundedSender<WorkflowEvent>) -> Self {
        self.events = Some(sender);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_from_app_config() {
        let mut app = AppConfig::default();
        app.retrieval.top_k = 5;
        app.agentic.relevance_fail_open = false;
        app.llm.max_tokens = 256;

        let config = AgenticConfig::from(&app);

        assert_eq!(config.top_k, 5);
        assert!(!config.relevance_fail_open);
        assert_eq!(config.generation_max_tokens, 256);
        assert_eq!(config.max_rewrites, 2);
    }
}
