use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },
}

impl LlmError {
    pub fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        LlmError::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }
}
