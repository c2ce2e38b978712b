use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::error::LlmError;
use super::provider::{Embedder, LlmProvider};
use super::types::CompletionRequest;

/// Client for a llama.cpp server speaking the OpenAI-compatible API.
#[derive(Clone)]
pub struct LlamaServerClient {
    base_url: String,
    model: String,
    client: Client,
}

impl LlamaServerClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Client)?;

        Ok(Self {
            base_url: normalize_base_url(base_url),
            model: model.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| LlmError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|err| LlmError::malformed(endpoint, err.to_string()))
    }
}

#[async_trait]
impl LlmProvider for LlamaServerClient {
    fn name(&self) -> &str {
        "llama_server"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let url = format!("{}/v1/models", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let body = completion_body(&self.model, &request);
        tracing::debug!(
            "Completion request: {} prompt chars, max_tokens={:?}",
            request.prompt.chars().count(),
            request.max_tokens
        );

        let payload = self.post_json("/v1/completions", &body).await?;
        parse_completion(&payload)
    }
}

#[async_trait]
impl Embedder for LlamaServerClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let payload = self.post_json("/v1/embeddings", &body).await?;
        let embeddings = parse_embeddings(&payload)?;
        if embeddings.len() != inputs.len() {
            return Err(LlmError::malformed(
                "/v1/embeddings",
                format!("expected {} vectors, got {}", inputs.len(), embeddings.len()),
            ));
        }
        Ok(embeddings)
    }
}

pub(crate) fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .to_string()
}

pub(crate) fn completion_body(model: &str, request: &CompletionRequest) -> Value {
    let mut body = json!({
        "model": model,
        "prompt": request.prompt,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
        if !request.stop.is_empty() {
            obj.insert("stop".to_string(), json!(request.stop));
        }
    }

    body
}

pub(crate) fn parse_completion(payload: &Value) -> Result<String, LlmError> {
    // llama.cpp's native endpoint answers with `content` instead of `choices`
    payload["choices"][0]["text"]
        .as_str()
        .or_else(|| payload["content"].as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::malformed("/v1/completions", "missing choices[0].text"))
}

pub(crate) fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, LlmError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| LlmError::malformed("/v1/embeddings", "missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let vals = item["embedding"]
            .as_array()
            .ok_or_else(|| LlmError::malformed("/v1/embeddings", "missing embedding"))?;
        let vec = vals
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    LlmError::malformed("/v1/embeddings", "non-numeric embedding value")
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;
        embeddings.push(vec);
    }

    Ok(embeddings)
}
