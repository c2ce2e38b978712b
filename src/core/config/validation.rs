use serde_json::{Map, Value};

use crate::agentic::MAX_REWRITES_LIMIT;
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_url_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 32_768)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        if !matches!(embedding.get("base_url"), None | Some(Value::Null)) {
            validate_url_field(embedding, "embedding.base_url", "base_url")?;
        }
        validate_optional_string_field(embedding, "embedding.model", "model")?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 50)?;
        validate_f64_field(
            retrieval,
            "retrieval.similarity_threshold",
            "similarity_threshold",
            0.0,
            1.0,
        )?;
        if retrieval.contains_key("store_file") {
            validate_required_string_field(retrieval, "retrieval.store_file", "store_file")?;
        }
    }

    if let Some(agentic) = expect_optional_object(root, "agentic")? {
        validate_u64_field(
            agentic,
            "agentic.max_rewrites",
            "max_rewrites",
            0,
            u64::from(MAX_REWRITES_LIMIT),
        )?;
        validate_bool_field(agentic, "agentic.relevance_fail_open", "relevance_fail_open")?;
        validate_u64_field(
            agentic,
            "agentic.grading_excerpt_chars",
            "grading_excerpt_chars",
            50,
            10_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_url_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !(text.starts_with("http://") || text.starts_with("https://")) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected http(s) URL",
            path
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn out_of_range<T: std::fmt::Display>(path: &str, min: T, max: T) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_message(config: Value) -> String {
        match validate_config(&config) {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&json!({})).is_ok());
    }

    #[test]
    fn rejects_rewrite_budget_above_limit() {
        let msg = error_message(json!({ "agentic": { "max_rewrites": 11 } }));
        assert!(msg.contains("agentic.max_rewrites"));
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        let msg = error_message(json!({ "retrieval": { "similarity_threshold": 1.5 } }));
        assert!(msg.contains("retrieval.similarity_threshold"));
    }

    #[test]
    fn rejects_wrong_types() {
        let msg = error_message(json!({ "agentic": { "relevance_fail_open": "yes" } }));
        assert!(msg.contains("expected boolean"));

        let msg = error_message(json!({ "llm": "http://localhost:8080" }));
        assert!(msg.contains("'llm': expected object"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let msg = error_message(json!({ "llm": { "base_url": "localhost:8080" } }));
        assert!(msg.contains("expected http(s) URL"));
    }

    #[test]
    fn null_embedding_url_is_allowed() {
        assert!(validate_config(&json!({ "embedding": { "base_url": null } })).is_ok());
    }
}
