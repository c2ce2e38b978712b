use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("MENTOR_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Raw config tree: file contents with environment overrides merged on top.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let file_config = load_yaml_file(&self.config_path())?;
        let overrides = env_overrides(
            env::var("MENTOR_LLM_BASE_URL").ok(),
            env::var("PORT").ok(),
        );
        Ok(deep_merge(&file_config, &overrides))
    }

    pub fn load_app_config(&self) -> Result<AppConfig, ApiError> {
        let raw = self.load_config()?;
        parse_app_config(&raw)
    }
}

pub fn parse_app_config(raw: &Value) -> Result<AppConfig, ApiError> {
    validate_config(raw)?;
    serde_json::from_value::<AppConfig>(raw.clone())
        .map_err(|err| ApiError::BadRequest(format!("Invalid config: {}", err)))
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        tracing::info!("No config file at {}, using defaults", path.display());
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(ApiError::internal)?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|err| {
        ApiError::BadRequest(format!("Invalid YAML in {}: {}", path.display(), err))
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid config at 'root': expected object in {}",
            path.display()
        ))),
    }
}

fn env_overrides(llm_base_url: Option<String>, port: Option<String>) -> Value {
    let mut root = Map::new();

    if let Some(url) = llm_base_url.filter(|url| !url.trim().is_empty()) {
        let mut llm = Map::new();
        llm.insert("base_url".to_string(), Value::String(url));
        root.insert("llm".to_string(), Value::Object(llm));
    }

    if let Some(port) = port.and_then(|val| val.parse::<u16>().ok()) {
        let mut server = Map::new();
        server.insert("port".to_string(), Value::from(port));
        root.insert("server".to_string(), Value::Object(server));
    }

    Value::Object(root)
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}
