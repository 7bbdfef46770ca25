//! Service configuration and the durable training-data file.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{ Deserialize, Serialize };
use serde_json::Value;
use log::{ info, warn };

use crate::index::IndexBackend;

/// Default model identifier submitted to the completion endpoint.
pub const DEFAULT_MODEL: &str = "microsoft/phi-3-medium-128k-instruct";
/// Default OpenRouter-compatible API base.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default path of the training-data file.
pub const DEFAULT_DATA_FILE: &str = "data.json";
/// Default path of the durable examples file.
pub const DEFAULT_EXAMPLES_FILE: &str = "examples.json";

/// Runtime configuration for a [`crate::QueryService`] instance.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// API key for the model endpoint.
    pub api_key: String,
    /// Model identifier (e.g. "microsoft/phi-3-medium-128k-instruct").
    pub model: String,
    /// Base URL of the chat-completion API.
    pub base_url: String,
    /// Optional attribution URL, sent as the HTTP-Referer header.
    pub site_url: Option<String>,
    /// Optional attribution name, sent as the X-Title header.
    pub site_name: Option<String>,
    /// Path of the training-data file read once at initialization.
    pub data_file: String,
    /// Path of the durable examples file.
    pub examples_file: String,
    /// Similarity-index backend to create.
    pub index: IndexBackend,
}

impl ServiceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: None,
            site_name: None,
            data_file: DEFAULT_DATA_FILE.to_string(),
            examples_file: DEFAULT_EXAMPLES_FILE.to_string(),
            index: IndexBackend::Memory,
        }
    }
}

/// The training-data file: a default schema plus seed examples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingData {
    #[serde(default = "empty_object")]
    pub schema: Value,
    #[serde(default)]
    pub examples: BTreeMap<String, Value>,
}

impl Default for TrainingData {
    fn default() -> Self {
        Self {
            schema: empty_object(),
            examples: BTreeMap::new(),
        }
    }
}

impl TrainingData {
    /// Read the training-data file at `path`. Never fails: a missing or
    /// malformed file is logged and yields an empty schema and no examples.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) =>
                match serde_json::from_str::<TrainingData>(&text) {
                    Ok(data) => {
                        info!("Loaded training data from {}", path.display());
                        data
                    }
                    Err(e) => {
                        warn!(
                            "Invalid JSON in {}: {}. Starting with empty schema and examples",
                            path.display(),
                            e
                        );
                        TrainingData::default()
                    }
                }
            Err(_) => {
                info!(
                    "{} not found, starting with empty schema and examples",
                    path.display()
                );
                TrainingData::default()
            }
        }
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_yields_empty_schema() {
        let dir = TempDir::new().unwrap();
        let data = TrainingData::load(dir.path().join("data.json"));
        assert_eq!(data.schema, json!({}));
        assert!(data.examples.is_empty());
    }

    #[test]
    fn test_load_malformed_file_yields_empty_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "]]").unwrap();

        let data = TrainingData::load(&path);
        assert_eq!(data.schema, json!({}));
        assert!(data.examples.is_empty());
    }

    #[test]
    fn test_load_reads_schema_and_examples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{"schema": {"objectName": "Account"}, "examples": {"q": {"a": 1}}}"#,
        )
        .unwrap();

        let data = TrainingData::load(&path);
        assert_eq!(data.schema, json!({"objectName": "Account"}));
        assert_eq!(data.examples.get("q"), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_missing_keys_default_independently() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"schema": {"objectName": "Account"}}"#).unwrap();

        let data = TrainingData::load(&path);
        assert_eq!(data.schema, json!({"objectName": "Account"}));
        assert!(data.examples.is_empty());
    }
}
