// Integration tests for the query service, using a canned language model.
use std::collections::BTreeMap;
use std::sync::{ Arc, Mutex };
use async_trait::async_trait;
use serde_json::{ json, Value };
use tempfile::TempDir;

use query_loom::{ ExampleStore, LanguageModel, QueryService, ServiceConfig };

/// Canned model: records every prompt it sees and replies with a fixed text.
struct CannedModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl CannedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, prompt: &str) -> query_loom::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

fn test_config(dir: &TempDir) -> ServiceConfig {
    let mut config = ServiceConfig::new("test-key");
    config.data_file = dir.path().join("data.json").to_string_lossy().into_owned();
    config.examples_file = dir.path().join("examples.json").to_string_lossy().into_owned();
    config
}

fn account_schema() -> Value {
    json!({
        "objectName": "Account",
        "fields": [
            {"logicalName": "Name", "type": "string"},
            {"logicalName": "Phone", "type": "phone"}
        ]
    })
}

#[tokio::test]
async fn test_train_then_reload_yields_exactly_the_trained_examples() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let model = CannedModel::new("{}");

    let mut examples = BTreeMap::new();
    examples.insert("Find accounts with name Test".to_string(), json!({"f": "Name"}));
    examples.insert("Find accounts with phone 4444".to_string(), json!({"f": "Phone"}));

    let mut service = QueryService::with_model(&config, model).await.unwrap();
    service
        .train(Some(account_schema()), None, Some(&examples))
        .await
        .unwrap();

    let reloaded = ExampleStore::load(&config.examples_file);
    assert_eq!(reloaded.examples(), &examples);

    // Re-training with identical data is idempotent.
    let model = CannedModel::new("{}");
    let mut service = QueryService::with_model(&config, model).await.unwrap();
    service
        .train(Some(account_schema()), None, Some(&examples))
        .await
        .unwrap();

    let reloaded = ExampleStore::load(&config.examples_file);
    assert_eq!(reloaded.examples(), &examples);
}

#[tokio::test]
async fn test_retraining_same_question_does_not_grow_the_store() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let mut examples = BTreeMap::new();
    examples.insert("q".to_string(), json!({"version": 1}));

    let model = CannedModel::new("{}");
    let mut service = QueryService::with_model(&config, model).await.unwrap();
    service.train(None, None, Some(&examples)).await.unwrap();
    assert_eq!(service.store().len(), 1);

    examples.insert("q".to_string(), json!({"version": 2}));
    service.train(None, None, Some(&examples)).await.unwrap();
    assert_eq!(service.store().len(), 1);
    assert_eq!(service.store().get("q"), Some(&json!({"version": 2})));
}

#[tokio::test]
async fn test_disjoint_trains_accumulate_the_union() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let mut first = BTreeMap::new();
    first.insert("first question".to_string(), json!({"a": 1}));
    let mut second = BTreeMap::new();
    second.insert("second question".to_string(), json!({"b": 2}));

    let model = CannedModel::new("{}");
    let mut service = QueryService::with_model(&config, model).await.unwrap();
    service.train(None, None, Some(&first)).await.unwrap();
    service.train(None, None, Some(&second)).await.unwrap();

    let reloaded = ExampleStore::load(&config.examples_file);
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.get("first question").is_some());
    assert!(reloaded.get("second question").is_some());
}

#[tokio::test]
async fn test_ask_retrieves_trained_example_into_the_prompt() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let target_query = json!({"filter": {"Name": "Test"}});
    let mut examples = BTreeMap::new();
    examples.insert("Find accounts with name Test".to_string(), target_query.clone());
    examples.insert(
        "List every open opportunity by stage".to_string(),
        json!({"filter": {"Stage": "Open"}})
    );

    let model = CannedModel::new("{\"generated\": true}");
    let mut service = QueryService::with_model(&config, model.clone()).await.unwrap();
    service
        .train(Some(account_schema()), None, Some(&examples))
        .await
        .unwrap();

    let raw = service.ask("Find accounts with name Test").await.unwrap();
    assert_eq!(raw, "{\"generated\": true}");

    let prompt = model.last_prompt();
    assert!(prompt.contains("1. Question: 'Find accounts with name Test'"));
    assert!(prompt.contains(&target_query.to_string()));
}

#[tokio::test]
async fn test_ask_with_empty_index_uses_the_notice() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let model = CannedModel::new("{}");
    let service = QueryService::with_model(&config, model.clone()).await.unwrap();

    service.ask("Find accounts with name Test").await.unwrap();
    assert!(model.last_prompt().contains("No training examples available."));
}

#[tokio::test]
async fn test_ask_returns_raw_model_output_unmodified() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    // Not valid JSON on purpose; the service must not touch it.
    let model = CannedModel::new("sorry, here is your query: {broken");
    let service = QueryService::with_model(&config, model).await.unwrap();

    let raw = service.ask("anything").await.unwrap();
    assert_eq!(raw, "sorry, here is your query: {broken");
}

#[tokio::test]
async fn test_trained_schema_wins_over_default() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    std::fs::write(
        &config.data_file,
        r#"{"schema": {"objectName": "Default"}, "examples": {}}"#,
    )
    .unwrap();

    let model = CannedModel::new("{}");
    let mut service = QueryService::with_model(&config, model.clone()).await.unwrap();
    assert_eq!(service.active_schema(), &json!({"objectName": "Default"}));

    service
        .train(Some(json!({"objectName": "Account"})), None, None)
        .await
        .unwrap();
    assert_eq!(service.active_schema(), &json!({"objectName": "Account"}));

    service.ask("anything").await.unwrap();
    assert!(model.last_prompt().contains("{\"objectName\":\"Account\"}"));
}

#[tokio::test]
async fn test_bare_train_indexes_the_default_schema_only() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    std::fs::write(
        &config.data_file,
        r#"{"schema": {"objectName": "Default"}, "examples": {"seed": {"a": 1}}}"#,
    )
    .unwrap();

    let model = CannedModel::new("{}");
    let mut service = QueryService::with_model(&config, model).await.unwrap();
    service.train(None, None, None).await.unwrap();

    let dumped = service.dump_index().await.unwrap();
    assert_eq!(dumped.len(), 1);
    assert_eq!(dumped[0].id, "schema");
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn test_documentation_never_leaks_into_retrieval() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let mut examples = BTreeMap::new();
    examples.insert("Find accounts with name Test".to_string(), json!({"a": 1}));

    let model = CannedModel::new("{}");
    let mut service = QueryService::with_model(&config, model.clone()).await.unwrap();
    service
        .train(
            Some(account_schema()),
            Some("Accounts are the customer records of the CRM."),
            Some(&examples)
        )
        .await
        .unwrap();

    service.ask("Find accounts with name Test").await.unwrap();
    let prompt = model.last_prompt();
    assert!(!prompt.contains("customer records of the CRM"));

    let dumped = service.dump_index().await.unwrap();
    assert_eq!(dumped.len(), 3);
}
