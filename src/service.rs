//! The query service: training and retrieval-augmented question answering.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde_json::Value;
use log::{ debug, info };

use crate::config::{ ServiceConfig, TrainingData };
use crate::error::{ Error, Result };
use crate::index::{ create_similarity_index, SimilarityIndex, StoredDocument };
use crate::llm::{ LanguageModel, OpenRouterClient };
use crate::prompt::compose;
use crate::store::ExampleStore;

/// Number of stored examples retrieved as context for each question.
pub const RETRIEVED_EXAMPLES: usize = 2;

/// Orchestrates the example store, similarity index, prompt composer, and
/// model client. One instance per session; no process-wide state.
pub struct QueryService {
    schema: Option<Value>,
    default_schema: Value,
    default_examples: BTreeMap<String, Value>,
    store: ExampleStore,
    index: Arc<dyn SimilarityIndex>,
    model: Arc<dyn LanguageModel>,
}

impl QueryService {
    /// Build a service from configuration: loads the training-data file and
    /// the durable example store, creates the index backend, and connects
    /// the configured model endpoint.
    pub async fn new(config: &ServiceConfig) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenRouterClient::new(config));
        Self::with_model(config, model).await
    }

    /// Same as [`QueryService::new`], with an explicit model implementation.
    pub async fn with_model(
        config: &ServiceConfig,
        model: Arc<dyn LanguageModel>
    ) -> Result<Self> {
        let training = TrainingData::load(&config.data_file);
        let store = ExampleStore::load(&config.examples_file);
        let index = create_similarity_index(&config.index).await.map_err(|e|
            Error::Index(e.to_string())
        )?;

        Ok(Self {
            schema: None,
            default_schema: training.schema,
            default_examples: training.examples,
            store,
            index,
            model,
        })
    }

    /// Train the service with an optional schema, documentation text, and
    /// example pairs.
    ///
    /// A provided schema becomes the active schema; without one, the first
    /// call falls back to the training-data default. The active schema is
    /// re-indexed on every call. Each example pair is indexed and written
    /// through to the durable store before this returns. Calling with no
    /// arguments re-indexes the current or default schema only.
    pub async fn train(
        &mut self,
        schema: Option<Value>,
        documentation: Option<&str>,
        examples: Option<&BTreeMap<String, Value>>
    ) -> Result<()> {
        if let Some(schema) = schema {
            self.schema = Some(schema);
        }
        let active = self.schema.get_or_insert_with(|| self.default_schema.clone());
        self.index
            .index_schema(active).await
            .map_err(|e| Error::Index(e.to_string()))?;
        info!("Indexed active schema");

        if let Some(text) = documentation {
            self.index
                .index_documentation(text).await
                .map_err(|e| Error::Index(e.to_string()))?;
            info!("Indexed documentation");
        }

        if let Some(examples) = examples {
            for (question, query) in examples {
                self.index
                    .index_example(question, query).await
                    .map_err(|e| Error::Index(e.to_string()))?;
                self.store.upsert(question, query)?;
                debug!("Trained example: {}", question);
            }
            info!(
                "Trained {} example(s), {} now stored durably",
                examples.len(),
                self.store.len()
            );
        }
        Ok(())
    }

    /// Generate a JSON query for `question`.
    ///
    /// Retrieves up to [`RETRIEVED_EXAMPLES`] similar examples, composes the
    /// prompt, and submits it to the model. The model's raw text comes back
    /// unmodified; callers own any JSON interpretation. External-call
    /// failures propagate uninterpreted, with no retry.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let retrieved = self.index
            .query_examples(question, RETRIEVED_EXAMPLES).await
            .map_err(|e| Error::Index(e.to_string()))?;
        debug!("Retrieved {} context example(s) for '{}'", retrieved.len(), question);

        let prompt = compose(self.active_schema(), &retrieved, question);
        let raw = self.model.complete(&prompt).await?;
        debug!("Raw model output for '{}': {}", question, raw);
        Ok(raw)
    }

    /// Every document currently in the similarity index, for inspection.
    pub async fn dump_index(&self) -> Result<Vec<StoredDocument>> {
        self.index.dump().await.map_err(|e| Error::Index(e.to_string()))
    }

    /// The schema the next prompt would carry: the most recently trained
    /// schema, or the configured default if none was trained.
    pub fn active_schema(&self) -> &Value {
        self.schema.as_ref().unwrap_or(&self.default_schema)
    }

    /// Seed examples from the training-data file.
    pub fn default_examples(&self) -> &BTreeMap<String, Value> {
        &self.default_examples
    }

    /// The durable example store.
    pub fn store(&self) -> &ExampleStore {
        &self.store
    }
}
