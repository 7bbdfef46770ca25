pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;
use log::info;

/// Fixed id of the singleton schema document.
pub const SCHEMA_DOC_ID: &str = "schema";
/// Fixed id of the singleton documentation document.
pub const DOCUMENTATION_DOC_ID: &str = "documentation";
/// Prefix of per-example document ids.
pub const EXAMPLE_ID_PREFIX: &str = "example:";

/// Derive the document id for an example from its question.
pub fn example_doc_id(question: &str) -> String {
    format!("{}{}", EXAMPLE_ID_PREFIX, question)
}

/// Class tag carried by every indexed document. Queries filter on this tag
/// exactly; there is no cross-class leakage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Schema,
    Documentation,
    Example,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Schema => "schema",
            DocumentKind::Documentation => "documentation",
            DocumentKind::Example => "example",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "schema" => Some(DocumentKind::Schema),
            "documentation" => Some(DocumentKind::Documentation),
            "example" => Some(DocumentKind::Example),
            _ => None,
        }
    }
}

/// A document as stored in the index, returned by [`SimilarityIndex::dump`].
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub kind: DocumentKind,
    pub question: Option<String>,
}

/// An example retrieved by similarity to a question, ordered by decreasing
/// similarity.
#[derive(Debug, Clone)]
pub struct RetrievedExample {
    /// The stored question attribute.
    pub question: String,
    /// The serialized target query.
    pub query_json: String,
    /// Backend-specific similarity score; higher is closer.
    pub score: f32,
}

#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Replace the singleton schema document with the serialized `schema`.
    async fn index_schema(
        &self,
        schema: &Value
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Replace the singleton documentation document with `text`.
    async fn index_documentation(
        &self,
        text: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Insert or overwrite the example document for `question`. The document
    /// content is the serialized `query`; the question is kept as a side
    /// attribute for retrieval.
    async fn index_example(
        &self,
        question: &str,
        query: &Value
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Up to `limit` example documents ranked by similarity to `question`.
    /// An index with no example documents yields an empty result.
    async fn query_examples(
        &self,
        question: &str,
        limit: usize
    ) -> Result<Vec<RetrievedExample>, Box<dyn Error + Send + Sync>>;

    /// Every stored document with its id, content, and tags, for inspection.
    async fn dump(&self) -> Result<Vec<StoredDocument>, Box<dyn Error + Send + Sync>>;
}

/// Similarity-index backend selection.
#[derive(Clone, Debug)]
pub enum IndexBackend {
    /// Process-local index; starts empty on every process start.
    Memory,
    /// A Qdrant server reached over gRPC.
    Qdrant {
        url: String,
        api_key: Option<String>,
        collection: String,
    },
}

pub async fn create_similarity_index(
    backend: &IndexBackend
) -> Result<Arc<dyn SimilarityIndex>, Box<dyn Error + Send + Sync>> {
    info!("Creating similarity index backend: {:?}", backend);
    match backend {
        IndexBackend::Memory => Ok(Arc::new(memory::MemoryIndex::new())),
        IndexBackend::Qdrant { url, api_key, collection } => {
            let index = qdrant::QdrantIndex::new(
                url,
                api_key.as_deref(),
                collection
            ).await?;
            Ok(Arc::new(index))
        }
    }
}
