use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::error::Error;
use std::sync::RwLock;
use log::debug;

use crate::embed::{ cosine_similarity, embed_text, EMBEDDING_DIM };
use super::{
    example_doc_id,
    DocumentKind,
    RetrievedExample,
    SimilarityIndex,
    StoredDocument,
    DOCUMENTATION_DOC_ID,
    SCHEMA_DOC_ID,
};

struct MemoryDocument {
    content: String,
    kind: DocumentKind,
    question: Option<String>,
    vector: Vec<f32>,
}

/// Default in-memory similarity backend.
///
/// Starts empty on every process start and is populated by training; nothing
/// is persisted. Example documents are ranked by the similarity of their
/// stored question to the asked question.
pub struct MemoryIndex {
    documents: RwLock<HashMap<String, MemoryDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    fn put(&self, id: String, content: String, kind: DocumentKind, question: Option<String>) {
        // Example documents embed their question; singleton documents embed
        // their content.
        let seed = question.as_deref().unwrap_or(&content);
        let vector = embed_text(seed, EMBEDDING_DIM);
        self.documents.write().unwrap().insert(id, MemoryDocument {
            content,
            kind,
            question,
            vector,
        });
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityIndex for MemoryIndex {
    async fn index_schema(
        &self,
        schema: &Value
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let content = serde_json::to_string(schema)?;
        self.put(SCHEMA_DOC_ID.to_string(), content, DocumentKind::Schema, None);
        debug!("Indexed schema document");
        Ok(())
    }

    async fn index_documentation(
        &self,
        text: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.put(
            DOCUMENTATION_DOC_ID.to_string(),
            text.to_string(),
            DocumentKind::Documentation,
            None
        );
        debug!("Indexed documentation document");
        Ok(())
    }

    async fn index_example(
        &self,
        question: &str,
        query: &Value
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let content = serde_json::to_string(query)?;
        self.put(
            example_doc_id(question),
            content,
            DocumentKind::Example,
            Some(question.to_string())
        );
        debug!("Indexed example document: {}", question);
        Ok(())
    }

    async fn query_examples(
        &self,
        question: &str,
        limit: usize
    ) -> Result<Vec<RetrievedExample>, Box<dyn Error + Send + Sync>> {
        let query_vec = embed_text(question, EMBEDDING_DIM);
        let documents = self.documents.read().unwrap();

        let mut scored: Vec<RetrievedExample> = documents
            .values()
            .filter(|doc| doc.kind == DocumentKind::Example)
            .map(|doc| RetrievedExample {
                question: doc.question.clone().unwrap_or_default(),
                query_json: doc.content.clone(),
                score: cosine_similarity(&query_vec, &doc.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        debug!(
            "Memory index returned {} example(s) for query '{}'",
            scored.len(),
            question
        );
        Ok(scored)
    }

    async fn dump(&self) -> Result<Vec<StoredDocument>, Box<dyn Error + Send + Sync>> {
        let documents = self.documents.read().unwrap();
        let mut dumped: Vec<StoredDocument> = documents
            .iter()
            .map(|(id, doc)| StoredDocument {
                id: id.clone(),
                content: doc.content.clone(),
                kind: doc.kind,
                question: doc.question.clone(),
            })
            .collect();
        dumped.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(dumped)
    }
}
