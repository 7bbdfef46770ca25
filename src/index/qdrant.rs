use qdrant_client::{ Payload, Qdrant };
use qdrant_client::qdrant::{
    vectors_config::Config as VectorsConfigKind,
    value::Kind as QdrantValueKind,
    with_payload_selector::SelectorOptions as WithPayloadOptions,
    Condition,
    CreateCollection,
    Distance,
    Filter,
    PointId,
    PointStruct,
    ScrollPoints,
    SearchPoints,
    UpsertPoints,
    Value as QdrantValue,
    VectorParams,
    VectorsConfig,
    WithPayloadSelector,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use log::{ info, debug, warn };
use uuid::Uuid;

use crate::embed::{ embed_text, EMBEDDING_DIM };
use super::{
    example_doc_id,
    DocumentKind,
    RetrievedExample,
    SimilarityIndex,
    StoredDocument,
    DOCUMENTATION_DOC_ID,
    SCHEMA_DOC_ID,
};

/// Similarity backend against a Qdrant server.
///
/// Point ids are UUIDv5 digests of the document id, so re-indexing the same
/// document overwrites the same point across processes. The document id,
/// class tag, question attribute, and content all live in the payload.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    pub async fn new(
        url: &str,
        api_key: Option<&str>,
        collection: &str
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let mut client_builder = Qdrant::from_url(url);

        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            client_builder.set_api_key(key);
            info!("Configuring Qdrant client with API key.");
        } else if api_key.is_some() {
            warn!("Qdrant API key provided but is empty.");
        }

        let client = client_builder.build()?;
        info!("Qdrant client connected to {}", url);

        let index = Self {
            client,
            collection: collection.to_string(),
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.client.collection_exists(self.collection.as_str()).await? {
            debug!("Qdrant collection '{}' already exists", self.collection);
            return Ok(());
        }

        let request = CreateCollection {
            collection_name: self.collection.clone(),
            vectors_config: Some(VectorsConfig {
                config: Some(
                    VectorsConfigKind::Params(VectorParams {
                        size: EMBEDDING_DIM as u64,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })
                ),
            }),
            ..Default::default()
        };
        self.client
            .create_collection(request).await
            .map_err(|e| format!("Failed to create Qdrant collection '{}': {}", self.collection, e))?;
        info!("Created Qdrant collection '{}' ({} dims)", self.collection, EMBEDDING_DIM);
        Ok(())
    }

    fn point_uuid(doc_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, doc_id.as_bytes()).to_string()
    }

    fn point_id_to_string(point_id: Option<PointId>) -> String {
        match point_id {
            Some(id) =>
                match id.point_id_options {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid,
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) =>
                        num.to_string(),
                    _ => "unknown_id_format".to_string(),
                }
            None => "missing_id".to_string(),
        }
    }

    async fn put(
        &self,
        doc_id: &str,
        content: String,
        kind: DocumentKind,
        question: Option<&str>
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let seed = question.unwrap_or(&content);
        let vector = embed_text(seed, EMBEDDING_DIM);

        let payload = Payload::try_from(
            serde_json::json!({
                "doc_id": doc_id,
                "kind": kind.as_str(),
                "question": question,
                "content": content,
            })
        ).map_err(|e| format!("Qdrant payload conversion failed for '{}': {}", doc_id, e))?;

        let request = UpsertPoints {
            collection_name: self.collection.clone(),
            points: vec![PointStruct::new(Self::point_uuid(doc_id), vector, payload)],
            wait: Some(true),
            ..Default::default()
        };
        self.client
            .upsert_points(request).await
            .map_err(|e| format!("Qdrant upsert failed for '{}': {}", doc_id, e))?;
        debug!("Upserted Qdrant document '{}'", doc_id);
        Ok(())
    }
}

#[async_trait]
impl SimilarityIndex for QdrantIndex {
    async fn index_schema(
        &self,
        schema: &Value
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let content = serde_json::to_string(schema)?;
        self.put(SCHEMA_DOC_ID, content, DocumentKind::Schema, None).await
    }

    async fn index_documentation(
        &self,
        text: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.put(
            DOCUMENTATION_DOC_ID,
            text.to_string(),
            DocumentKind::Documentation,
            None
        ).await
    }

    async fn index_example(
        &self,
        question: &str,
        query: &Value
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let content = serde_json::to_string(query)?;
        self.put(
            &example_doc_id(question),
            content,
            DocumentKind::Example,
            Some(question)
        ).await
    }

    async fn query_examples(
        &self,
        question: &str,
        limit: usize
    ) -> Result<Vec<RetrievedExample>, Box<dyn Error + Send + Sync>> {
        debug!(
            "Qdrant searching collection '{}' for {} example(s)",
            self.collection,
            limit
        );

        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: embed_text(question, EMBEDDING_DIM),
            limit: limit as u64,
            filter: Some(Filter {
                must: vec![
                    Condition::matches("kind", DocumentKind::Example.as_str().to_string())
                ],
                ..Default::default()
            }),
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(WithPayloadOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let response = self.client
            .search_points(request).await
            .map_err(|e| format!("Qdrant search failed in '{}': {}", self.collection, e))?;

        debug!(
            "Qdrant search returned {} result(s) in '{}'",
            response.result.len(),
            self.collection
        );

        let results = response.result
            .into_iter()
            .map(|point| RetrievedExample {
                question: payload_string(&point.payload, "question").unwrap_or_default(),
                query_json: payload_string(&point.payload, "content").unwrap_or_default(),
                score: point.score,
            })
            .collect();
        Ok(results)
    }

    async fn dump(&self) -> Result<Vec<StoredDocument>, Box<dyn Error + Send + Sync>> {
        let mut documents = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let request = ScrollPoints {
                collection_name: self.collection.clone(),
                limit: Some(256),
                offset: offset.clone(),
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(WithPayloadOptions::Enable(true)),
                }),
                ..Default::default()
            };

            let response = self.client
                .scroll(request).await
                .map_err(|e| format!("Qdrant scroll failed in '{}': {}", self.collection, e))?;

            for point in response.result {
                let kind = match
                    payload_string(&point.payload, "kind").and_then(|tag|
                        DocumentKind::parse(&tag)
                    )
                {
                    Some(kind) => kind,
                    None => {
                        warn!(
                            "Skipping Qdrant point {} with missing or unknown kind tag",
                            Self::point_id_to_string(point.id)
                        );
                        continue;
                    }
                };
                documents.push(StoredDocument {
                    id: payload_string(&point.payload, "doc_id")
                        .unwrap_or_else(|| Self::point_id_to_string(point.id)),
                    content: payload_string(&point.payload, "content").unwrap_or_default(),
                    kind,
                    question: payload_string(&point.payload, "question"),
                });
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }
}

fn payload_string(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|value| value.kind.clone()) {
        Some(QdrantValueKind::StringValue(s)) => Some(s),
        _ => None,
    }
}
