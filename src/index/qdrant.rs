//! Qdrant-backed reference index
//!
//! Talks to a Qdrant instance over its HTTP API. Queries are embedded
//! locally before search; stored points use deterministic v5 UUIDs derived
//! from the question/answer content so re-indexing the same material cannot
//! create duplicates.

use crate::config::QdrantConfig;
use crate::embeddings::EmbeddingService;
use crate::error::{EvaluationError, Result};
use crate::index::{ReferenceDocument, ReferenceHit, VectorIndex};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Qdrant HTTP client for the reference collection
pub struct QdrantIndex {
    client: Client,
    config: QdrantConfig,
    embedder: Arc<dyn EmbeddingService>,
}

/// Search request body for Qdrant's points/search endpoint
#[derive(Debug, Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
}

/// Search response from Qdrant
#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PointPayload {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
}

impl QdrantIndex {
    /// Create a new index client
    pub fn new(config: QdrantConfig, embedder: Arc<dyn EmbeddingService>) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EvaluationError::Retrieval(e.to_string()))?;

        Ok(Self {
            client,
            config,
            embedder,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.collection,
            suffix
        )
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    /// Deterministic point ID from pair content, stable across re-indexing
    fn point_id(document: &ReferenceDocument) -> Uuid {
        let content = format!("{}|{}", document.question.trim(), document.answer.trim());
        Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(&self, text: &str, top_k: usize) -> Result<Vec<ReferenceHit>> {
        debug!("Searching reference index: top_k={}", top_k);

        let vector = self.embedder.embed(text).await?;

        let request = SearchRequest {
            vector,
            limit: top_k,
            with_payload: true,
        };

        let response = self
            .apply_auth(self.client.post(self.collection_url("points/search")))
            .json(&request)
            .send()
            .await
            .map_err(|e| EvaluationError::Retrieval(format!("Search request failed: {}", e)))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let search_response: SearchResponse = response
                    .json()
                    .await
                    .map_err(|e| EvaluationError::Retrieval(format!("Bad search response: {}", e)))?;

                let hits: Vec<ReferenceHit> = search_response
                    .result
                    .into_iter()
                    .filter_map(|point| {
                        let payload = point.payload?;
                        if payload.question.is_empty() {
                            return None;
                        }
                        Some(ReferenceHit {
                            question: payload.question,
                            answer: payload.answer,
                            similarity: point.score.clamp(0.0, 1.0),
                        })
                    })
                    .collect();

                debug!("Found {} reference candidates", hits.len());
                Ok(hits)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EvaluationError::Retrieval(
                "Invalid or missing Qdrant API key".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(EvaluationError::Retrieval(format!(
                "Collection '{}' does not exist",
                self.config.collection
            ))),
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                Err(EvaluationError::Retrieval(format!(
                    "Search failed with status {}: {}",
                    status, error_text
                )))
            }
        }
    }

    async fn upsert(&self, documents: &[ReferenceDocument]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let questions: Vec<&str> = documents.iter().map(|d| d.question.as_str()).collect();
        let vectors = self.embedder.embed_batch(&questions).await?;

        let points: Vec<serde_json::Value> = documents
            .iter()
            .zip(vectors)
            .map(|(document, vector)| {
                json!({
                    "id": Self::point_id(document).to_string(),
                    "vector": vector,
                    "payload": {
                        "question": document.question.trim(),
                        "answer": document.answer.trim(),
                    },
                })
            })
            .collect();

        let stored = points.len();

        let response = self
            .apply_auth(self.client.put(self.collection_url("points")))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|e| EvaluationError::Retrieval(format!("Upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Upsert failed with status {}", status);
            return Err(EvaluationError::Retrieval(format!(
                "Upsert failed with status {}: {}",
                status, error_text
            )));
        }

        debug!("Upserted {} reference points", stored);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_deterministic() {
        let doc = ReferenceDocument {
            question: "What is ownership in Rust?".to_string(),
            answer: "A set of compile-time rules governing memory".to_string(),
        };
        assert_eq!(QdrantIndex::point_id(&doc), QdrantIndex::point_id(&doc));
    }

    #[test]
    fn test_point_id_ignores_surrounding_whitespace() {
        let doc_a = ReferenceDocument {
            question: "What is a closure?".to_string(),
            answer: "An anonymous function capturing its environment".to_string(),
        };
        let doc_b = ReferenceDocument {
            question: "  What is a closure?  ".to_string(),
            answer: "An anonymous function capturing its environment\n".to_string(),
        };
        assert_eq!(QdrantIndex::point_id(&doc_a), QdrantIndex::point_id(&doc_b));
    }

    #[test]
    fn test_point_id_differs_per_content() {
        let doc_a = ReferenceDocument {
            question: "What is a trait?".to_string(),
            answer: "A shared interface".to_string(),
        };
        let doc_b = ReferenceDocument {
            question: "What is a trait?".to_string(),
            answer: "A collection of methods".to_string(),
        };
        assert_ne!(QdrantIndex::point_id(&doc_a), QdrantIndex::point_id(&doc_b));
    }
}
