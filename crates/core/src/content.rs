//! Semantic search over course content: query embeddings and the pgvector store.

use crate::error::BackendError;
use async_trait::async_trait;
use gemini_realtime::Content;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::debug;

/// Upper bound on the passages returned for one search.
pub const MAX_CONTENT_RESULTS: usize = 5;

pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A stored passage and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub content: String,
    pub similarity: f64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Passages whose similarity to `embedding` is strictly above `threshold`.
    async fn query_content(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ContentMatch>, BackendError>;
}

/// Keeps matches strictly above `threshold`, most similar first, at most `limit`.
///
/// Ties keep their original order.
pub fn rank_matches(
    matches: Vec<ContentMatch>,
    threshold: f64,
    limit: usize,
) -> Vec<ContentMatch> {
    let mut ranked: Vec<ContentMatch> = matches
        .into_iter()
        .filter(|m| m.similarity > threshold)
        .collect();
    ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    ranked.truncate(limit);
    ranked
}

// --- Gemini embeddings ---

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// `Embedder` backed by the Gemini `embedContent` REST method.
pub struct GeminiEmbedder {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            model,
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let url = format!("{}/{}:embedContent", self.endpoint, self.model);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&EmbedContentRequest {
                model: &self.model,
                content: Content::text(text),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: EmbedContentResponse = serde_json::from_slice(&body)?;
        if parsed.embedding.values.is_empty() {
            return Err(BackendError::EmptyEmbedding);
        }
        debug!(model = %self.model, dimensions = parsed.embedding.values.len(), "Embedded query.");
        Ok(parsed.embedding.values)
    }
}

// --- pgvector ---

const QUERY_CONTENT_SQL: &str = r#"
SELECT content, 1 - (embedding <=> $1::vector) AS similarity
FROM course_content_embeddings
WHERE 1 - (embedding <=> $1::vector) > $2
ORDER BY similarity DESC
LIMIT $3
"#;

/// `VectorStore` over the `course_content_embeddings` table.
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds a pool that connects on first use, so startup does not need the database.
    pub fn connect_lazy(database_url: &str) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;
        Ok(Self::new(pool))
    }
}

/// Renders an embedding in pgvector's text input format, e.g. `[0.1,0.2]`.
pub fn vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(f32::to_string).collect();
    format!("[{}]", values.join(","))
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn query_content(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ContentMatch>, BackendError> {
        let rows: Vec<(String, f64)> = sqlx::query_as(QUERY_CONTENT_SQL)
            .bind(vector_literal(embedding))
            .bind(threshold)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(content, similarity)| ContentMatch {
                content,
                similarity,
            })
            .collect())
    }
}
