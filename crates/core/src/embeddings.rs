use crate::error::EmbedError;
use crate::retry::{backoff, retryable_status, retryable_transport};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps text to fixed-dimension vectors.
///
/// One embedder instance serves both ingestion and query so the stored
/// vectors and the question vector live in the same space.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Deterministic local embedder hashing character trigrams into buckets.
///
/// Identical text always produces identical vectors, so queries retrieve
/// what ingestion stored without any network dependency.
#[derive(Debug, Clone, Copy)]
pub struct HashedNgramEmbedder {
    pub dimensions: usize,
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashedNgramEmbedder {
    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashedNgramEmbedder {
    fn model_id(&self) -> &str {
        "hashed-ngram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_sync(text))
    }
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
///
/// Transient failures (429, 5xx, transport) are retried a bounded number
/// of times with exponential backoff; a request that still times out is
/// reported as `EmbedError::Timeout` rather than hanging the caller.
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
    max_retries: usize,
}

impl RemoteEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            timeout,
            max_retries: max_retries.max(1),
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let mut attempt = 0usize;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(self.api_key.trim())
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp.json().await?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        if parsed.data.len() != texts.len() {
                            return Err(EmbedError::CountMismatch {
                                requested: texts.len(),
                                returned: parsed.data.len(),
                            });
                        }
                        return Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect());
                    }

                    let details = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if retryable_status(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Backend {
                        status: status.as_u16(),
                        details,
                    });
                }
                Err(error) => {
                    if retryable_transport(&error) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        sleep(backoff(attempt)).await;
                        continue;
                    }
                    if error.is_timeout() {
                        return Err(EmbedError::Timeout { after: self.timeout });
                    }
                    return Err(error.into());
                }
            }
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let input = [text.to_string()];
        let mut vectors = self.request_batch(&input).await?;
        vectors.pop().ok_or(EmbedError::CountMismatch {
            requested: 1,
            returned: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_batch(texts).await
    }
}

/// Runtime selection between the local and remote backends.
pub enum AnyEmbedder {
    Hashed(HashedNgramEmbedder),
    Remote(RemoteEmbedder),
}

#[async_trait]
impl Embedder for AnyEmbedder {
    fn model_id(&self) -> &str {
        match self {
            AnyEmbedder::Hashed(inner) => inner.model_id(),
            AnyEmbedder::Remote(inner) => inner.model_id(),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            AnyEmbedder::Hashed(inner) => inner.dimensions(),
            AnyEmbedder::Remote(inner) => inner.dimensions(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        match self {
            AnyEmbedder::Hashed(inner) => inner.embed(text).await,
            AnyEmbedder::Remote(inner) => inner.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        match self {
            AnyEmbedder::Hashed(inner) => inner.embed_batch(texts).await,
            AnyEmbedder::Remote(inner) => inner.embed_batch(texts).await,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
