use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_NGRAM_DIMENSIONS: usize = 128;
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_OPENAI_DIMENSIONS: usize = 1536;

/// Text to fixed-length vector. Every successful call returns exactly
/// [`Embedder::dimensions`] components.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

pub(crate) fn check_dimensions(
    expected: usize,
    vector: Vec<f32>,
) -> Result<Vec<f32>, EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector)
}

/// Offline embedder hashing lowercase character trigrams into buckets.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_NGRAM_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
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
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimensions: DEFAULT_OPENAI_DIMENSIONS,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
///
/// One request per call, no retry and no caching.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig("api key is empty".to_string()));
        }
        if config.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "dimensions must be positive".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(model = %self.config.model, chars = text.len(), "requesting embedding");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "input": text,
                "model": self.config.model,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let vector = parse_embedding_response(&body)?;
        check_dimensions(self.config.dimensions, vector)
    }
}

fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|error| EmbeddingError::MalformedResponse(error.to_string()))?;

    parsed
        .data
        .into_iter()
        .next()
        .and_then(|item| item.embedding)
        .ok_or_else(|| EmbeddingError::MalformedResponse("missing data[0].embedding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedder_is_deterministic() -> Result<(), EmbeddingError> {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Hydraulic pressure and flow").await?;
        let second = embedder.embed("Hydraulic pressure and flow").await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn embedder_outputs_declared_length() -> Result<(), EmbeddingError> {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed("abc").await?;
        assert_eq!(vector.len(), embedder.dimensions());

        let empty = embedder.embed("").await?;
        assert_eq!(empty.len(), 32);
        Ok(())
    }

    #[test]
    fn response_vector_is_read_from_first_item() -> Result<(), EmbeddingError> {
        let body = r#"{"object":"list","data":[
            {"object":"embedding","index":0,"embedding":[0.5,-0.25,1.0]}
        ]}"#;
        assert_eq!(parse_embedding_response(body)?, vec![0.5, -0.25, 1.0]);
        Ok(())
    }

    #[test]
    fn response_without_vector_is_malformed() {
        let bodies = [
            r#"{"data":[]}"#,
            r#"{"data":[{"index":0}]}"#,
            r#"{"error":"x"}"#,
            "not json",
        ];
        for body in bodies {
            let error = parse_embedding_response(body).expect_err(body);
            assert!(matches!(error, EmbeddingError::MalformedResponse(_)), "{body}");
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        let error = check_dimensions(4, vec![1.0, 2.0]).expect_err("short vector");
        assert!(matches!(
            error,
            EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn openai_client_requires_api_key() {
        let result = OpenAiEmbedder::new(OpenAiConfig::new("  "));
        assert!(matches!(result, Err(EmbeddingError::InvalidConfig(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn live_openai_embedding_has_declared_length() -> Result<(), Box<dyn std::error::Error>> {
        let api_key = std::env::var("OPENAI_API_KEY")?;
        let embedder = OpenAiEmbedder::new(OpenAiConfig::new(api_key))?;
        let vector = embedder.embed("refund window").await?;
        assert_eq!(vector.len(), DEFAULT_OPENAI_DIMENSIONS);
        Ok(())
    }
}
