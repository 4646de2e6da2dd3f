use crate::error::EmbeddingError;
use crate::provider::{EmbeddingModelInfo, EmbeddingProvider};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI caps the number of inputs per request.
pub const MAX_BATCH_SIZE: usize = 2048;

/// Configuration for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Never serialized; supplied from the environment
    #[serde(skip)]
    pub api_key: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Known vector sizes of the hosted models.
fn model_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

/// Embedding provider backed by an OpenAI-compatible HTTP API
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.is_empty() {
            return Err(EmbeddingError::InvalidInput("API key is required".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        info!(
            "Initialized embedding provider {} (model {})",
            config.api_base, config.model
        );
        Ok(Self { client, config })
    }

    /// Reject requests the API would refuse anyway.
    pub fn validate_request(texts: &[String]) -> Result<(), EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "at least one text is required".into(),
            ));
        }

        if texts.len() > MAX_BATCH_SIZE {
            return Err(EmbeddingError::InvalidInput(format!(
                "batch size exceeds maximum of {MAX_BATCH_SIZE}"
            )));
        }

        if let Some(idx) = texts.iter().position(String::is_empty) {
            return Err(EmbeddingError::InvalidInput(format!(
                "text at index {idx} is empty"
            )));
        }

        Ok(())
    }
}

fn request_error(err: reqwest::Error) -> EmbeddingError {
    if err.is_timeout() {
        EmbeddingError::Request(format!("timeout: {err}"))
    } else if err.is_connect() {
        EmbeddingError::Request(format!("connection failed: {err}"))
    } else {
        EmbeddingError::Request(err.to_string())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Self::validate_request(texts)?;

        debug!(
            "Requesting {} embeddings from {}",
            texts.len(),
            self.config.model
        );

        let url = format!("{}/embeddings", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            let message = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                format!("rate limit: {text}")
            } else {
                text
            };
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        parsed.data.sort_by_key(|d| d.index);
        if let Some(usage) = parsed.usage {
            debug!(
                "Generated {} embeddings, tokens used: {}",
                parsed.data.len(),
                usage.total_tokens
            );
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_info(&self) -> EmbeddingModelInfo {
        EmbeddingModelInfo {
            provider: "openai".to_string(),
            model: self.config.model.clone(),
            dimensions: model_dimensions(&self.config.model),
            max_batch_size: Some(MAX_BATCH_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiEmbeddingProvider {
        OpenAiEmbeddingProvider::new(OpenAiConfig {
            api_base: server.uri(),
            api_key: "test-key".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = OpenAiEmbeddingProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_request() {
        assert!(OpenAiEmbeddingProvider::validate_request(&[]).is_err());
        assert!(OpenAiEmbeddingProvider::validate_request(&["a".into(), String::new()]).is_err());
        let too_many = vec!["x".to_string(); MAX_BATCH_SIZE + 1];
        assert!(OpenAiEmbeddingProvider::validate_request(&too_many).is_err());
        assert!(OpenAiEmbeddingProvider::validate_request(&["ok".into()]).is_ok());
    }

    #[tokio::test]
    async fn test_embeddings_are_returned_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 4, "total_tokens": 4}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let vectors = provider
            .generate_embeddings(&["first".into(), "second".into()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate_embeddings(&["text".into()])
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::Api { status: 429, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unauthorized_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate_embeddings(&["text".into()])
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate_embeddings(&["text".into()])
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }
}
