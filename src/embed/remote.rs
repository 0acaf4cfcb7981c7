//! Remote HTTP embedding provider
//!
//! Posts batches of texts to a configured embedding endpoint. Retries and
//! backoff live here, behind the provider boundary; callers only see an
//! all-or-nothing result per batch.

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const MAX_RETRIES: usize = 2;

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

/// Accept the common response shapes for embedding endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Embeddings { embeddings: Vec<Vec<f32>> },
    Data { data: Vec<EmbeddingData> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbedResponse {
    fn into_embeddings(self) -> Vec<Vec<f32>> {
        match self {
            EmbedResponse::Embeddings { embeddings } => embeddings,
            EmbedResponse::Data { data } => data.into_iter().map(|d| d.embedding).collect(),
        }
    }
}

/// HTTP-backed embedder
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

impl RemoteEmbedder {
    /// Create a remote embedder from configuration.
    pub fn new(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key,
        })
    }

    fn validate(&self, embeddings: &[Vec<f32>], expected_count: usize) -> Result<()> {
        if embeddings.len() != expected_count {
            return Err(Error::Embedding(format!(
                "endpoint returned {} embeddings for {} inputs",
                embeddings.len(),
                expected_count
            )));
        }
        if let Some(mismatch) = embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }

    async fn send_with_retry(&self, body: &EmbedRequest) -> Result<EmbedResponse> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=MAX_RETRIES {
            let mut request = self.client.post(&self.endpoint).json(body);
            if let Some(ref key) = self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => return Ok(ok.json::<EmbedResponse>().await?),
                    Err(e) => last_err = Some(Error::Embedding(e.to_string())),
                },
                Err(e) => last_err = Some(Error::Embedding(e.to_string())),
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Embedding("embedding request failed".to_string())))
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts via {}", texts.len(), self.endpoint);

        let count = texts.len();
        let body = EmbedRequest {
            model: self.model.clone(),
            input: texts,
        };

        let embeddings = self.send_with_retry(&body).await?.into_embeddings();
        self.validate(&embeddings, count)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_config(endpoint: String, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint,
            dimension,
            model: "test-model".to_string(),
            timeout_secs: 5,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_embed_parses_data_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "embedding": [1.0, 0.0, 0.0] },
                    { "embedding": [0.0, 1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let config = remote_config(format!("{}/v1/embeddings", server.uri()), 3);
        let embedder = RemoteEmbedder::new(&config, Some("key".to_string())).unwrap();

        let vectors = embedder
            .embed(vec!["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_embed_parses_embeddings_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[0.5, 0.5]]
            })))
            .mount(&server)
            .await;

        let config = remote_config(format!("{}/v1/embeddings", server.uri()), 2);
        let embedder = RemoteEmbedder::new(&config, None).unwrap();

        let vectors = embedder.embed(vec!["only".to_string()]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.5]]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[0.5, 0.5, 0.5, 0.5]]
            })))
            .mount(&server)
            .await;

        let config = remote_config(format!("{}/v1/embeddings", server.uri()), 2);
        let embedder = RemoteEmbedder::new(&config, None).unwrap();

        let result = embedder.embed(vec!["only".to_string()]).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [[0.5, 0.5]]
            })))
            .mount(&server)
            .await;

        let config = remote_config(format!("{}/v1/embeddings", server.uri()), 2);
        let embedder = RemoteEmbedder::new(&config, None).unwrap();

        let result = embedder
            .embed(vec!["one".to_string(), "two".to_string()])
            .await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_server_error_propagates_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = remote_config(format!("{}/v1/embeddings", server.uri()), 2);
        let embedder = RemoteEmbedder::new(&config, None).unwrap();

        let result = embedder.embed(vec!["boom".to_string()]).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
