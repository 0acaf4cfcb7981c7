//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - Local embedding support via fastembed
//! - A remote HTTP provider
//! - Batch processing with bounded batch size and timeout
//!
//! Providers are selected once from configuration; the splitter, assembler,
//! and store never branch on which provider is in use.

#[cfg(feature = "local-embed")]
mod fastembed_impl;
mod remote;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;
pub use remote::*;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Output order matches input order, and the call
    /// is all-or-nothing: a failure never yields a partial batch.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text. Equivalent to `embed(vec![text])[0]` by
    /// construction, so the batch and single-item paths cannot diverge.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("provider returned no embedding".to_string()))
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration.
///
/// The remote provider's credential comes from `Config::api_key()` and has
/// already been checked at startup.
pub fn create_embedder(
    config: &EmbeddingConfig,
    api_key: Option<String>,
) -> Result<Box<dyn Embedder>> {
    match config.provider {
        ProviderKind::Local => {
            #[cfg(feature = "local-embed")]
            {
                let embedder = FastEmbedder::new(config)?;
                Ok(Box::new(embedder))
            }

            #[cfg(not(feature = "local-embed"))]
            {
                Err(Error::Config(
                    "local embedding provider requires the 'local-embed' feature".to_string(),
                ))
            }
        }
        ProviderKind::Remote => {
            let embedder = RemoteEmbedder::new(config, api_key)?;
            Ok(Box::new(embedder))
        }
    }
}

/// Embed texts in bounded batches, each wrapped in a timeout.
///
/// Batches are issued sequentially; on a provider error or timeout the whole
/// call fails with no partial batch appended, so the caller's progress is
/// always a prefix of completed batches.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = batch.to_vec();
        let embeddings = tokio::time::timeout(timeout, embedder.embed(batch_texts))
            .await
            .map_err(|_| Error::EmbeddingTimeout(timeout.as_secs()))??;

        if embeddings.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "provider returned {} embeddings for a batch of {}",
                embeddings.len(),
                batch.len()
            )));
        }

        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic embedder for pipeline tests: encodes text length and
    /// first byte so distances are predictable.
    pub(crate) struct StubEmbedder {
        pub dimension: usize,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; self.dimension];
                    v[0] = t.chars().count() as f32;
                    if let Some(b) = t.bytes().next() {
                        v[1 % self.dimension] = b as f32;
                    }
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_embed_one_equals_batch_of_one() {
        let embedder = StubEmbedder { dimension: 4 };
        let single = embedder.embed_one("hello").await.unwrap();
        let batch = embedder.embed(vec!["hello".to_string()]).await.unwrap();
        assert_eq!(vec![single], batch);
    }

    #[tokio::test]
    async fn test_batch_element_matches_single() {
        let embedder = StubEmbedder { dimension: 4 };
        let batch = embedder
            .embed(vec!["a".to_string(), "bb".to_string(), "ccc".to_string()])
            .await
            .unwrap();
        let single = embedder.embed_one("bb").await.unwrap();
        assert_eq!(batch[1], single);
    }

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let embedder = StubEmbedder { dimension: 4 };
        let texts: Vec<String> = (1..=10).map(|i| "x".repeat(i)).collect();
        let vectors = embed_in_batches(&embedder, texts, 3, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(vectors.len(), 10);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], (i + 1) as f32);
        }
    }

    #[tokio::test]
    async fn test_embed_in_batches_empty_input() {
        let embedder = StubEmbedder { dimension: 4 };
        let vectors = embed_in_batches(&embedder, Vec::new(), 8, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(vectors.is_empty());
    }
}
