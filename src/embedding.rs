//! Embedding providers.
//!
//! - **[`DisabledEmbedder`]**: fails every call; used when
//!   `embedding.provider = "disabled"`.
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with retry
//!   and backoff.
//!
//! [`create_embedder`] picks one from configuration. [`embed_chunks`] fans
//! a document's chunks out over concurrent embedding calls.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use docsearch_core::embedding::Embedder;
use docsearch_core::models::Chunk;
use docsearch_core::CoreError;

use crate::config::EmbeddingConfig;
use crate::credentials::{self, CredentialStore};
use crate::progress::{ProgressReporter, UploadEvent};

/// Returned by [`DisabledEmbedder`]; surfaces as `embeddings_disabled` over HTTP.
#[derive(Debug, Error)]
#[error("embeddings are disabled; set [embedding] provider = \"openai\" and an API key")]
pub struct EmbeddingsDisabled;

// ============ Disabled ============

/// Reports zero dimensions; see [`is_disabled`].
pub struct DisabledEmbedder;

/// Whether `embedder` produces no vectors. Configured providers always
/// have a non-zero dimensionality.
pub fn is_disabled(embedder: &dyn Embedder) -> bool {
    embedder.dims() == 0
}

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(EmbeddingsDisabled.into())
    }
}

// ============ OpenAI ============

/// Embedder backed by `POST {api_base}/embeddings`.
///
/// The HTTP client is built once in [`connect`](OpenAiEmbedder::connect)
/// and released when the embedder is dropped.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn connect(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("OpenAI API key is empty");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }

    async fn request(&self, text: &str) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .context("Invalid JSON from embeddings API");
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(%status, attempt, "embedding request failed, will retry");
                        last_err = Some(anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "embedding request failed, will retry");
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let json = self.request(text).await?;
        let vector = parse_openai_response(&json)?;
        if vector.len() != self.dims {
            return Err(CoreError::DimensionMismatch {
                expected: self.dims,
                actual: vector.len(),
            }
            .into());
        }
        Ok(vector)
    }
}

/// Extract `data[0].embedding` from an embeddings API response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data[0].embedding"))?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .filter(|f| f.is_finite())
                .ok_or_else(|| anyhow!("Invalid OpenAI response: non-finite embedding value"))
        })
        .collect()
}

/// Build the configured embedder.
///
/// For `"openai"` the API key comes from the credential store
/// ([`credentials::OPENAI_API_KEY`]), falling back to the `OPENAI_API_KEY`
/// environment variable.
pub async fn create_embedder(
    config: &EmbeddingConfig,
    credential_store: Option<&CredentialStore>,
) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => {
            let stored = match credential_store {
                Some(store) => store.get(credentials::OPENAI_API_KEY).await?,
                None => None,
            };
            let api_key = match stored {
                Some(key) => key,
                None => std::env::var("OPENAI_API_KEY").map_err(|_| {
                    anyhow!(
                        "No OpenAI API key: run `docsearch credentials set {}` or set OPENAI_API_KEY",
                        credentials::OPENAI_API_KEY
                    )
                })?,
            };
            Ok(Arc::new(OpenAiEmbedder::connect(config, api_key)?))
        }
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embed every chunk with independent concurrent calls, at most
/// `concurrency` in flight. Results are re-associated by chunk index, so
/// the output order matches `texts` regardless of completion order. The
/// first failure aborts the remaining calls.
pub async fn embed_chunks(
    embedder: Arc<dyn Embedder>,
    filename: &str,
    texts: Vec<String>,
    concurrency: usize,
    progress: &dyn ProgressReporter,
) -> Result<Vec<Chunk>> {
    let total = texts.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (index, text) in texts.iter().cloned().enumerate() {
        let embedder = Arc::clone(&embedder);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let vector = embedder.embed(&text).await?;
            Ok::<_, anyhow::Error>((index, vector))
        });
    }

    let mut vectors: Vec<Option<Vec<f32>>> = vec![None; total];
    let mut done = 0u64;
    while let Some(joined) = set.join_next().await {
        let (index, vector) = joined
            .context("embedding task panicked")?
            .with_context(|| format!("Failed to embed chunk of {}", filename))?;
        vectors[index] = Some(vector);
        done += 1;
        progress.report(UploadEvent::Embedding {
            filename: filename.to_string(),
            n: done,
            total: total as u64,
        });
    }

    texts
        .into_iter()
        .zip(vectors)
        .map(|(text, vector)| {
            vector
                .map(|v| Chunk::with_embedding(text, v))
                .ok_or_else(|| anyhow!("missing embedding result"))
        })
        .collect()
}
