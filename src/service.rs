//! Document service: the upload and search pipelines.
//!
//! [`DocService`] is constructed explicitly with its store and embedder and
//! shared (via `Arc`) by the CLI and the HTTP server. Uploads run
//! extract → clean → chunk → embed → insert; searches embed the query and
//! delegate ranking to the store.
//!
//! With embeddings disabled, uploads still store their chunks (without
//! vectors) so the library works; such documents never match a search.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use docsearch_core::chunk::{chunk_text, ChunkConfig};
use docsearch_core::embedding::Embedder;
use docsearch_core::models::{Chunk, Document, NewDocument, SearchResult};
use docsearch_core::store::DocumentStore;
use docsearch_core::CoreError;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::embedding::{create_embedder, embed_chunks, is_disabled};
use crate::extract::{clean_text, extract_bytes, extract_file};
use crate::library::{truncate_chars, LibraryQuery};
use crate::progress::{ProgressReporter, UploadEvent};
use crate::sqlite_store::SqliteStore;

/// Characters of extracted text kept as the document's stored preview.
pub const CONTENT_PREVIEW_CHARS: usize = 1000;

/// Outcome of a successful upload.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadReceipt {
    pub id: String,
    pub filename: String,
    pub chunks: usize,
}

pub struct DocService {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkConfig,
    concurrency: usize,
}

impl DocService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            chunking,
            concurrency: concurrency.max(1),
        }
    }

    /// Wire up the SQLite store and configured embedder.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = SqliteStore::connect(config).await?;
        let credentials = if config.embedding.is_enabled() {
            Some(
                CredentialStore::open(&config.credentials.dir)
                    .await
                    .context("Failed to open credential store")?,
            )
        } else {
            None
        };
        let embedder = create_embedder(&config.embedding, credentials.as_ref()).await?;
        if let Some(credentials) = credentials {
            credentials.close().await;
        }

        Ok(Self::new(
            Arc::new(store),
            embedder,
            config.chunking.chunk_config()?,
            config.embedding.concurrency,
        ))
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub async fn upload_file(
        &self,
        path: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<UploadReceipt> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.report(UploadEvent::Extracting {
            filename: filename.clone(),
        });
        let raw = extract_file(path)?;
        self.ingest(filename, &raw, progress).await
    }

    pub async fn upload_bytes(
        &self,
        filename: &str,
        bytes: &[u8],
        progress: &dyn ProgressReporter,
    ) -> Result<UploadReceipt> {
        if filename.trim().is_empty() {
            return Err(CoreError::EmptyFilename.into());
        }
        progress.report(UploadEvent::Extracting {
            filename: filename.to_string(),
        });
        let raw = extract_bytes(bytes, filename)?;
        self.ingest(filename.to_string(), &raw, progress).await
    }

    async fn ingest(
        &self,
        filename: String,
        raw: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<UploadReceipt> {
        if filename.trim().is_empty() {
            return Err(CoreError::EmptyFilename.into());
        }

        let text = clean_text(raw);
        let pieces = chunk_text(&text, &self.chunking);
        tracing::debug!(file = %filename, chars = text.chars().count(), chunks = pieces.len(), "chunked document");

        let chunks = if is_disabled(self.embedder.as_ref()) {
            tracing::warn!(file = %filename, "embeddings disabled; storing chunks without vectors");
            pieces.into_iter().map(Chunk::new).collect()
        } else {
            embed_chunks(
                Arc::clone(&self.embedder),
                &filename,
                pieces,
                self.concurrency,
                progress,
            )
            .await?
        };

        let content = if text.chars().count() > CONTENT_PREVIEW_CHARS {
            format!("{}...", truncate_chars(&text, CONTENT_PREVIEW_CHARS))
        } else {
            text.clone()
        };

        let new_doc = NewDocument {
            filename: filename.clone(),
            content,
            created_at: Some(Utc::now()),
            chunks,
        };
        let id = self.store.insert(&new_doc).await?;
        let chunk_count = new_doc.chunks.len();

        tracing::info!(file = %filename, %id, chunks = chunk_count, "document stored");
        progress.report(UploadEvent::Stored {
            filename: filename.clone(),
            id: id.clone(),
            chunks: chunk_count as u64,
        });

        Ok(UploadReceipt {
            id,
            filename,
            chunks: chunk_count,
        })
    }

    pub async fn list(&self, query: &LibraryQuery) -> Result<Vec<Document>> {
        let docs = self.store.list_all().await?;
        Ok(query.apply(docs))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        self.store.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            tracing::info!(%id, "document deleted");
        }
        Ok(deleted)
    }

    /// Rank stored documents against `query`. An empty result means no
    /// document matched; failures are errors.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            bail!("search query must not be empty");
        }
        let vector = self.embedder.embed(query).await?;
        let results = self.store.vector_search(&vector, limit).await?;
        tracing::info!(limit, hits = results.len(), "search completed");
        Ok(results)
    }
}

impl std::fmt::Debug for DocService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocService")
            .field("embedder", &self.embedder.model_name())
            .field("chunking", &self.chunking)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

