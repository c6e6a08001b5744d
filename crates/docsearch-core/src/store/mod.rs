//! Storage abstraction for docsearch.
//!
//! The [`DocumentStore`] trait defines the persistence operations the
//! document service needs, enabling pluggable backends (SQLite,
//! in-memory). Implementations must be `Send + Sync` to work with async
//! runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, NewDocument, SearchResult};
use crate::rank::rank_documents;

/// Ordering applied by [`DocumentStore::list_all`]: newest first, documents
/// without a timestamp last, then by id for stability.
pub fn sort_by_recency(docs: &mut [Document]) {
    docs.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

/// Abstract document store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](DocumentStore::insert) | Persist a document with its chunks, returning its id |
/// | [`list_all`](DocumentStore::list_all) | Every document, newest first |
/// | [`get`](DocumentStore::get) | One document by id |
/// | [`delete`](DocumentStore::delete) | Remove a document, reporting whether it existed |
/// | [`vector_search`](DocumentStore::vector_search) | Rank documents against a query vector |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and its chunks. Returns the assigned id.
    async fn insert(&self, doc: &NewDocument) -> Result<String>;

    /// Return every document with its chunks, ordered as [`sort_by_recency`].
    async fn list_all(&self) -> Result<Vec<Document>>;

    /// Retrieve a document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Delete a document and its chunks. Returns `false` if no such document.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Rank stored documents against `query`.
    ///
    /// The default scans a snapshot from [`list_all`](DocumentStore::list_all)
    /// with [`rank_documents`]. Backends with a vector index may override it,
    /// but must keep the same result semantics.
    async fn vector_search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let corpus = self.list_all().await?;
        Ok(rank_documents(query, &corpus, limit))
    }
}
