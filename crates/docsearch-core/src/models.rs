//! Core data models.
//!
//! A [`Document`] owns an ordered sequence of [`Chunk`]s. Chunks have no
//! identity of their own: their position inside the parent is the only
//! handle, and the first one doubles as the library preview.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Placeholder shown for documents stored without a creation timestamp.
pub const UNKNOWN_DATE: &str = "Unknown date";

/// A span of document text and, once embedded, its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// `None` until the embedding provider has produced a vector. Chunks
    /// without one are invisible to search.
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding: Some(embedding),
        }
    }
}

/// A stored document as returned by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Opaque identifier assigned by the store.
    pub id: String,
    pub filename: String,
    /// Preview of the extracted text (not the full body).
    pub content: String,
    /// Missing for legacy rows; rendered as [`UNKNOWN_DATE`].
    pub created_at: Option<DateTime<Utc>>,
    pub chunks: Vec<Chunk>,
}

impl Document {
    /// Number of chunks that carry an embedding.
    pub fn embedded_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.embedding.is_some()).count()
    }

    /// Upload date formatted for display.
    pub fn uploaded(&self) -> String {
        format_created_at(self.created_at)
    }
}

/// A document about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub filename: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub chunks: Vec<Chunk>,
}

/// One ranked match: the best chunk of a document and its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub filename: String,
    /// Text of the highest-scoring chunk.
    pub best_chunk: String,
    /// Raw dot product between the query and `best_chunk`'s embedding.
    pub similarity: f64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Format a creation timestamp as `YYYY-MM-DD HH:MM`, or [`UNKNOWN_DATE`].
pub fn format_created_at(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}
