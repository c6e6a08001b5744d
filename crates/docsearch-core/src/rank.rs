//! Brute-force similarity ranking over stored chunk embeddings.
//!
//! Every embedded chunk is scored against the query, each document keeps
//! its best chunk, and documents are returned best first.
//!
//! # Algorithm
//!
//! 1. For every chunk whose embedding has the query's dimensionality,
//!    score = plain dot product with the query (no normalization).
//! 2. Group by document (MAX aggregation); on equal maxima the earlier
//!    chunk keeps its place as `best_chunk`.
//! 3. Sort by score (desc), then document id (asc).
//! 4. Truncate to `limit`.
//!
//! Chunks without embeddings, empty documents, vectors of a foreign
//! dimensionality and chunks scoring NaN or infinity are skipped silently. A corpus in which nothing matches
//! the query's dimensionality ranks to an empty list.
//!
//! This is an O(total chunks × dims) scan. It is meant for single-user
//! collections; stores with an index can override
//! [`DocumentStore::vector_search`](crate::store::DocumentStore::vector_search).

use crate::models::{Document, SearchResult};

/// Default number of documents returned by a search.
pub const DEFAULT_LIMIT: usize = 5;

/// Dot product of two vectors, accumulated in `f64`.
///
/// Returns `None` when the lengths differ or either vector is empty.
pub fn dot_product(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    Some(
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| f64::from(*x) * f64::from(*y))
            .sum(),
    )
}

/// Best-scoring chunk of one document: `(chunk index, score)`.
fn best_chunk(query: &[f32], doc: &Document) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, chunk) in doc.chunks.iter().enumerate() {
        let Some(embedding) = chunk.embedding.as_deref() else {
            continue;
        };
        let Some(score) = dot_product(embedding, query) else {
            continue;
        };
        if !score.is_finite() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

/// Rank `corpus` against `query` and return at most `limit` results.
///
/// Produces exactly one [`SearchResult`] per document that has at least
/// one comparable embedded chunk. Identical inputs always give identical
/// output order.
pub fn rank_documents(query: &[f32], corpus: &[Document], limit: usize) -> Vec<SearchResult> {
    if query.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut results: Vec<SearchResult> = corpus
        .iter()
        .filter_map(|doc| {
            best_chunk(query, doc).map(|(idx, score)| SearchResult {
                document_id: doc.id.clone(),
                filename: doc.filename.clone(),
                best_chunk: doc.chunks[idx].text.clone(),
                similarity: score,
                created_at: doc.created_at,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    results.truncate(limit);
    results
}
