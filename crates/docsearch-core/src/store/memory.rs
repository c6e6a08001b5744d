//! In-memory [`DocumentStore`] implementation for testing.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`. Search uses the
//! trait's default brute-force ranking.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Document, NewDocument};

use super::{sort_by_recency, DocumentStore};

/// In-memory store for tests and embedding in other tools.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents. Fails like the trait methods when a
    /// writer panicked while holding the lock.
    pub fn len(&self) -> Result<usize> {
        Ok(self.docs.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, doc: &NewDocument) -> Result<String> {
        if doc.filename.trim().is_empty() {
            return Err(CoreError::EmptyFilename.into());
        }
        let id = Uuid::new_v4().to_string();
        let mut docs = self.docs.write().map_err(poisoned)?;
        docs.push(Document {
            id: id.clone(),
            filename: doc.filename.clone(),
            content: doc.content.clone(),
            created_at: doc.created_at,
            chunks: doc.chunks.clone(),
        });
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        let mut docs = self.docs.read().map_err(poisoned)?.clone();
        sort_by_recency(&mut docs);
        Ok(docs)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use chrono::{Duration, TimeZone, Utc};

    fn new_doc(filename: &str, age_days: Option<i64>, chunks: Vec<Chunk>) -> NewDocument {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        NewDocument {
            filename: filename.to_string(),
            content: format!("preview of {}", filename),
            created_at: age_days.map(|d| base - Duration::days(d)),
            chunks,
        }
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = InMemoryStore::new();
        let id = store
            .insert(&new_doc("a.txt", Some(0), vec![Chunk::new("hello")]))
            .await
            .unwrap();

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.filename, "a.txt");
        assert_eq!(doc.chunks.len(), 1);

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let writer = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = writer.docs.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(store.len().is_err());
        assert!(store.is_empty().is_err());
    }

    #[tokio::test]
    async fn test_rejects_empty_filename() {
        let store = InMemoryStore::new();
        let err = store.insert(&new_doc("  ", None, vec![])).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CoreError>(),
            Some(&CoreError::EmptyFilename)
        );
    }

    #[tokio::test]
    async fn test_list_orders_by_recency_with_unknown_dates_last() {
        let store = InMemoryStore::new();
        store.insert(&new_doc("old.txt", Some(10), vec![])).await.unwrap();
        store.insert(&new_doc("undated.txt", None, vec![])).await.unwrap();
        store.insert(&new_doc("new.txt", Some(1), vec![])).await.unwrap();

        let names: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.filename)
            .collect();
        assert_eq!(names, vec!["new.txt", "old.txt", "undated.txt"]);
    }

    #[tokio::test]
    async fn test_default_vector_search_ranks() {
        let store = InMemoryStore::new();
        store
            .insert(&new_doc(
                "a.txt",
                Some(1),
                vec![
                    Chunk::with_embedding("a1", vec![0.9, 0.0]),
                    Chunk::with_embedding("a2", vec![0.3, 0.0]),
                ],
            ))
            .await
            .unwrap();
        store
            .insert(&new_doc(
                "b.txt",
                Some(2),
                vec![Chunk::with_embedding("b1", vec![0.95, 0.0])],
            ))
            .await
            .unwrap();
        store
            .insert(&new_doc("c.txt", Some(3), vec![Chunk::new("unembedded")]))
            .await
            .unwrap();

        let results = store.vector_search(&[1.0, 0.0], 5).await.unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert_eq!(results[1].best_chunk, "a1");
    }
}
