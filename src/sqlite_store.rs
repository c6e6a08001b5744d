//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Documents and their chunks live in two tables (see [`crate::migrate`]).
//! Timestamps are stored as Unix milliseconds, embeddings as
//! little-endian `f32` BLOBs.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use docsearch_core::embedding::{blob_to_vec, vec_to_blob};
use docsearch_core::models::{Chunk, Document, NewDocument};
use docsearch_core::store::{sort_by_recency, DocumentStore};
use docsearch_core::CoreError;

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database and make sure the schema exists.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_chunks(&self, doc_id: Option<&str>) -> Result<HashMap<String, Vec<Chunk>>> {
        let rows = match doc_id {
            Some(id) => {
                sqlx::query(
                    "SELECT document_id, text, embedding FROM chunks WHERE document_id = ? ORDER BY chunk_index",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT document_id, text, embedding FROM chunks ORDER BY document_id, chunk_index",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut by_doc: HashMap<String, Vec<Chunk>> = HashMap::new();
        for row in rows {
            let document_id: String = row.get("document_id");
            let embedding: Option<Vec<u8>> = row.get("embedding");
            by_doc.entry(document_id).or_default().push(Chunk {
                text: row.get("text"),
                embedding: embedding.map(|blob| blob_to_vec(&blob)),
            });
        }
        Ok(by_doc)
    }
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow, chunks: Vec<Chunk>) -> Document {
    Document {
        id: row.get("id"),
        filename: row.get("filename"),
        content: row.get("content"),
        created_at: from_millis(row.get("created_at")),
        chunks,
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, doc: &NewDocument) -> Result<String> {
        if doc.filename.trim().is_empty() {
            return Err(CoreError::EmptyFilename.into());
        }

        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO documents (id, filename, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&doc.filename)
            .bind(&doc.content)
            .bind(doc.created_at.map(|dt| dt.timestamp_millis()))
            .execute(&mut *tx)
            .await?;

        for (i, chunk) in doc.chunks.iter().enumerate() {
            let blob = chunk.embedding.as_deref().map(vec_to_blob);
            let dims = chunk.embedding.as_ref().map(|v| v.len() as i64);
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, text, embedding, dims) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(i as i64)
            .bind(&chunk.text)
            .bind(blob)
            .bind(dims)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, filename, content, created_at FROM documents ORDER BY created_at IS NULL, created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut chunks = self.load_chunks(None).await?;
        let mut docs: Vec<Document> = rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let doc_chunks = chunks.remove(&id).unwrap_or_default();
                document_from_row(row, doc_chunks)
            })
            .collect();
        sort_by_recency(&mut docs);
        Ok(docs)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT id, filename, content, created_at FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let chunks = self.load_chunks(Some(id)).await?.remove(id).unwrap_or_default();
                Ok(Some(document_from_row(&row, chunks)))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
