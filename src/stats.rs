//! Database statistics.
//!
//! A quick summary of what is stored: document and chunk counts, embedding
//! coverage and database size. Used by `docsearch stats`.

use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::{db, migrate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub documents: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
    pub undated_documents: i64,
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<Stats> {
    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;
    let embedded_chunks: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")
            .fetch_one(pool)
            .await?;
    let undated_documents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE created_at IS NULL")
            .fetch_one(pool)
            .await?;

    Ok(Stats {
        documents,
        chunks,
        embedded_chunks,
        undated_documents,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let stats = collect_stats(&pool).await?;
    pool.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docsearch Database Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", stats.documents);
    println!("  Chunks:      {}", stats.chunks);
    println!(
        "  Embedded:    {} / {} ({}%)",
        stats.embedded_chunks,
        stats.chunks,
        if stats.chunks > 0 {
            (stats.embedded_chunks * 100) / stats.chunks
        } else {
            0
        }
    );
    if stats.undated_documents > 0 {
        println!("  Undated:     {}", stats.undated_documents);
    }
    println!("  Embeddings:  {} ({} dims)", config.embedding.provider, config.embedding.dims);
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::models::{Chunk, NewDocument};
    use docsearch_core::store::DocumentStore;

    use crate::sqlite_store::SqliteStore;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[tokio::test]
    async fn collect_stats_counts_embedded_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect_path(&dir.path().join("s.sqlite")).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());

        store
            .insert(&NewDocument {
                filename: "a.txt".into(),
                content: "x".into(),
                created_at: None,
                chunks: vec![Chunk::with_embedding("x", vec![1.0]), Chunk::new("y")],
            })
            .await
            .unwrap();

        let stats = collect_stats(&pool).await.unwrap();
        assert_eq!(
            stats,
            Stats {
                documents: 1,
                chunks: 2,
                embedded_chunks: 1,
                undated_documents: 1,
            }
        );
    }
}
