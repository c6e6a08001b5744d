//! Document retrieval by ID.
//!
//! Used by both `docsearch get` and `GET /documents/{id}`.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use docsearch_core::models::Document;

use crate::library::full_text;
use crate::service::DocService;

/// Full document view: metadata, the reassembled text and each chunk.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    pub id: String,
    pub filename: String,
    pub uploaded: String,
    pub created_at: Option<DateTime<Utc>>,
    pub preview: String,
    pub text: String,
    pub chunks: Vec<ChunkDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkDetail {
    pub index: usize,
    pub text: String,
    pub embedded: bool,
}

impl From<&Document> for DocumentDetail {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            uploaded: doc.uploaded(),
            created_at: doc.created_at,
            preview: doc.content.clone(),
            text: full_text(doc),
            chunks: doc
                .chunks
                .iter()
                .enumerate()
                .map(|(index, c)| ChunkDetail {
                    index,
                    text: c.text.clone(),
                    embedded: c.embedding.is_some(),
                })
                .collect(),
        }
    }
}

/// CLI entry point: fetch the document and print it to stdout.
pub async fn run_get(service: &DocService, id: &str) -> Result<()> {
    let doc = match service.get(id).await? {
        Some(doc) => DocumentDetail::from(&doc),
        None => bail!("document not found: {}", id),
    };

    println!("--- Document ---");
    println!("id:        {}", doc.id);
    println!("filename:  {}", doc.filename);
    println!("uploaded:  {}", doc.uploaded);
    println!(
        "chunks:    {} ({} embedded)",
        doc.chunks.len(),
        doc.chunks.iter().filter(|c| c.embedded).count()
    );
    println!();

    println!("--- Text ---");
    println!("{}", doc.text);
    println!();

    println!("--- Chunks ({}) ---", doc.chunks.len());
    for chunk in &doc.chunks {
        println!("[chunk {}]", chunk.index);
        println!("{}", chunk.text);
        println!();
    }

    Ok(())
}
