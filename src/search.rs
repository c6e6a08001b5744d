//! `docsearch search`: embed a query and print the ranked documents.

use anyhow::Result;

use docsearch_core::models::format_created_at;

use crate::library::truncate_chars;
use crate::service::DocService;

const SNIPPET_CHARS: usize = 240;

pub async fn run_search(service: &DocService, query: &str, limit: usize) -> Result<()> {
    let results = service.search(query, limit).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}",
            i + 1,
            result.similarity,
            result.filename
        );
        println!("    uploaded: {}", format_created_at(result.created_at));
        println!("    id: {}", result.document_id);
        let snippet = truncate_chars(&result.best_chunk, SNIPPET_CHARS);
        if snippet.len() < result.best_chunk.len() {
            println!("    {}...", snippet);
        } else {
            println!("    {}", snippet);
        }
        println!();
    }

    Ok(())
}
