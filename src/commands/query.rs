//! Query command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::store::{SearchHit, VectorStore};
use serde::Serialize;
use tracing::info;

/// Query options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Number of results to return
    pub top_k: Option<usize>,

    /// Collection to search (defaults to the configured one)
    pub collection: Option<String>,
}

/// Query result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub collection: String,
    pub hits: Vec<SearchHit>,
}

/// Execute a similarity query against the index
pub async fn cmd_query(
    config: &Config,
    store: &VectorStore,
    embedder: &dyn Embedder,
    query: &str,
    options: QueryOptions,
) -> Result<QueryResult> {
    info!("Querying: {}", query);

    let k = options.top_k.unwrap_or(config.query.top_k);
    let collection = options
        .collection
        .unwrap_or_else(|| config.collection_name.clone());

    let query_vector = embedder.embed_one(query).await?;
    let hits = store.query(&collection, &query_vector, k).await?;

    info!("Returning {} results", hits.len());

    Ok(QueryResult {
        query: query.to_string(),
        collection,
        hits,
    })
}

/// Print query results to console
pub fn print_query_results(result: &QueryResult) {
    println!("\n🔍 Query: {}\n", result.query);

    if result.hits.is_empty() {
        println!("No results in collection '{}'.", result.collection);
        return;
    }

    println!("Found {} results:\n", result.hits.len());

    for (i, hit) in result.hits.iter().enumerate() {
        println!(
            "{}. [distance: {:.4}] {} (chunk {})",
            i + 1,
            hit.distance,
            hit.source_id,
            hit.sequence_index
        );
        println!("   {}", preview(&hit.text, 200));
        println!();
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}
