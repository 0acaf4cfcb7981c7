//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{CollectionInfo, VectorStore};
use serde::Serialize;

/// Index status for CLI display
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub config_file: String,
    pub db_file: String,
    pub collections: Vec<CollectionInfo>,
}

/// Report configured paths and the state of every collection
pub async fn cmd_status(config: &Config, store: &VectorStore) -> Result<StatusReport> {
    let collections = store.list_collections().await?;

    Ok(StatusReport {
        config_file: config.paths.config_file.display().to_string(),
        db_file: config.paths.db_file.display().to_string(),
        collections,
    })
}

/// Print status to console
pub fn print_status(report: &StatusReport) {
    println!("\nragdex status");
    println!("  Config:   {}", report.config_file);
    println!("  Database: {}", report.db_file);

    if report.collections.is_empty() {
        println!("\nNo collections yet. Run 'ragdex ingest <dir>' to create one.");
        return;
    }

    println!("\nCollections:");
    for c in &report.collections {
        println!(
            "  {} ({} records, dim {}, model {})",
            c.name, c.records, c.dimension, c.model
        );
    }
}
