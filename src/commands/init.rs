//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::VectorStore;
use std::path::PathBuf;
use tracing::info;

/// Initialize ragdex configuration and database
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<()> {
    let config = Config::with_base_dir(base_dir);

    // Check if already initialized
    if config.paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(
            config.paths.base_dir.display().to_string(),
        ));
    }

    std::fs::create_dir_all(&config.paths.base_dir)?;

    config.validate()?;
    config.save()?;
    info!("Created config at {:?}", config.paths.config_file);

    // Opening the store creates the database file and schema
    let store = VectorStore::open(&config.paths.db_file).await?;
    store.persist().await?;
    info!("Created database at {:?}", config.paths.db_file);

    println!("✓ Initialized ragdex at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Database: {:?}", config.paths.db_file);
    println!("\nNext steps:");
    println!("  ragdex ingest ./path/to/docs      # Index local documents");
    println!("  ragdex query \"your question\"      # Search the index");

    Ok(())
}
