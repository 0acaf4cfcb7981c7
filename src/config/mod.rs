//! Configuration management for ragdex
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default collection name for the vector store
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// In-process model via fastembed
    Local,
    /// Remote HTTP embedding endpoint
    Remote,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Remote => write!(f, "remote"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider backend: "local" or "remote"
    #[serde(default = "default_provider_kind")]
    pub provider: ProviderKind,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Per-batch timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Remote endpoint URL (remote provider only)
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Environment variable name for the remote API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Local
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_size")]
    pub max_size: usize,

    /// Overlap characters between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,

    /// Separator priority list, tried in order; "" is the raw-character fallback
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results
    #[serde(default = "default_query_top_k")]
    pub top_k: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for ragdex data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to the vector store database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            query: QueryConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider_kind(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout(),
            endpoint: default_embedding_endpoint(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_size: default_chunk_max_size(),
            overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_query_top_k(),
        }
    }
}

impl Config {
    /// Get the default base directory for ragdex (~/.ragdex)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ragdex")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Default configuration rooted at the given base directory
    pub fn with_base_dir(base_dir: Option<PathBuf>) -> Self {
        let mut config = Config::default();
        config.init_paths(base_dir);
        config
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("vectors.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Set up paths based on config file location
        let base = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("vectors.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the remote API key from the configured environment variable.
    ///
    /// Remote providers require the credential at startup; local providers
    /// never read it.
    pub fn api_key(&self) -> Result<Option<String>> {
        match self.embedding.provider {
            ProviderKind::Local => Ok(None),
            ProviderKind::Remote => match std::env::var(&self.embedding.api_key_env) {
                Ok(key) if !key.is_empty() => Ok(Some(key)),
                _ => Err(Error::Config(format!(
                    "Remote embedding provider requires the '{}' environment variable",
                    self.embedding.api_key_env
                ))),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_size == 0 {
            return Err(Error::Config(
                "chunk.max_size must be greater than zero".to_string(),
            ));
        }

        if self.chunk.overlap >= self.chunk.max_size {
            return Err(Error::Config(
                "chunk.overlap must be < chunk.max_size".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be greater than zero".to_string(),
            ));
        }

        if self.query.top_k == 0 {
            return Err(Error::Config(
                "query.top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
