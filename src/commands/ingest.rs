//! Ingest command implementation

use crate::chunk::{assemble, Chunk, TextSplitter};
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::export::{export_records, load_export_records, ExportRecord};
use crate::load::load_documents;
use crate::store::{ChunkRecord, RecordMetadata, VectorStore};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Options for an ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Directory containing .txt / .pdf input files
    pub input_dir: Option<PathBuf>,

    /// Re-embed chunk records from a previously exported JSON file
    /// instead of loading and splitting raw documents
    pub from_json: Option<PathBuf>,

    /// Target collection (defaults to the configured one)
    pub collection: Option<String>,

    /// Export embedded chunks to this JSON file instead of the store
    pub export_json: Option<PathBuf>,
}

/// Statistics from an ingestion run
#[derive(Debug, Default, Serialize)]
pub struct IngestStats {
    pub docs_loaded: usize,
    pub chunks_created: usize,
    pub records_inserted: usize,
    pub warnings: Vec<String>,
}

/// Ingest chunks: load, split (or re-read exported chunk JSON), embed, index.
///
/// Embedding and indexing proceed batch by batch; every batch is committed
/// before the next one is embedded, so a provider failure mid-run leaves the
/// collection at a prefix of completed batches.
pub async fn cmd_ingest(
    config: &Config,
    store: &VectorStore,
    embedder: &dyn Embedder,
    options: IngestOptions,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    let chunks = if let Some(json_path) = &options.from_json {
        info!("Re-ingesting chunk records from {}", json_path.display());

        let records = load_export_records(json_path)?;
        stats.docs_loaded = records
            .iter()
            .map(|r| r.fonte.as_str())
            .collect::<HashSet<_>>()
            .len();
        chunks_from_export(&records)
    } else {
        let input_dir = options.input_dir.as_deref().ok_or_else(|| {
            Error::Config("ingest needs an input directory or a chunk JSON file".to_string())
        })?;
        let input_dir = canonicalize(input_dir)?;
        info!("Ingesting directory: {}", input_dir.display());

        let outcome = load_documents(&input_dir)?;
        stats.docs_loaded = outcome.documents.len();
        stats.warnings = outcome.warnings;

        if outcome.documents.is_empty() {
            warn!("No supported documents found in {}", input_dir.display());
            return Ok(stats);
        }

        let splitter = TextSplitter::from_config(&config.chunk)?;
        assemble(&outcome.documents, &splitter)
    };
    stats.chunks_created = chunks.len();

    if chunks.is_empty() {
        warn!("Nothing to ingest: no chunks produced");
        return Ok(stats);
    }

    info!(
        "Prepared {} chunks from {} documents",
        stats.chunks_created, stats.docs_loaded
    );

    let timeout = Duration::from_secs(config.embedding.timeout_secs);

    if let Some(export_path) = options.export_json {
        // Persistence deferred to an external system: embed everything and
        // write the flat JSON file instead of touching the store.
        let vectors = crate::embed::embed_in_batches(
            embedder,
            chunks.iter().map(|c| c.text.clone()).collect(),
            config.embedding.batch_size,
            timeout,
        )
        .await?;
        export_records(&chunks, &vectors, &export_path)?;
        stats.records_inserted = chunks.len();
        return Ok(stats);
    }

    let collection = options
        .collection
        .unwrap_or_else(|| config.collection_name.clone());
    store
        .ensure_collection(&collection, embedder.dimension(), embedder.model_name())
        .await?;

    let progress = ProgressBar::new(chunks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} chunks embedded")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for batch in chunks.chunks(config.embedding.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = match tokio::time::timeout(timeout, embedder.embed(texts)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "Embedding timed out; {} records from earlier batches remain indexed",
                    stats.records_inserted
                );
                return Err(Error::EmbeddingTimeout(timeout.as_secs()));
            }
        };

        if vectors.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "provider returned {} embeddings for a batch of {}",
                vectors.len(),
                batch.len()
            )));
        }

        let records: Vec<ChunkRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| make_record(chunk.clone(), vector))
            .collect();

        let inserted = records.len();
        store.insert_batch(&collection, records).await?;
        stats.records_inserted += inserted;
        progress.inc(inserted as u64);
    }
    progress.finish_and_clear();

    store.persist().await?;

    info!(
        "Ingestion complete: {} docs, {} chunks, {} records in '{}'",
        stats.docs_loaded, stats.chunks_created, stats.records_inserted, collection
    );

    Ok(stats)
}

/// Turn exported records back into chunks, renumbering sequence indexes
/// per source in file order.
fn chunks_from_export(records: &[ExportRecord]) -> Vec<Chunk> {
    let mut next_index: HashMap<&str, usize> = HashMap::new();
    records
        .iter()
        .map(|record| {
            let counter = next_index.entry(record.fonte.as_str()).or_insert(0);
            let sequence_index = *counter;
            *counter += 1;
            Chunk {
                hash: Chunk::compute_hash(&record.fonte, &record.texto),
                text: record.texto.clone(),
                source_id: record.fonte.clone(),
                sequence_index,
                char_length: record.texto.chars().count(),
            }
        })
        .collect()
}

fn make_record(chunk: Chunk, vector: Vec<f32>) -> ChunkRecord {
    let metadata = RecordMetadata::from_source(chunk.source_id.clone());
    ChunkRecord::new(chunk, vector, metadata)
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| Error::InvalidPath(format!("{}: {}", path.display(), e)))
}

/// Print a human-readable ingestion summary.
pub fn print_ingest_stats(stats: &IngestStats) {
    println!("\n✓ Ingestion complete");
    println!("  Documents loaded: {}", stats.docs_loaded);
    println!("  Chunks created:   {}", stats.chunks_created);
    println!("  Records indexed:  {}", stats.records_inserted);

    if !stats.warnings.is_empty() {
        println!("\n⚠ {} file(s) skipped:", stats.warnings.len());
        for warning in &stats.warnings {
            println!("  - {}", warning);
        }
    }
}
