//! Flat JSON export of embedded chunks
//!
//! Used when persistence is deferred to an external system instead of the
//! built-in vector store. The field names (`fonte`, `texto`, `vetor`) are
//! fixed by the export format consumers already ingest.

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One exported record per chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Source identifier of the originating document
    pub fonte: String,

    /// Chunk text
    pub texto: String,

    /// Embedding vector; absent or empty in files that have not been
    /// vectorized yet
    #[serde(default)]
    pub vetor: Vec<f32>,
}

/// Pair chunks with their vectors and write them as a pretty-printed JSON
/// array. Counts must match: a dropped vector would silently misalign every
/// record after it.
pub fn export_records(chunks: &[Chunk], vectors: &[Vec<f32>], path: &Path) -> Result<()> {
    if chunks.len() != vectors.len() {
        return Err(Error::Other(format!(
            "cannot export: {} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )));
    }

    let records: Vec<ExportRecord> = chunks
        .iter()
        .zip(vectors.iter())
        .map(|(chunk, vector)| ExportRecord {
            fonte: chunk.source_id.clone(),
            texto: chunk.text.clone(),
            vetor: vector.clone(),
        })
        .collect();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json)?;

    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a previously exported JSON file back into records.
///
/// Accepts files with or without `vetor` fields, so a chunk file produced
/// before vectorization can be fed back through the embedding step.
pub fn load_export_records(path: &Path) -> Result<Vec<ExportRecord>> {
    if !path.exists() {
        return Err(Error::InvalidPath(format!(
            "no such file: {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<ExportRecord> = serde_json::from_str(&raw)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(source_id: &str, text: &str, index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_id: source_id.to_string(),
            sequence_index: index,
            char_length: text.chars().count(),
            hash: Chunk::compute_hash(source_id, text),
        }
    }

    #[test]
    fn test_export_field_names_and_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");

        let chunks = vec![chunk("regras.txt", "Artigo 1: Integridade.", 0)];
        let vectors = vec![vec![0.1f32, 0.2, 0.3]];

        export_records(&chunks, &vectors, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"fonte\""));
        assert!(raw.contains("\"texto\""));
        assert!(raw.contains("\"vetor\""));

        let parsed: Vec<ExportRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].fonte, "regras.txt");
        assert_eq!(parsed[0].texto, "Artigo 1: Integridade.");
        assert_eq!(parsed[0].vetor, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_export_preserves_non_ascii() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");

        let chunks = vec![chunk("ética.txt", "não é proibido", 0)];
        export_records(&chunks, &[vec![1.0]], &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("não é proibido"));
    }

    #[test]
    fn test_load_records_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");

        let chunks = vec![chunk("a.txt", "primeiro", 0), chunk("a.txt", "segundo", 1)];
        let vectors = vec![vec![1.0f32, 0.0], vec![0.0, 1.0]];
        export_records(&chunks, &vectors, &path).unwrap();

        let loaded = load_export_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].texto, "primeiro");
        assert_eq!(loaded[1].vetor, vec![0.0, 1.0]);
    }

    #[test]
    fn test_load_records_without_vectors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chunks.json");
        std::fs::write(
            &path,
            r#"[{"fonte": "regras.txt", "texto": "Artigo 1"},
                {"fonte": "regras.txt", "texto": "Artigo 2"}]"#,
        )
        .unwrap();

        let loaded = load_export_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|r| r.vetor.is_empty()));
    }

    #[test]
    fn test_load_records_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(load_export_records(&tmp.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_export_rejects_mismatched_lengths() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");

        let chunks = vec![chunk("a.txt", "one", 0), chunk("a.txt", "two", 1)];
        let result = export_records(&chunks, &[vec![1.0]], &path);
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
