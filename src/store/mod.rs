//! SQLite-backed vector store
//!
//! This module persists (chunk, vector, metadata) records in named
//! collections and answers top-k cosine-similarity queries over them:
//! - Collection management with fixed dimensionality per collection
//! - Transactional batch insert (a reader sees pre-insert or fully
//!   post-insert state, never a partial batch)
//! - Nearest-first search with deterministic insertion-order tie-breaks
//!
//! The storage engine is SQLite via sqlx; the indexing and search logic on
//! top of it lives here.

mod schema;

pub use schema::*;

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Metadata stored with each record: a fixed set of known fields plus an
/// explicitly typed extension map, so field-name typos cannot silently
/// propagate into the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Source identifier of the originating document
    pub source: String,

    /// Additional loader- or caller-supplied fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RecordMetadata {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// A record ready to be inserted into a collection.
/// Owned exclusively by the store once inserted.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl ChunkRecord {
    pub fn new(chunk: Chunk, vector: Vec<f32>, metadata: RecordMetadata) -> Self {
        Self {
            chunk,
            vector,
            metadata,
        }
    }

    /// Stable record ID derived from the chunk hash, so re-ingesting the
    /// same content updates in place instead of duplicating.
    pub fn record_id(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, self.chunk.hash.as_bytes())
    }
}

/// A single search result, nearest-first in the returned sequence.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub source_id: String,
    pub text: String,
    pub sequence_index: usize,
    pub metadata: RecordMetadata,
    pub distance: f32,
}

/// Information about a collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub dimension: usize,
    pub model: String,
    pub records: usize,
}

#[derive(Debug, FromRow)]
struct CollectionRow {
    id: i64,
    name: String,
    dimension: i64,
    model: String,
}

#[derive(Debug, FromRow)]
struct RecordRow {
    source_id: String,
    sequence_index: i64,
    chunk_text: String,
    vector: Vec<u8>,
    metadata_json: Option<String>,
    insert_order: i64,
}

/// Vector store handle
#[derive(Clone)]
pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    /// Open (creating if missing) the vector database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        debug!("Opening vector store at {:?}", path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a collection if it does not exist, returning its info.
    ///
    /// An existing collection with a different dimensionality is an error:
    /// index-time and query-time embedding dimensions must agree.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        model: &str,
    ) -> Result<CollectionInfo> {
        if let Some(existing) = self.collection(name).await? {
            if existing.dimension != dimension {
                return Err(Error::DimensionMismatch {
                    expected: existing.dimension,
                    got: dimension,
                });
            }
            return Ok(existing);
        }

        info!("Creating collection '{}' with dimension {}", name, dimension);

        sqlx::query(
            r#"
            INSERT INTO collections (name, dimension, model, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(dimension as i64)
        .bind(model)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.collection(name)
            .await?
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Look up a collection by name with its record count.
    pub async fn collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "SELECT id, name, dimension, model FROM collections WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM records WHERE collection_id = ?")
                .bind(row.id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Some(CollectionInfo {
            id: row.id,
            name: row.name,
            dimension: row.dimension as usize,
            model: row.model,
            records: count.0 as usize,
        }))
    }

    /// List all collections.
    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM collections ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        let mut infos = Vec::with_capacity(names.len());
        for (name,) in names {
            if let Some(info) = self.collection(&name).await? {
                infos.push(info);
            }
        }
        Ok(infos)
    }

    /// Append a batch of records to a collection.
    ///
    /// Dimensionality is validated up front, before anything is written. The
    /// whole batch commits in one transaction: concurrent writers are
    /// serialized and a failed batch leaves no partial state behind.
    /// Re-inserting a record with the same chunk hash updates it in place,
    /// keeping its original insert order.
    pub async fn insert_batch(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let info = self
            .collection(collection)
            .await?
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        for record in &records {
            if record.vector.len() != info.dimension {
                return Err(Error::DimensionMismatch {
                    expected: info.dimension,
                    got: record.vector.len(),
                });
            }
        }

        debug!(
            "Inserting {} records into collection '{}'",
            records.len(),
            collection
        );

        let mut conn = self.pool.acquire().await?;

        // Take the write lock before reading MAX(insert_order): a deferred
        // transaction would let two writers read the same high-water mark and
        // then fail with a busy snapshot on upgrade. With the immediate lock
        // the second writer queues behind the first.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let outcome = Self::write_records(&mut conn, info.id, &records).await;
        match outcome {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn write_records(
        conn: &mut sqlx::SqliteConnection,
        collection_id: i64,
        records: &[ChunkRecord],
    ) -> Result<()> {
        let next_order: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(insert_order), -1) + 1 FROM records WHERE collection_id = ?",
        )
        .bind(collection_id)
        .fetch_one(&mut *conn)
        .await?;

        let now = Utc::now().to_rfc3339();
        for (offset, record) in records.iter().enumerate() {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO records
                    (id, collection_id, source_id, sequence_index, chunk_text, chunk_hash,
                     vector, metadata_json, insert_order, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    source_id = excluded.source_id,
                    sequence_index = excluded.sequence_index,
                    chunk_text = excluded.chunk_text,
                    chunk_hash = excluded.chunk_hash,
                    vector = excluded.vector,
                    metadata_json = excluded.metadata_json
                "#,
            )
            .bind(record.record_id().to_string())
            .bind(collection_id)
            .bind(&record.chunk.source_id)
            .bind(record.chunk.sequence_index as i64)
            .bind(&record.chunk.text)
            .bind(&record.chunk.hash)
            .bind(encode_vector(&record.vector))
            .bind(&metadata_json)
            .bind(next_order.0 + offset as i64)
            .bind(&now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Durably flush staged state to storage.
    ///
    /// After this returns, a fresh process opening the same path sees all
    /// inserted records.
    pub async fn persist(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Return the `min(k, collection_size)` records nearest to `vector` by
    /// cosine distance, nearest first, ties broken by insertion order.
    ///
    /// A missing collection is an error distinct from an empty one: the
    /// former means ingestion has never run, the latter returns an empty
    /// result.
    pub async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let info = self
            .collection(collection)
            .await?
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        if vector.len() != info.dimension {
            return Err(Error::DimensionMismatch {
                expected: info.dimension,
                got: vector.len(),
            });
        }

        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT source_id, sequence_index, chunk_text, vector, metadata_json, insert_order
            FROM records
            WHERE collection_id = ?
            ORDER BY insert_order
            "#,
        )
        .bind(info.id)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            "Scanning {} records in collection '{}' for top-{}",
            rows.len(),
            collection,
            k
        );

        let mut scored: Vec<(f32, i64, RecordRow)> = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = decode_vector(&row.vector)?;
            let distance = cosine_distance(vector, &stored);
            scored.push((distance, row.insert_order, row));
        }

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .map(|(distance, _, row)| {
                let metadata = row
                    .metadata_json
                    .as_deref()
                    .and_then(|j| serde_json::from_str(j).ok())
                    .unwrap_or_default();
                SearchHit {
                    source_id: row.source_id,
                    text: row.chunk_text,
                    sequence_index: row.sequence_index as usize,
                    metadata,
                    distance,
                }
            })
            .collect();

        Ok(hits)
    }
}

/// Encode a vector as little-endian f32 bytes.
fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a vector.
fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::Other(format!(
            "corrupt vector blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine distance: `1 - cos(a, b)`. Zero-norm vectors compare as maximally
/// distant rather than dividing by zero.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use tempfile::TempDir;

    fn record(source_id: &str, text: &str, index: usize, vector: Vec<f32>) -> ChunkRecord {
        let hash = Chunk::compute_hash(source_id, text);
        ChunkRecord::new(
            Chunk {
                text: text.to_string(),
                source_id: source_id.to_string(),
                sequence_index: index,
                char_length: text.chars().count(),
                hash,
            },
            vector,
            RecordMetadata::from_source(source_id),
        )
    }

    async fn store_in(tmp: &TempDir) -> VectorStore {
        VectorStore::open(&tmp.path().join("vectors.db"))
            .await
            .unwrap()
    }

    #[test]
    fn test_vector_codec_round_trip() {
        let vector = vec![0.25f32, -1.5, 3.0, 0.0];
        assert_eq!(decode_vector(&encode_vector(&vector)).unwrap(), vector);
        assert!(decode_vector(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_cosine_distance() {
        assert!((cosine_distance(&[1.0, 0.0], &[1.0, 0.0])).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        // zero vectors never divide by zero
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn test_round_trip_persistence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vectors.db");

        {
            let store = VectorStore::open(&path).await.unwrap();
            store.ensure_collection("docs", 3, "stub").await.unwrap();
            store
                .insert_batch(
                    "docs",
                    vec![
                        record("a.txt", "first chunk", 0, vec![1.0, 0.0, 0.0]),
                        record("a.txt", "second chunk", 1, vec![0.0, 1.0, 0.0]),
                    ],
                )
                .await
                .unwrap();
            store.persist().await.unwrap();
        }

        // Fresh handle over the same path sees everything
        let reopened = VectorStore::open(&path).await.unwrap();
        let info = reopened.collection("docs").await.unwrap().unwrap();
        assert_eq!(info.records, 2);
        assert_eq!(info.dimension, 3);

        let hits = reopened.query("docs", &[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "first chunk");
        assert_eq!(hits[0].metadata.source, "a.txt");
    }

    #[tokio::test]
    async fn test_top_k_correctness() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 3, "stub").await.unwrap();

        // Known distances to the query [1, 0, 0]:
        // exact = 0, near ~= 0.006, diag ~= 0.293, orth = 1, opposite = 2
        store
            .insert_batch(
                "docs",
                vec![
                    record("d", "orthogonal", 0, vec![0.0, 1.0, 0.0]),
                    record("d", "opposite", 1, vec![-1.0, 0.0, 0.0]),
                    record("d", "exact", 2, vec![1.0, 0.0, 0.0]),
                    record("d", "near", 3, vec![0.9, 0.1, 0.0]),
                    record("d", "diagonal", 4, vec![0.5, 0.5, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("docs", &[1.0, 0.0, 0.0], 3).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "near", "diagonal"]);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[tokio::test]
    async fn test_ties_break_by_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 2, "stub").await.unwrap();

        store
            .insert_batch(
                "docs",
                vec![
                    record("d", "inserted first", 0, vec![0.0, 1.0]),
                    record("d", "inserted second", 1, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("docs", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].text, "inserted first");
        assert_eq!(hits[1].text, "inserted second");
    }

    #[tokio::test]
    async fn test_empty_collection_returns_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("empty", 2, "stub").await.unwrap();

        let hits = store.query("empty", &[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_missing_collection_is_distinct_error() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;

        let result = store.query("nowhere", &[1.0, 0.0], 5).await;
        assert!(matches!(result, Err(Error::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_rejects_dimension_mismatch_atomically() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 3, "stub").await.unwrap();

        let result = store
            .insert_batch(
                "docs",
                vec![
                    record("d", "good", 0, vec![1.0, 0.0, 0.0]),
                    record("d", "bad", 1, vec![1.0, 0.0]),
                ],
            )
            .await;
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));

        // Nothing from the failed batch is visible
        let info = store.collection("docs").await.unwrap().unwrap();
        assert_eq!(info.records, 0);
    }

    #[tokio::test]
    async fn test_query_rejects_dimension_mismatch() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 3, "stub").await.unwrap();

        let result = store.query("docs", &[1.0, 0.0], 5).await;
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_reinsert_same_chunk_updates_in_place() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 2, "stub").await.unwrap();

        store
            .insert_batch("docs", vec![record("d", "same text", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .insert_batch("docs", vec![record("d", "same text", 0, vec![0.0, 1.0])])
            .await
            .unwrap();

        let info = store.collection("docs").await.unwrap().unwrap();
        assert_eq!(info.records, 1);

        let hits = store.query("docs", &[0.0, 1.0], 1).await.unwrap();
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_concurrent_insert_batches_both_commit() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 2, "stub").await.unwrap();

        let first = store.clone();
        let second = store.clone();
        let (r1, r2) = tokio::join!(
            first.insert_batch("docs", vec![record("a", "from writer one", 0, vec![1.0, 0.0])]),
            second.insert_batch("docs", vec![record("b", "from writer two", 0, vec![0.0, 1.0])]),
        );
        r1.unwrap();
        r2.unwrap();

        let info = store.collection("docs").await.unwrap().unwrap();
        assert_eq!(info.records, 2);

        // Both writers got distinct insert orders
        let hits = store.query("docs", &[1.0, 1.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_ne!(hits[0].text, hits[1].text);
    }

    #[tokio::test]
    async fn test_ensure_collection_rejects_changed_dimension() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 3, "stub").await.unwrap();

        let result = store.ensure_collection("docs", 5, "stub").await;
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_k_larger_than_collection() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp).await;
        store.ensure_collection("docs", 2, "stub").await.unwrap();
        store
            .insert_batch("docs", vec![record("d", "only", 0, vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.query("docs", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
