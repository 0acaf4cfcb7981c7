//! SQLite schema definition for the vector store

/// SQL schema for the vector database
pub const SCHEMA_SQL: &str = r#"
-- Collections: named, fixed-dimensionality vector collections
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    dimension INTEGER NOT NULL,
    model TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Records: one embedded chunk per row, owned exclusively by the store
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    collection_id INTEGER NOT NULL REFERENCES collections(id),
    source_id TEXT NOT NULL,
    sequence_index INTEGER NOT NULL,
    chunk_text TEXT NOT NULL,
    chunk_hash TEXT NOT NULL,
    vector BLOB NOT NULL,
    metadata_json TEXT,
    insert_order INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection_id);
CREATE INDEX IF NOT EXISTS idx_records_order ON records(collection_id, insert_order);
CREATE INDEX IF NOT EXISTS idx_records_hash ON records(chunk_hash);
"#;
