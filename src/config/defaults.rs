//! Default values for configuration

/// Default collection name
pub fn default_collection_name() -> String {
    "ragdex_docs".to_string()
}

/// Default embedding model (sentence-transformers/all-MiniLM-L6-v2)
pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

/// Default embedding dimension for all-MiniLM-L6-v2
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding requests
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default per-batch embedding timeout in seconds
pub fn default_embedding_timeout() -> u64 {
    60
}

/// Default remote embedding endpoint
pub fn default_embedding_endpoint() -> String {
    std::env::var("RAGDEX_EMBEDDING_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080/v1/embeddings".to_string())
}

/// Default environment variable holding the remote provider credential
pub fn default_api_key_env() -> String {
    "RAGDEX_API_KEY".to_string()
}

/// Default maximum characters per chunk
pub fn default_chunk_max_size() -> usize {
    1000
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    200
}

/// Default separator priority list for recursive splitting
pub fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        ". ".to_string(),
        " ".to_string(),
        String::new(),
    ]
}

/// Default number of query results
pub fn default_query_top_k() -> usize {
    3
}
