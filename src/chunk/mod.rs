//! Chunk assembly
//!
//! This module maps loaded documents through the text splitter while:
//! - Tagging every chunk with its document's source identifier
//! - Numbering chunks per document with a zero-based sequence index
//! - Computing stable content hashes for record identity
//!
//! Document order and within-document chunk order are both preserved;
//! chunks from different documents are never merged.

mod splitter;

pub use splitter::*;

use crate::load::Document;
use blake3::Hasher;

/// A bounded-size chunk of a source document with provenance.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The actual text content
    pub text: String,

    /// Source identifier of the originating document
    pub source_id: String,

    /// Zero-based position within the originating document
    pub sequence_index: usize,

    /// Length in characters
    pub char_length: usize,

    /// Blake3 hash of source_id and text; stable across re-ingestion because
    /// the splitter's boundaries are deterministic
    pub hash: String,
}

impl Chunk {
    /// Compute the stable hash for a chunk of a given document.
    pub fn compute_hash(source_id: &str, text: &str) -> String {
        let mut hasher = Hasher::new();
        hasher.update(source_id.as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Split every document and collect the chunks in document order, then chunk
/// order within each document.
pub fn assemble(documents: &[Document], splitter: &TextSplitter) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for doc in documents {
        for (sequence_index, text) in splitter.split(&doc.content).into_iter().enumerate() {
            let char_length = text.chars().count();
            let hash = Chunk::compute_hash(&doc.source_id, &text);
            chunks.push(Chunk {
                text,
                source_id: doc.source_id.clone(),
                sequence_index,
                char_length,
                hash,
            });
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(
            max_size,
            overlap,
            vec!["\n\n".to_string(), " ".to_string(), String::new()],
        )
        .unwrap()
    }

    fn doc(source_id: &str, content: &str) -> Document {
        Document::new(content.to_string(), source_id.to_string())
    }

    #[test]
    fn test_assemble_tags_provenance_and_sequence() {
        let docs = vec![
            doc("a.txt", "alpha one\n\nalpha two\n\nalpha three"),
            doc("b.txt", "beta only"),
        ];
        let chunks = assemble(&docs, &splitter(12, 0));

        assert!(chunks.len() > 2);

        // All a.txt chunks come first, in sequence order
        let a_chunks: Vec<&Chunk> = chunks.iter().filter(|c| c.source_id == "a.txt").collect();
        for (i, chunk) in a_chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
        }

        // sequence_index restarts per document
        let b_chunks: Vec<&Chunk> = chunks.iter().filter(|c| c.source_id == "b.txt").collect();
        assert_eq!(b_chunks.len(), 1);
        assert_eq!(b_chunks[0].sequence_index, 0);
        assert_eq!(b_chunks[0].text, "beta only");

        // document order preserved in the flat sequence
        let first_b = chunks.iter().position(|c| c.source_id == "b.txt").unwrap();
        assert!(chunks[..first_b].iter().all(|c| c.source_id == "a.txt"));
    }

    #[test]
    fn test_char_length_matches_text() {
        let docs = vec![doc("u.txt", "coração valente\n\nmaçã verde")];
        let chunks = assemble(&docs, &splitter(16, 0));
        for chunk in &chunks {
            assert_eq!(chunk.char_length, chunk.text.chars().count());
        }
    }

    #[test]
    fn test_empty_document_produces_no_chunks() {
        let docs = vec![doc("empty.txt", ""), doc("full.txt", "content")];
        let chunks = assemble(&docs, &splitter(100, 10));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_id, "full.txt");
    }

    #[test]
    fn test_hash_is_stable_and_distinguishes_sources() {
        let h1 = Chunk::compute_hash("a.txt", "same text");
        let h2 = Chunk::compute_hash("a.txt", "same text");
        let h3 = Chunk::compute_hash("b.txt", "same text");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_reingestion_yields_identical_chunks() {
        let docs = vec![doc("r.txt", "word ".repeat(200).as_str())];
        let s = splitter(50, 10);
        let first = assemble(&docs, &s);
        let second = assemble(&docs, &s);
        assert_eq!(first, second);
    }
}
