use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::industry::Industry;

/// One page of extracted PDF text plus its retrieval metadata.
///
/// Chunks are created once during ingestion and never mutated afterwards;
/// the industry tag is the only field queries filter on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub industry: Industry,
    pub source_file: String,
    pub source_page: u32,
    pub text: String,
}

impl DocumentChunk {
    pub fn new(
        document_id: &str,
        industry: Industry,
        source_file: &str,
        source_page: u32,
        text: String,
    ) -> Self {
        Self {
            chunk_id: make_chunk_id(document_id, source_page, &text),
            document_id: document_id.to_string(),
            industry,
            source_file: source_file.to_string(),
            source_page,
            text,
        }
    }
}

fn make_chunk_id(document_id: &str, page: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub document_id: String,
    pub file_name: String,
    pub industry: Industry,
    pub pages: usize,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// A retrieved chunk with its similarity score, ranked best-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Outcome of a question, including the zero-retrieval case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub industry: Industry,
    pub sources_found: usize,
}
