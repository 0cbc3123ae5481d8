//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection holding the indexed owner's manual.
pub const COLLECTION_NAME: &str = "patriot_manual";

/// Configuration for a knowledge collection (`config.yaml` next to the index).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseConfig {
    /// Name of the collection
    pub name: String,

    /// Embedding provider ("openai", "ollama", "trigram")
    pub provider: String,

    /// Embedding model
    pub model: String,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between neighbouring chunks, in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Texts sent per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_embedding_dim() -> usize {
    1536
}

fn default_batch_size() -> usize {
    100
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: COLLECTION_NAME.to_string(),
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_dim: default_embedding_dim(),
            batch_size: default_batch_size(),
        }
    }
}

/// A text chunk of the manual with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Zero-based page the chunk was cut from
    pub page: u32,

    /// Position within the whole manual
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Metadata (byte range within the page, source file)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl KnowledgeChunk {
    /// One-based page number as printed in the manual.
    pub fn page_number(&self) -> u32 {
        self.page + 1
    }
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCandidate {
    /// Zero-based page index
    pub page: u32,
    /// Global order across the manual
    pub position: u32,
    pub text: String,
    /// Byte range within the page text
    pub byte_range: (usize, usize),
}

/// Options for building the manual index.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Collection name
    pub collection: String,

    /// Drop and rebuild even when the stored fingerprint matches
    pub reindex: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            collection: COLLECTION_NAME.to_string(),
            reindex: false,
        }
    }
}

/// Statistics from an index operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Pages in the manual
    pub pages: u32,

    /// Chunks stored in the index
    pub chunks: u32,

    /// Whether the existing index was reused as-is
    pub reused: bool,

    /// Fingerprint the index was built for
    pub fingerprint: String,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a stored collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    /// Collection name
    pub collection: String,

    /// Distinct pages with at least one chunk
    pub pages_count: u32,

    /// Number of chunks
    pub chunks_count: u32,

    /// Database size in bytes
    pub db_size_bytes: u64,

    /// Embedding provider recorded in the collection config
    pub embedding_provider: String,

    /// Embedding model recorded in the collection config
    pub embedding_model: String,

    /// Stored fingerprint, if the index was ever completed
    pub fingerprint: Option<String>,

    /// When the index was last completed
    pub indexed_at: Option<DateTime<Utc>>,
}

/// A scored semantic search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk text followed by its page reference
    pub content: String,

    /// Cosine distance (lower is closer)
    pub score: f32,

    /// One-based page number
    pub page: u32,

    /// Chunk metadata as stored in the index
    pub metadata: serde_json::Value,
}
