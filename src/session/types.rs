//! Chunked-upload session types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extraction::{ExtractionError, FileFormat};

// ============================================================================
// Constants
// ============================================================================

/// Separator between per-chunk texts in the reassembled document
pub const CHUNK_SEPARATOR: &str = "\n\n";

// ============================================================================
// Wire Types
// ============================================================================

/// Metadata the client sends with every chunk request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Client-side identifier for this chunk (logging only)
    pub chunk_id: String,

    /// 0-based position of this chunk in the document
    pub chunk_index: usize,

    /// Total number of chunks the document was split into
    pub total_chunks: usize,

    /// Identifier of the logical document this chunk belongs to
    pub document_id: String,

    /// Original file name
    pub file_name: String,

    /// Claimed format label (extension or MIME type)
    pub file_type: String,

    /// Total size of the original file in bytes
    pub total_size: u64,

    /// Declared size of this chunk in bytes
    pub chunk_size: u64,
}

// ============================================================================
// Session State
// ============================================================================

/// What got stored for one chunk.
///
/// Plain-text chunks are extracted on arrival; for binary container formats
/// a byte range is not an independently parseable document, so the raw bytes
/// are kept and extraction runs once over the reassembled stream.
#[derive(Debug, Clone)]
pub enum ChunkPayload {
    Text {
        text: String,
        page_count: u32,
        strategy: &'static str,
    },
    Binary(Vec<u8>),
}

/// Extraction outcome for one chunk, keyed by its index in the session
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub payload: ChunkPayload,
    pub byte_len: usize,
}

/// Observable session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No chunks recorded yet
    Created,
    /// Some but not all chunks recorded
    Accumulating,
}

/// Server-side state for one in-flight chunked upload
#[derive(Debug)]
pub struct ProcessingSession {
    pub document_id: String,
    pub file_name: String,
    pub format: FileFormat,
    pub total_size: u64,
    pub total_chunks: usize,
    pub declared_chunk_size: u64,

    /// Recorded chunks by index. Distinct keys, arrival order irrelevant.
    chunks: HashMap<usize, ChunkRecord>,

    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,

    /// Set at the instant the session completes or is cancelled; guards
    /// handles that raced with removal from the store.
    finished: bool,
}

impl ProcessingSession {
    /// Initialize from the first chunk's metadata.
    pub fn new(metadata: &ChunkMetadata, format: FileFormat, now: DateTime<Utc>) -> Self {
        Self {
            document_id: metadata.document_id.clone(),
            file_name: metadata.file_name.clone(),
            format,
            total_size: metadata.total_size,
            total_chunks: metadata.total_chunks,
            declared_chunk_size: metadata.chunk_size,
            chunks: HashMap::new(),
            created_at: now,
            last_activity: now,
            finished: false,
        }
    }

    /// Number of distinct chunk indices recorded. Never a separate counter,
    /// so resubmitting an index cannot double-count.
    pub fn processed_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_complete(&self) -> bool {
        self.processed_chunks() == self.total_chunks
    }

    pub fn state(&self) -> SessionState {
        if self.chunks.is_empty() {
            SessionState::Created
        } else {
            SessionState::Accumulating
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// Store a chunk at its index, overwriting any prior record there.
    pub fn record_chunk(&mut self, index: usize, record: ChunkRecord, now: DateTime<Utc>) {
        self.chunks.insert(index, record);
        self.last_activity = now;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn chunk(&self, index: usize) -> Option<&ChunkRecord> {
        self.chunks.get(&index)
    }

    /// Later chunks must agree with the metadata that created the session.
    pub fn check_consistent(&self, metadata: &ChunkMetadata) -> Result<(), SessionError> {
        if metadata.total_chunks != self.total_chunks {
            return Err(SessionError::Conflict(format!(
                "totalChunks changed from {} to {}",
                self.total_chunks, metadata.total_chunks
            )));
        }
        if metadata.file_name != self.file_name {
            return Err(SessionError::Conflict(format!(
                "fileName changed from '{}' to '{}'",
                self.file_name, metadata.file_name
            )));
        }
        if FileFormat::from_label(&metadata.file_type) != self.format {
            return Err(SessionError::Conflict(format!(
                "fileType changed from '{}' to '{}'",
                self.format, metadata.file_type
            )));
        }
        Ok(())
    }

    /// Completion percentage and time-remaining estimate.
    pub fn progress(&self, now: DateTime<Utc>) -> ProgressReport {
        let processed = self.processed_chunks();
        let total = self.total_chunks;
        let percentage = if total == 0 {
            100
        } else {
            ((100.0 * processed as f64 / total as f64).round()) as u8
        };

        let estimated_time_remaining = if processed == 0 {
            None
        } else {
            let elapsed_ms = (now - self.created_at).num_milliseconds().max(0) as f64;
            let avg_per_chunk = elapsed_ms / processed as f64;
            let remaining_ms = avg_per_chunk * (total - processed) as f64;
            Some((remaining_ms / 1000.0).round() as u64)
        };

        ProgressReport {
            processed_chunks: processed,
            total_chunks: total,
            percentage,
            estimated_time_remaining,
        }
    }
}

/// Snapshot of how far along a session is
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub processed_chunks: usize,
    pub total_chunks: usize,
    pub percentage: u8,
    /// Seconds; absent until at least one chunk has been recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<u64>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Chunked-upload errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no active session for document '{0}'")]
    NotFound(String),

    #[error("chunk index {index} out of range for {total} chunks")]
    InvalidChunkIndex { index: usize, total: usize },

    #[error("chunk of {actual} bytes exceeds declared size of {declared} bytes")]
    OversizedChunk { actual: usize, declared: u64 },

    #[error("chunk metadata conflicts with existing session: {0}")]
    Conflict(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
