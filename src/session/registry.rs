//! Chunk session registry
//!
//! Process-wide map from document id to in-flight chunked-upload state:
//! get-or-create on first chunk, per-chunk validation and recording,
//! synchronous reassembly on completion, and deletion at the instant the
//! final payload is produced.
//!
//! All mutation of one session happens under that session's own mutex, so
//! concurrent requests for the same document serialize and the
//! complete -> reassemble -> delete transition delivers the final document
//! exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::extraction::{verify, ExtractionPipeline, FileFormat};

use super::store::SessionStore;
use super::types::{
    ChunkMetadata, ChunkPayload, ChunkRecord, ProcessingSession, ProgressReport, SessionError,
    SessionState, CHUNK_SEPARATOR,
};

// ============================================================================
// Outcome Types
// ============================================================================

/// Result of accepting one chunk
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Recorded, session still accumulating
    Accepted {
        progress: ProgressReport,
        current_chunk: usize,
    },
    /// This chunk completed the session; the final document is attached and
    /// the session is gone.
    Complete(AssembledDocument),
}

/// The reassembled document produced when a session completes
#[derive(Debug)]
pub struct AssembledDocument {
    pub document_id: String,
    pub file_name: String,
    pub format: FileFormat,
    pub total_size: u64,
    pub text: String,
    pub page_count: u32,
    pub strategy: &'static str,
}

/// Read-only view for the status query
#[derive(Debug)]
pub struct SessionStatusView {
    pub document_id: String,
    pub state: SessionState,
    pub progress: ProgressReport,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub elapsed_secs: u64,
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Clone)]
pub struct ChunkRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    store: Arc<dyn SessionStore>,
    pipeline: Arc<ExtractionPipeline>,
    clock: Arc<dyn Clock>,
    /// Allowed overshoot of a chunk over its declared size (0.10 = 10%)
    chunk_size_tolerance: f64,
}

impl ChunkRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        pipeline: Arc<ExtractionPipeline>,
        clock: Arc<dyn Clock>,
        chunk_size_tolerance: f64,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                store,
                pipeline,
                clock,
                chunk_size_tolerance,
            }),
        }
    }

    /// Validate, extract/stash, and record one chunk; reassemble when it was
    /// the last missing one.
    pub async fn accept_chunk(
        &self,
        metadata: ChunkMetadata,
        data: Vec<u8>,
    ) -> Result<ChunkOutcome, SessionError> {
        // Structural validation first, before any session is created.
        if metadata.chunk_index >= metadata.total_chunks {
            return Err(SessionError::InvalidChunkIndex {
                index: metadata.chunk_index,
                total: metadata.total_chunks,
            });
        }
        let allowed = metadata.chunk_size as f64 * (1.0 + self.inner.chunk_size_tolerance);
        if data.len() as f64 > allowed {
            return Err(SessionError::OversizedChunk {
                actual: data.len(),
                declared: metadata.chunk_size,
            });
        }

        let format = FileFormat::from_label(&metadata.file_type);
        if format == FileFormat::Unrecognized {
            return Err(crate::extraction::ExtractionError::InvalidFormat(format!(
                "unsupported file type '{}'",
                metadata.file_type
            ))
            .into());
        }
        // Binary containers carry their signature in chunk 0; check it as
        // soon as that chunk shows up, whatever order it arrives in.
        if format != FileFormat::PlainText && metadata.chunk_index == 0 {
            verify(&data, format)?;
        }

        let now = self.inner.clock.now();
        let template = ProcessingSession::new(&metadata, format, now);
        let (handle, created) = self
            .inner
            .store
            .get_or_create(&metadata.document_id, template)
            .await;
        let mut session = handle.lock().await;

        if session.is_finished() {
            // Raced with completion or eviction between map lookup and lock.
            return Err(SessionError::NotFound(metadata.document_id));
        }
        if created {
            tracing::info!(
                document_id = %metadata.document_id,
                file_name = %metadata.file_name,
                format = %format,
                total_chunks = metadata.total_chunks,
                "Created chunk session"
            );
        } else {
            session.check_consistent(&metadata)?;
        }
        session.touch(now);

        let byte_len = data.len();
        let payload = match format {
            FileFormat::PlainText => {
                let result = self.inner.pipeline.extract(data, format).await?;
                ChunkPayload::Text {
                    text: result.text,
                    page_count: result.page_count,
                    strategy: result.strategy,
                }
            }
            // A byte range of a PDF/OOXML container is not a parseable
            // document on its own; hold the bytes and extract once the
            // whole stream is back together.
            _ => ChunkPayload::Binary(data),
        };

        session.record_chunk(
            metadata.chunk_index,
            ChunkRecord { payload, byte_len },
            self.inner.clock.now(),
        );

        tracing::debug!(
            document_id = %metadata.document_id,
            chunk_index = metadata.chunk_index,
            chunk_bytes = byte_len,
            processed = session.processed_chunks(),
            total = session.total_chunks,
            "Chunk recorded"
        );

        if !session.is_complete() {
            let progress = session.progress(self.inner.clock.now());
            return Ok(ChunkOutcome::Accepted {
                progress,
                current_chunk: metadata.chunk_index,
            });
        }

        // Completion: reassemble under the session lock, then delete. The
        // finished flag makes any handle that raced with removal observe
        // SessionNotFound instead of a second delivery.
        session.mark_finished();
        let assembled = self.reassemble(&mut session).await;
        drop(session);
        self.inner.store.remove(&metadata.document_id).await;

        match assembled {
            Ok(document) => {
                tracing::info!(
                    document_id = %document.document_id,
                    file_name = %document.file_name,
                    pages = document.page_count,
                    text_length = document.text.len(),
                    "Chunk session completed and reassembled"
                );
                Ok(ChunkOutcome::Complete(document))
            }
            Err(e) => Err(e),
        }
    }

    /// Merge the recorded chunks in ascending index order.
    async fn reassemble(
        &self,
        session: &mut ProcessingSession,
    ) -> Result<AssembledDocument, SessionError> {
        match session.format {
            FileFormat::PlainText => {
                let mut parts: Vec<&str> = Vec::with_capacity(session.total_chunks);
                let mut page_count = 0u32;
                let mut strategy = "utf8";
                for index in 0..session.total_chunks {
                    // Present by construction: completion was just verified.
                    if let Some(record) = session.chunk(index) {
                        if let ChunkPayload::Text {
                            text,
                            page_count: pages,
                            strategy: chunk_strategy,
                        } = &record.payload
                        {
                            if index == 0 {
                                strategy = *chunk_strategy;
                            }
                            page_count += pages;
                            parts.push(text);
                        }
                    }
                }
                let text = parts.join(CHUNK_SEPARATOR).trim().to_string();
                Ok(AssembledDocument {
                    document_id: session.document_id.clone(),
                    file_name: session.file_name.clone(),
                    format: session.format,
                    total_size: session.total_size,
                    text,
                    page_count,
                    strategy,
                })
            }
            format => {
                let mut bytes = Vec::with_capacity(session.total_size as usize);
                for index in 0..session.total_chunks {
                    if let Some(record) = session.chunk(index) {
                        if let ChunkPayload::Binary(chunk_bytes) = &record.payload {
                            bytes.extend_from_slice(chunk_bytes);
                        }
                    }
                }
                let result = self.inner.pipeline.extract(bytes, format).await?;
                Ok(AssembledDocument {
                    document_id: session.document_id.clone(),
                    file_name: session.file_name.clone(),
                    format,
                    total_size: session.total_size,
                    text: result.text,
                    page_count: result.page_count,
                    strategy: result.strategy,
                })
            }
        }
    }

    /// Progress snapshot for the status query.
    pub async fn status(&self, document_id: &str) -> Result<SessionStatusView, SessionError> {
        let handle = self
            .inner
            .store
            .get(document_id)
            .await
            .ok_or_else(|| SessionError::NotFound(document_id.to_string()))?;
        let session = handle.lock().await;
        if session.is_finished() {
            return Err(SessionError::NotFound(document_id.to_string()));
        }
        let now = self.inner.clock.now();
        Ok(SessionStatusView {
            document_id: session.document_id.clone(),
            state: session.state(),
            progress: session.progress(now),
            created_at: session.created_at,
            last_activity: session.last_activity,
            elapsed_secs: (now - session.created_at).num_seconds().max(0) as u64,
        })
    }

    /// Explicitly cancel a session, dropping all accumulated chunks.
    pub async fn cancel(&self, document_id: &str) -> Result<(), SessionError> {
        let handle = self
            .inner
            .store
            .remove(document_id)
            .await
            .ok_or_else(|| SessionError::NotFound(document_id.to_string()))?;
        let mut session = handle.lock().await;
        session.mark_finished();
        tracing::info!(document_id = %document_id, "Chunk session cancelled");
        Ok(())
    }

    /// Evict sessions inactive for longer than `older_than`.
    pub async fn sweep_expired(&self, older_than: chrono::Duration) -> Vec<String> {
        let cutoff = self.inner.clock.now() - older_than;
        self.inner.store.sweep_expired(cutoff).await
    }

    pub async fn session_count(&self) -> usize {
        self.inner.store.session_count().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use crate::clock::test_support::ManualClock;
    use crate::clock::SystemClock;
    use crate::extraction::error::StrategyError;
    use crate::extraction::strategies::ExtractionStrategy;
    use crate::extraction::types::ExtractionResult;
    use crate::session::store::InMemorySessionStore;

    use super::*;

    fn registry() -> ChunkRegistry {
        ChunkRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ExtractionPipeline::new(StdDuration::from_secs(30))),
            Arc::new(SystemClock),
            0.10,
        )
    }

    fn metadata(document_id: &str, index: usize, total: usize, size: u64) -> ChunkMetadata {
        ChunkMetadata {
            chunk_id: format!("{}-{}", document_id, index),
            chunk_index: index,
            total_chunks: total,
            document_id: document_id.to_string(),
            file_name: "upload.txt".to_string(),
            file_type: "txt".to_string(),
            total_size: 1024,
            chunk_size: size,
        }
    }

    async fn submit(
        registry: &ChunkRegistry,
        document_id: &str,
        index: usize,
        total: usize,
        text: &str,
    ) -> ChunkOutcome {
        registry
            .accept_chunk(
                metadata(document_id, index, total, 64),
                text.as_bytes().to_vec(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reassembles_by_index_not_arrival_order() {
        let registry = registry();

        let outcome = submit(&registry, "doc", 2, 3, "!").await;
        assert!(matches!(
            outcome,
            ChunkOutcome::Accepted {
                ref progress,
                current_chunk: 2
            } if progress.processed_chunks == 1
        ));

        let outcome = submit(&registry, "doc", 0, 3, "Hello ").await;
        assert!(
            matches!(outcome, ChunkOutcome::Accepted { ref progress, .. } if progress.processed_chunks == 2)
        );

        let outcome = submit(&registry, "doc", 1, 3, "World").await;
        match outcome {
            ChunkOutcome::Complete(document) => {
                assert_eq!(document.text, "Hello \n\nWorld\n\n!");
                assert_eq!(document.page_count, 3);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn any_permutation_yields_identical_text() {
        let chunks = ["alpha", "bravo", "charlie"];
        let mut outputs = Vec::new();
        for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
            let registry = registry();
            let mut final_text = None;
            for &index in &order {
                match submit(&registry, "perm", index, 3, chunks[index]).await {
                    ChunkOutcome::Complete(document) => final_text = Some(document.text),
                    ChunkOutcome::Accepted { .. } => {}
                }
            }
            outputs.push(final_text.unwrap());
        }
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn duplicate_index_does_not_advance_progress() {
        let registry = registry();
        submit(&registry, "doc", 0, 2, "first").await;
        let outcome = submit(&registry, "doc", 0, 2, "first retry").await;
        match outcome {
            ChunkOutcome::Accepted { progress, .. } => {
                assert_eq!(progress.processed_chunks, 1);
                assert_eq!(progress.percentage, 50);
            }
            other => panic!("expected accepted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn completion_is_exactly_once() {
        let registry = registry();
        submit(&registry, "doc", 0, 2, "a").await;
        let outcome = submit(&registry, "doc", 1, 2, "b").await;
        assert!(matches!(outcome, ChunkOutcome::Complete(_)));

        let err = registry.status("doc").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_index() {
        let registry = registry();
        let err = registry
            .accept_chunk(metadata("doc", 3, 3, 64), b"x".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidChunkIndex { index: 3, total: 3 }
        ));
    }

    #[tokio::test]
    async fn rejects_oversized_chunk_beyond_tolerance() {
        let registry = registry();
        // Declared 100 bytes, 10% tolerance: 110 passes, 111 does not.
        let ok = registry
            .accept_chunk(metadata("doc", 0, 2, 100), vec![b'a'; 110])
            .await;
        assert!(ok.is_ok());
        let err = registry
            .accept_chunk(metadata("doc2", 0, 2, 100), vec![b'a'; 111])
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::OversizedChunk { .. }));
    }

    #[tokio::test]
    async fn rejects_conflicting_metadata() {
        let registry = registry();
        submit(&registry, "doc", 0, 3, "a").await;
        let mut conflicting = metadata("doc", 1, 5, 64);
        conflicting.chunk_index = 1;
        let err = registry
            .accept_chunk(conflicting, b"b".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancel_evicts_the_session() {
        let registry = registry();
        submit(&registry, "doc", 0, 2, "a").await;
        registry.cancel("doc").await.unwrap();
        assert!(matches!(
            registry.status("doc").await.unwrap_err(),
            SessionError::NotFound(_)
        ));
        assert!(matches!(
            registry.cancel("doc").await.unwrap_err(),
            SessionError::NotFound(_)
        ));
    }

    /// Echoes the input bytes back as text, counting invocations.
    struct Transparent(Arc<AtomicUsize>);

    impl ExtractionStrategy for Transparent {
        fn name(&self) -> &'static str {
            "transparent"
        }

        fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ExtractionResult {
                text: String::from_utf8_lossy(data).into_owned(),
                formatted: None,
                page_count: 1,
                strategy: "transparent",
                layout_preserved: false,
            })
        }
    }

    #[tokio::test]
    async fn binary_chunks_are_transport_only_and_extracted_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ExtractionPipeline::new(StdDuration::from_secs(5))
            .with_chain(FileFormat::Pdf, vec![Arc::new(Transparent(calls.clone()))]);
        let registry = ChunkRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(pipeline),
            Arc::new(SystemClock),
            0.10,
        );

        let mut meta = metadata("bin", 1, 2, 64);
        meta.file_type = "pdf".to_string();
        let outcome = registry.accept_chunk(meta, b"-tail".to_vec()).await.unwrap();
        assert!(matches!(outcome, ChunkOutcome::Accepted { .. }));
        // No extraction while chunks are in flight
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut meta = metadata("bin", 0, 2, 64);
        meta.file_type = "pdf".to_string();
        let outcome = registry
            .accept_chunk(meta, b"%PDF-head".to_vec())
            .await
            .unwrap();
        match outcome {
            ChunkOutcome::Complete(document) => {
                assert_eq!(document.text, "%PDF-head-tail");
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn binary_first_chunk_must_carry_the_signature() {
        let registry = registry();
        let mut meta = metadata("bin", 0, 2, 64);
        meta.file_type = "pdf".to_string();
        let err = registry
            .accept_chunk(meta, b"not a pdf header".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Extraction(_)));
    }

    #[tokio::test]
    async fn expired_sessions_are_swept_and_forgotten() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = ChunkRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ExtractionPipeline::new(StdDuration::from_secs(5))),
            clock.clone(),
            0.10,
        );

        submit(&registry, "stale", 0, 2, "a").await;
        clock.advance(Duration::hours(2));
        submit(&registry, "fresh", 0, 2, "b").await;

        let evicted = registry.sweep_expired(Duration::hours(1)).await;
        assert_eq!(evicted, vec!["stale".to_string()]);
        assert!(matches!(
            registry.status("stale").await.unwrap_err(),
            SessionError::NotFound(_)
        ));
        assert!(registry.status("fresh").await.is_ok());
    }

    #[tokio::test]
    async fn status_reports_progress_and_timestamps() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = ChunkRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ExtractionPipeline::new(StdDuration::from_secs(5))),
            clock.clone(),
            0.10,
        );

        submit(&registry, "doc", 0, 4, "a").await;
        clock.advance(Duration::seconds(8));
        let view = registry.status("doc").await.unwrap();
        assert_eq!(view.state, SessionState::Accumulating);
        assert_eq!(view.progress.processed_chunks, 1);
        assert_eq!(view.progress.percentage, 25);
        assert_eq!(view.elapsed_secs, 8);
        // 1 chunk in 8s -> 3 remaining at 8s each
        assert_eq!(view.progress.estimated_time_remaining, Some(24));
    }
}
