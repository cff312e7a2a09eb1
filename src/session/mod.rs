//! Chunked-upload session tracking
//!
//! A `ProcessingSession` accumulates per-chunk results for one logical
//! document, keyed by document id. The registry serializes all mutation per
//! document, reassembles in index order on completion, and deletes the
//! session atomically with delivering the final document. The reaper evicts
//! sessions abandoned past the inactivity timeout.
//!
//! Session state is process-local and volatile; a restart loses in-flight
//! uploads. Multi-instance deployments need a shared `SessionStore`
//! implementation keyed by document id.

pub mod reaper;
pub mod registry;
pub mod store;
pub mod types;

pub use reaper::{ReaperHandle, SessionReaper};
pub use registry::{AssembledDocument, ChunkOutcome, ChunkRegistry, SessionStatusView};
pub use store::{InMemorySessionStore, SessionHandle, SessionStore};
pub use types::{
    ChunkMetadata, ChunkPayload, ChunkRecord, ProcessingSession, ProgressReport, SessionError,
    SessionState, CHUNK_SEPARATOR,
};
