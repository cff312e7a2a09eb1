//! Application state management

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::extraction::ExtractionPipeline;
use crate::session::{ChunkRegistry, InMemorySessionStore, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub pipeline: Arc<ExtractionPipeline>,
    pub registry: ChunkRegistry,
}

impl AppState {
    /// Create application state with the default in-memory session store
    /// and the system clock.
    pub fn new(config: Config) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_parts(config, store, clock)
    }

    /// Create application state with injected store and clock.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pipeline = Arc::new(ExtractionPipeline::new(Duration::from_secs(
            config.ingest.extraction_timeout_secs,
        )));
        let registry = ChunkRegistry::new(
            store,
            Arc::clone(&pipeline),
            clock,
            config.ingest.chunk_size_tolerance,
        );
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                registry,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the extraction pipeline
    pub fn pipeline(&self) -> &Arc<ExtractionPipeline> {
        &self.inner.pipeline
    }

    /// Get the chunk session registry
    pub fn registry(&self) -> &ChunkRegistry {
        &self.inner.registry
    }
}
