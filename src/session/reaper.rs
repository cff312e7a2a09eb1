//! Session reaper
//!
//! Periodic sweep evicting chunk sessions inactive past the configured
//! timeout. Abandoned uploads are the only other path out of the registry
//! besides completion, so this is what bounds memory growth.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::registry::ChunkRegistry;

pub struct SessionReaper {
    registry: ChunkRegistry,
    /// Time between sweeps
    interval: Duration,
    /// Inactivity threshold for eviction
    session_timeout: chrono::Duration,
}

impl SessionReaper {
    pub fn new(
        registry: ChunkRegistry,
        interval: Duration,
        session_timeout: chrono::Duration,
    ) -> Self {
        Self {
            registry,
            interval,
            session_timeout,
        }
    }

    /// Start the background sweep task. The returned handle must be stopped
    /// on shutdown so no timer outlives the server.
    pub fn spawn(self) -> ReaperHandle {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so a fresh server
            // does not sweep an empty registry at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.registry.sweep_expired(self.session_timeout).await;
                if !evicted.is_empty() {
                    tracing::info!(
                        count = evicted.len(),
                        "Evicted inactive chunk sessions"
                    );
                }
            }
        });
        ReaperHandle { handle }
    }
}

/// Handle to the running sweep task
pub struct ReaperHandle {
    handle: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop the sweep task.
    pub fn stop(self) {
        self.handle.abort();
    }
}
