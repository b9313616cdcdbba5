//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

/// State handed to every handler: the store plus server bookkeeping
pub struct AppState<S> {
    pub store: Arc<S>,
    pub started_at: Instant,
}

impl<S> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

// Manual impl: `S` itself need not be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            started_at: self.started_at,
        }
    }
}
