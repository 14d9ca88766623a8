use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::{HealthCheck, HealthChecker};

/// Counts consecutive request failures against one endpoint. Clones share the
/// same counter so the request path and the health endpoint see one view.
#[derive(Debug, Clone)]
pub struct ConnectionHealthTracker {
    // failures needed before the endpoint is reported as unhealthy
    max_consecutive_failures: usize,
    consecutive_failures: Arc<AtomicUsize>,
}

impl ConnectionHealthTracker {
    pub fn new(max_consecutive_failures: usize) -> Self {
        Self {
            max_consecutive_failures,
            consecutive_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn note_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn note_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn tracker(&self) -> HealthChecker {
        Box::new(self.clone())
    }
}

impl HealthCheck for ConnectionHealthTracker {
    fn healthy(&self) -> bool {
        self.consecutive_failures() < self.max_consecutive_failures
    }
}
