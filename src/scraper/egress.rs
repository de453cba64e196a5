use crate::models::EgressEndpoint;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Round-robin proxy rotation shared by every in-flight request.
///
/// The cursor only ever moves forward; concurrent callers may skip an
/// endpoint but never observe a torn index.
#[derive(Debug, Default)]
pub struct EgressRouter {
    endpoints: Vec<EgressEndpoint>,
    cursor: AtomicUsize,
}

impl EgressRouter {
    pub fn new(endpoints: Vec<EgressEndpoint>) -> Self {
        Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next endpoint and its slot, or `None` for a direct connection.
    pub fn next(&self) -> Option<(usize, EgressEndpoint)> {
        if self.endpoints.is_empty() {
            debug!("No egress configured, using direct connection");
            return None;
        }
        let slot = self.cursor.fetch_add(1, Ordering::SeqCst) % self.endpoints.len();
        let endpoint = &self.endpoints[slot];
        debug!("Using egress {}:{}", endpoint.host, endpoint.port);
        Some((slot, endpoint.clone()))
    }

    /// Make sure the following `next()` does not hand out `failed` again.
    ///
    /// Only moves the cursor when it currently points at `failed`, so with two
    /// endpoints the retry lands on the other one instead of wrapping back.
    pub fn rotate(&self, failed: usize) {
        let len = self.endpoints.len();
        if len < 2 {
            return;
        }
        let mut current = self.cursor.load(Ordering::SeqCst);
        while current % len == failed % len {
            match self.cursor.compare_exchange(
                current,
                current.wrapping_add(1),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn count(&self) -> usize {
        self.endpoints.len()
    }
}
