use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide cap on in-flight logical requests.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
}

/// Admission ticket. Capacity is returned when this is dropped,
/// on success, error or cancellation alike.
#[derive(Debug)]
pub struct GateTicket {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GateTicket {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Wait until a slot frees up, then take it.
    pub async fn admit(&self) -> GateTicket {
        // The semaphore is private and never closed
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("concurrency gate semaphore closed");
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        GateTicket {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
