//! Per-endpoint concurrency control with bounded waiting.
//!
//! Each endpoint gets a fixed number of connection slots plus a short
//! admission queue. Callers beyond both limits fail immediately with
//! [`ClientError::Overloaded`] instead of queuing without bound; the retry
//! loop upstream treats that rejection like any other transient fault.
//!
//! ```text
//! acquire() ──► slot free? ──────────────► admitted (in_flight + 1)
//!                  │ no
//!                  ▼
//!              waiting < max_waiters? ──► queue FIFO, admitted on release
//!                  │ no
//!                  ▼
//!              Err(Overloaded)            immediately, never blocks
//! ```
//!
//! Slots are released through [`SlotPermit`]'s `Drop`, so a panic, timeout
//! or cancelled future can never leak one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::endpoint::Endpoint;
use super::error::ClientError;

/// Connection slots and admission queue for one endpoint.
#[derive(Debug)]
pub struct HostLimiter {
    endpoint: Endpoint,

    /// Slot semaphore; tokio admits queued waiters FIFO.
    slots: Arc<Semaphore>,

    /// Configured slot count.
    limit: usize,

    /// Current number of admitted requests.
    in_flight: Arc<AtomicUsize>,

    /// Current number of queued waiters.
    waiting: Arc<AtomicUsize>,

    /// Queue length beyond which acquire fails immediately.
    max_waiters: usize,
}

impl HostLimiter {
    /// Create a limiter for `endpoint`.
    ///
    /// # Arguments
    ///
    /// * `limit` - concurrent in-flight requests allowed (minimum 1)
    /// * `max_waiters` - callers allowed to queue once slots are exhausted
    pub fn new(endpoint: Endpoint, limit: usize, max_waiters: usize) -> Self {
        let limit = limit.max(1);
        Self {
            endpoint,
            slots: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiting: Arc::new(AtomicUsize::new(0)),
            max_waiters,
        }
    }

    /// Acquire a connection slot, queueing FIFO when saturated.
    ///
    /// # Errors
    ///
    /// [`ClientError::Overloaded`] when the slot limit and the waiter queue
    /// are both exhausted. The rejection is immediate; this method never
    /// blocks past the admission check in that case.
    pub async fn acquire(&self) -> Result<SlotPermit, ClientError> {
        // Fast path while slots are free
        if let Ok(permit) = self.slots.clone().try_acquire_owned() {
            return Ok(self.admit(permit));
        }

        // Saturated: join the queue only if there is room in it
        let joined = self
            .waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |waiters| {
                (waiters < self.max_waiters).then_some(waiters + 1)
            });
        if joined.is_err() {
            return Err(ClientError::Overloaded {
                endpoint: self.endpoint.clone(),
                in_flight: self.in_flight(),
                waiting: self.waiting(),
            });
        }

        // The guard keeps the waiting count honest even if this future is
        // dropped mid-wait (end-to-end timeout, caller cancellation).
        let _waiter = WaiterGuard {
            waiting: Arc::clone(&self.waiting),
        };
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("slot semaphore closed");
        Ok(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> SlotPermit {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        SlotPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// The endpoint this limiter guards.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Configured slot count.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Current number of admitted requests.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Current number of queued waiters.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }
}

/// Decrements the waiter count when the waiting future finishes or is
/// dropped.
struct WaiterGuard {
    waiting: Arc<AtomicUsize>,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::AcqRel);
    }
}

/// An admitted connection slot.
///
/// Holding it counts against the endpoint's limit; dropping it releases the
/// slot and wakes the longest-waiting caller.
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
