use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::{Shared, WorkerFactory};

/// A worker on loan from an [`ElasticPool`](super::ElasticPool).
///
/// The worker goes back to the pool when the checkout is dropped, on every
/// exit path of the borrowing code.
pub struct Checkout<F: WorkerFactory> {
    shared: Arc<Shared<F>>,
    epoch: u64,
    /// Always `Some` until `Drop` takes it
    worker: Option<F::Worker>,
}

impl<F: WorkerFactory> Checkout<F> {
    pub(super) fn new(shared: Arc<Shared<F>>, epoch: u64, worker: F::Worker) -> Self {
        Self {
            shared,
            epoch,
            worker: Some(worker),
        }
    }
}

impl<F: WorkerFactory> Deref for Checkout<F> {
    type Target = F::Worker;

    fn deref(&self) -> &Self::Target {
        self.worker.as_ref().expect("worker is present until drop")
    }
}

impl<F: WorkerFactory> DerefMut for Checkout<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.worker.as_mut().expect("worker is present until drop")
    }
}

impl<F: WorkerFactory> Drop for Checkout<F> {
    fn drop(&mut self) {
        self.shared.release(self.worker.take(), self.epoch);
    }
}

/// A slot claimed by an `acquire` that has not obtained a worker yet.
///
/// Dropping an armed reservation gives the slot back, so a timed out or
/// cancelled acquisition leaves the counters as they were.
pub(super) struct Reservation<F: WorkerFactory> {
    shared: Arc<Shared<F>>,
    epoch: u64,
    armed: bool,
}

impl<F: WorkerFactory> Reservation<F> {
    pub(super) fn new(shared: Arc<Shared<F>>, epoch: u64) -> Self {
        Self {
            shared,
            epoch,
            armed: true,
        }
    }

    pub(super) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Caller must hold the ledger lock and account for the slot itself.
    pub(super) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<F: WorkerFactory> Drop for Reservation<F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut ledger = self.shared.ledger.lock();
        // A shutdown in between already zeroed the counters.
        if ledger.epoch == self.epoch {
            ledger.waiting -= 1;
        }
    }
}
