//! Elastic bounded pool of expensive workers.
//!
//! The pool owns an idle buffer and the counters describing it under one
//! lock. `acquire` reserves a slot, grows the pool by at most one worker when
//! projected spare capacity drops below `min_spare`, and then waits for an
//! idle worker. Workers return through the [`Checkout`] guard.

pub mod checkout;
pub mod config;
pub mod error;
pub mod factory;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Semaphore;

pub use checkout::Checkout;
pub use config::PoolConfig;
pub use error::PoolError;
pub use factory::WorkerFactory;

use checkout::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Uninitialized,
    WarmingUp,
    Serving,
    Draining,
    Shutdown,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Uninitialized => "uninitialized",
            PoolState::WarmingUp => "warming up",
            PoolState::Serving => "serving",
            PoolState::Draining => "draining",
            PoolState::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}

/// Point-in-time snapshot of the pool counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub state: PoolState,
    pub capacity_max: usize,
    pub min_spare: usize,
    pub total_created: usize,
    pub checked_out: usize,
    pub idle: usize,
    /// Acquisitions holding a reservation but no worker yet
    pub waiting: usize,
}

struct Ledger<W> {
    state: PoolState,
    /// Bumped by shutdown so stale checkouts and reservations are recognized
    epoch: u64,
    idle: VecDeque<W>,
    total_created: usize,
    checked_out: usize,
    waiting: usize,
    /// Constructions in flight, counted against the ceiling
    pending: usize,
}

struct Shared<F: WorkerFactory> {
    factory: F,
    config: PoolConfig,
    ledger: Mutex<Ledger<F::Worker>>,
    /// One permit per idle worker; never more permits than `ledger.idle.len()`
    available: Semaphore,
}

impl<F: WorkerFactory> Shared<F> {
    /// Run the factory on a blocking thread. Failures are logged and absorbed.
    async fn construct(self: Arc<Self>) -> Option<F::Worker> {
        let shared = Arc::clone(&self);
        let built = tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            (shared.factory.create(), started.elapsed())
        })
        .await;

        match built {
            Ok((Ok(worker), elapsed)) => {
                tracing::info!(
                    selector = self.factory.selector(),
                    "Created worker in {:.2}s",
                    elapsed.as_secs_f64()
                );
                Some(worker)
            }
            Ok((Err(e), _)) => {
                tracing::error!(
                    selector = self.factory.selector(),
                    "Failed to create worker: {}",
                    e
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    selector = self.factory.selector(),
                    "Worker construction panicked: {}",
                    e
                );
                None
            }
        }
    }

    /// Place a freshly built worker in the idle buffer, unless the pool was
    /// shut down since `epoch` was read or is already at `max_size`.
    ///
    /// `from_growth` settles the construction's `pending` slot under the same
    /// lock, so `total_created + pending` never drops while a worker is
    /// counted in neither.
    fn admit(&self, worker: F::Worker, epoch: u64, from_growth: bool) -> bool {
        let mut ledger = self.ledger.lock();
        let current = ledger.epoch == epoch;
        if current && from_growth {
            ledger.pending -= 1;
        }
        if !current || ledger.total_created >= self.config.max_size {
            let total_created = ledger.total_created;
            drop(ledger);
            tracing::debug!(current, total_created, "Discarding newly built worker");
            self.factory.destroy(worker);
            return false;
        }
        ledger.idle.push_back(worker);
        ledger.total_created += 1;
        drop(ledger);
        self.available.add_permits(1);
        true
    }

    /// Scale-up step of `acquire`. Runs as its own task so that a cancelled
    /// caller cannot strand the `pending` slot.
    async fn grow(self: Arc<Self>, epoch: u64) {
        match Arc::clone(&self).construct().await {
            Some(worker) => {
                if self.admit(worker, epoch, true) {
                    let ledger = self.ledger.lock();
                    tracing::info!(
                        total_created = ledger.total_created,
                        idle = ledger.idle.len(),
                        "Scaled up pool"
                    );
                }
            }
            None => {
                let mut ledger = self.ledger.lock();
                if ledger.epoch == epoch {
                    ledger.pending -= 1;
                }
                drop(ledger);
                tracing::warn!("Failed to add a worker during scale-up");
            }
        }
    }

    fn release(&self, worker: Option<F::Worker>, epoch: u64) {
        let Some(worker) = worker else {
            tracing::warn!("Attempted to release an absent worker");
            return;
        };

        let mut ledger = self.ledger.lock();
        if ledger.epoch != epoch {
            drop(ledger);
            tracing::warn!("Worker released after pool shutdown; destroying it");
            self.factory.destroy(worker);
            return;
        }

        ledger.checked_out -= 1;

        if ledger.idle.len() >= self.config.max_size {
            // Unreachable while total_created <= max_size; keep the counters
            // honest and get rid of the orphan.
            ledger.total_created -= 1;
            let (checked_out, total_created) = (ledger.checked_out, ledger.total_created);
            drop(ledger);
            tracing::error!(
                checked_out,
                total_created,
                "Idle buffer full on release; destroying worker"
            );
            self.factory.destroy(worker);
            return;
        }

        ledger.idle.push_back(worker);
        let (checked_out, idle) = (ledger.checked_out, ledger.idle.len());
        drop(ledger);
        self.available.add_permits(1);
        tracing::debug!(checked_out, idle, "Worker released to pool");
    }
}

/// Capped pool of reusable workers built by a [`WorkerFactory`].
///
/// Cloning yields another handle to the same pool.
pub struct ElasticPool<F: WorkerFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: WorkerFactory> Clone for ElasticPool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: WorkerFactory> ElasticPool<F> {
    pub fn new(factory: F, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        tracing::info!(
            selector = factory.selector(),
            max_size = config.max_size,
            min_spare = config.min_spare,
            "Created worker pool"
        );

        let ledger = Ledger {
            state: PoolState::Uninitialized,
            epoch: 0,
            idle: VecDeque::with_capacity(config.max_size),
            total_created: 0,
            checked_out: 0,
            waiting: 0,
            pending: 0,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                factory,
                config,
                ledger: Mutex::new(ledger),
                available: Semaphore::new(0),
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Build up to `initial_count` workers (never more than `max_size`)
    /// before the pool starts serving.
    ///
    /// Construction failures are skipped. The pool serves afterwards even if
    /// nothing could be built, but that case is reported as
    /// [`PoolError::NoWorkers`].
    pub async fn warm_up(&self, initial_count: usize) -> Result<usize, PoolError> {
        let epoch = {
            let mut ledger = self.shared.ledger.lock();
            if ledger.state != PoolState::Uninitialized {
                return Err(PoolError::InvalidState {
                    state: ledger.state,
                });
            }
            ledger.state = PoolState::WarmingUp;
            ledger.epoch
        };

        let target = initial_count.min(self.shared.config.max_size);
        if target < initial_count {
            tracing::warn!(
                "Requested {} initial workers, clamping to max_size {}",
                initial_count,
                target
            );
        }
        tracing::info!(
            selector = self.shared.factory.selector(),
            "Warming up pool with {} workers",
            target
        );

        let mut created = 0;
        for _ in 0..target {
            match Arc::clone(&self.shared).construct().await {
                Some(worker) => {
                    if self.shared.admit(worker, epoch, false) {
                        created += 1;
                    }
                }
                None => tracing::warn!("Failed to create a worker during warm-up"),
            }
        }

        {
            let mut ledger = self.shared.ledger.lock();
            if ledger.epoch == epoch && ledger.state == PoolState::WarmingUp {
                ledger.state = PoolState::Serving;
            }
        }

        tracing::info!(
            "Pool warmed up with {}/{} workers: {:?}",
            created,
            target,
            self.status()
        );

        if target > 0 && created == 0 {
            return Err(PoolError::NoWorkers { requested: target });
        }
        Ok(created)
    }

    /// Borrow a worker, waiting at most `timeout` for one to become idle.
    pub async fn acquire(&self, timeout: Duration) -> Result<Checkout<F>, PoolError> {
        let shared = &self.shared;

        let (mut reservation, grow) = {
            let mut ledger = shared.ledger.lock();
            if ledger.state != PoolState::Serving {
                return Err(PoolError::NotServing {
                    state: ledger.state,
                });
            }

            ledger.waiting += 1;
            let reserved = ledger.checked_out + ledger.waiting;
            // idle_projected = total_created - reserved < min_spare
            let grow = ledger.total_created < reserved + shared.config.min_spare
                && ledger.total_created + ledger.pending < shared.config.max_size;
            if grow {
                ledger.pending += 1;
            }

            tracing::debug!(
                total_created = ledger.total_created,
                reserved,
                idle = ledger.idle.len(),
                grow,
                "Acquiring worker"
            );

            (Reservation::new(Arc::clone(shared), ledger.epoch), grow)
        };

        if grow {
            let task = tokio::spawn(Shared::grow(Arc::clone(shared), reservation.epoch()));
            if let Err(e) = task.await {
                tracing::error!("Scale-up task failed: {}", e);
            }
        }

        let permit = match tokio::time::timeout(timeout, shared.available.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => {
                let state = shared.ledger.lock().state;
                return Err(PoolError::NotServing { state });
            }
            Err(_elapsed) => {
                tracing::warn!("No worker available within {:?}", timeout);
                return Err(PoolError::Exhausted { timeout });
            }
        };
        // The permit stands for the worker we are about to pop.
        permit.forget();

        let mut ledger = shared.ledger.lock();
        let worker = match ledger.idle.pop_front() {
            Some(worker) if ledger.epoch == reservation.epoch() => worker,
            Some(worker) => {
                drop(ledger);
                shared.factory.destroy(worker);
                let state = shared.ledger.lock().state;
                return Err(PoolError::NotServing { state });
            }
            None => {
                let state = ledger.state;
                drop(ledger);
                return Err(PoolError::NotServing { state });
            }
        };

        reservation.disarm();
        ledger.waiting -= 1;
        ledger.checked_out += 1;
        let epoch = ledger.epoch;
        tracing::debug!(
            checked_out = ledger.checked_out,
            idle = ledger.idle.len(),
            "Worker checked out"
        );
        drop(ledger);

        Ok(Checkout::new(Arc::clone(shared), epoch, worker))
    }

    /// Give a worker back. Same as dropping the checkout.
    pub fn release(&self, checkout: Checkout<F>) {
        drop(checkout);
    }

    pub fn status(&self) -> PoolStatus {
        let ledger = self.shared.ledger.lock();
        PoolStatus {
            state: ledger.state,
            capacity_max: self.shared.config.max_size,
            min_spare: self.shared.config.min_spare,
            total_created: ledger.total_created,
            checked_out: ledger.checked_out,
            idle: ledger.idle.len(),
            waiting: ledger.waiting,
        }
    }

    /// Destroy all idle workers and zero the counters.
    ///
    /// Does not wait for checked out workers: their later release is a
    /// logged no-op. Pending and future `acquire` calls fail fast.
    pub fn shutdown(&self) {
        let drained = {
            let mut ledger = self.shared.ledger.lock();
            if matches!(ledger.state, PoolState::Draining | PoolState::Shutdown) {
                tracing::debug!("Pool already shut down");
                return;
            }
            ledger.state = PoolState::Draining;
            ledger.epoch += 1;
            ledger.total_created = 0;
            ledger.checked_out = 0;
            ledger.waiting = 0;
            ledger.pending = 0;
            std::mem::take(&mut ledger.idle)
        };
        self.shared.available.close();

        tracing::info!("Shutting down pool, destroying {} idle workers", drained.len());
        for worker in drained {
            self.shared.factory.destroy(worker);
        }

        self.shared.ledger.lock().state = PoolState::Shutdown;
        tracing::info!("Pool shut down");
    }
}
