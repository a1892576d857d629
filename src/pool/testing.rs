use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::WorkerFactory;

#[derive(Debug)]
pub struct FakeWorker {
    pub id: usize,
}

/// Shared view of what a [`CountingFactory`] has done.
#[derive(Default)]
pub struct FactoryLog {
    pub attempts: AtomicUsize,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    /// Fail every construction while set
    pub failing: AtomicBool,
    /// Fail this many upcoming constructions
    pub fail_next: AtomicUsize,
    /// Hold constructions in `create` until cleared
    pub paused: AtomicBool,
}

pub struct CountingFactory {
    log: Arc<FactoryLog>,
}

impl CountingFactory {
    pub fn new() -> (Self, Arc<FactoryLog>) {
        let log = Arc::new(FactoryLog::default());
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl WorkerFactory for CountingFactory {
    type Worker = FakeWorker;
    type Error = String;

    fn selector(&self) -> &str {
        "fake"
    }

    fn create(&self) -> Result<FakeWorker, String> {
        let attempt = self.log.attempts.fetch_add(1, Ordering::SeqCst);
        while self.log.paused.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        if self.log.failing.load(Ordering::SeqCst) {
            return Err("factory disabled".into());
        }
        let skipped = self
            .log
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if skipped.is_ok() {
            return Err(format!("scripted failure on attempt {attempt}"));
        }
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeWorker { id: attempt })
    }

    fn destroy(&self, worker: FakeWorker) {
        self.log.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(worker);
    }
}
