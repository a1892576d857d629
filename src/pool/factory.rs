use std::fmt;

/// Builds the heavyweight workers an [`ElasticPool`](super::ElasticPool) lends out.
///
/// A factory is bound to one selector for its whole life. `create` may take
/// seconds and is always called from a blocking thread, never while the
/// pool's lock is held. A failed `create` must leave nothing behind.
pub trait WorkerFactory: Send + Sync + 'static {
    type Worker: Send + 'static;
    type Error: fmt::Display + Send + 'static;

    /// The immutable configuration every worker is built for
    fn selector(&self) -> &str;

    fn create(&self) -> Result<Self::Worker, Self::Error>;

    /// Tear down a worker the pool no longer needs
    fn destroy(&self, worker: Self::Worker) {
        drop(worker);
    }
}
