use std::time::Duration;

use super::PoolState;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("No worker became available within {timeout:?}")]
    Exhausted { timeout: Duration },

    #[error("Pool is not serving (state: {state})")]
    NotServing { state: PoolState },

    #[error("Operation not allowed while pool is {state}")]
    InvalidState { state: PoolState },

    #[error("Warm-up created no workers ({requested} requested)")]
    NoWorkers { requested: usize },

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}
