use std::time::Duration;

use super::PoolError;

/// Static sizing and timeout settings for an [`ElasticPool`](super::ElasticPool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Workers built eagerly by `warm_up`
    pub initial_size: usize,
    /// Low watermark for projected idle workers
    pub min_spare: usize,
    /// Hard ceiling on constructed workers
    pub max_size: usize,
    /// How long `acquire` waits for an idle worker
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 10,
            min_spare: 2,
            max_size: 20,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::InvalidConfig(
                "max_size must be greater than 0".into(),
            ));
        }
        if self.acquire_timeout.is_zero() {
            return Err(PoolError::InvalidConfig(
                "acquire_timeout must be greater than zero".into(),
            ));
        }
        if self.min_spare > self.max_size {
            return Err(PoolError::InvalidConfig(format!(
                "min_spare ({}) must not exceed max_size ({})",
                self.min_spare, self.max_size
            )));
        }
        Ok(())
    }
}
