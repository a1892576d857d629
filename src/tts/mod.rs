pub mod factory;
pub mod piper;
pub mod voice;
pub mod wav;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Instant;

use crate::error::AppError;
use crate::pool::{ElasticPool, PoolStatus, WorkerFactory};

pub use factory::PiperFactory;
pub use voice::{ModelInfo, Voice};

/// Per-request knobs, already validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisOptions {
    /// Speaker index for multi-speaker models
    pub speaker_id: Option<i64>,
    /// Speech rate multiplier, 1.0 is the model's natural pace
    pub speed: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            speaker_id: None,
            speed: 1.0,
        }
    }
}

/// The text-to-audio computation a pooled worker performs.
pub trait Synthesizer {
    fn synthesize(&mut self, text: &str, options: &SynthesisOptions) -> Result<Vec<f32>, AppError>;
}

/// Runs synthesis requests on workers borrowed from the pool.
pub struct TtsService<F: WorkerFactory> {
    pool: ElasticPool<F>,
    model: ModelInfo,
}

impl<F> TtsService<F>
where
    F: WorkerFactory,
    F::Worker: Synthesizer,
{
    pub fn new(pool: ElasticPool<F>, model: ModelInfo) -> Self {
        Self { pool, model }
    }

    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &ElasticPool<F> {
        &self.pool
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Synthesize `text` and return it as WAV bytes.
    ///
    /// Holds one worker for exactly this request. A saturated pool is
    /// reported as [`AppError::Busy`] rather than retried.
    pub async fn speak(&self, text: &str, options: SynthesisOptions) -> Result<Vec<u8>, AppError> {
        let preview: String = text.chars().take(50).collect();
        tracing::info!(text = %preview, ?options, "Requesting worker");

        let mut checkout = self.pool.acquire(self.pool.config().acquire_timeout).await?;

        let started = Instant::now();
        let pool = self.pool.clone();
        let owned_text = text.to_string();
        // A panic inside synthesize still releases through the checkout's Drop.
        let samples = tokio::task::spawn_blocking(move || {
            let result = checkout.synthesize(&owned_text, &options);
            pool.release(checkout);
            result
        })
        .await
        .map_err(|e| AppError::TtsError(format!("Synthesis task failed: {}", e)))??;

        if samples.is_empty() {
            return Err(AppError::TtsError("Synthesis produced no audio".into()));
        }

        let sample_rate = self.model.sample_rate;
        tracing::info!(
            "Synthesized {:.2}s of audio in {:.3}s",
            samples.len() as f64 / f64::from(sample_rate),
            started.elapsed().as_secs_f64()
        );

        wav::encode(&samples, sample_rate)
    }
}
