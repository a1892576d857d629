use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::pool::testing::FactoryLog;
use crate::pool::{ElasticPool, PoolConfig, WorkerFactory};
use crate::tts::{ModelInfo, SynthesisOptions, Synthesizer, TtsService};

/// Stand-in worker producing a sine tone whose length tracks the text.
pub struct ToneWorker;

impl Synthesizer for ToneWorker {
    fn synthesize(&mut self, text: &str, options: &SynthesisOptions) -> Result<Vec<f32>, AppError> {
        match text {
            "fail" => Err(AppError::TtsError("scripted failure".into())),
            "panic" => panic!("scripted panic"),
            _ => {
                let len = (text.chars().count() as f32 * 160.0 / options.speed) as usize;
                Ok((0..len).map(|i| (i as f32 * 0.05).sin() * 0.5).collect())
            }
        }
    }
}

pub struct ToneFactory {
    log: Arc<FactoryLog>,
}

impl WorkerFactory for ToneFactory {
    type Worker = ToneWorker;
    type Error = AppError;

    fn selector(&self) -> &str {
        "en_US-test-low"
    }

    fn create(&self) -> Result<ToneWorker, AppError> {
        self.log.attempts.fetch_add(1, Ordering::SeqCst);
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(ToneWorker)
    }

    fn destroy(&self, worker: ToneWorker) {
        self.log.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(worker);
    }
}

pub fn model_info() -> ModelInfo {
    ModelInfo {
        id: "en_US-test-low".into(),
        name: "Test".into(),
        language: "en-us".into(),
        sample_rate: 16000,
        speakers: BTreeMap::new(),
    }
}

pub fn multi_speaker_model_info() -> ModelInfo {
    ModelInfo {
        speakers: [("p239".to_string(), 0), ("p240".to_string(), 1)]
            .into_iter()
            .collect(),
        ..model_info()
    }
}

/// A warmed-up service over tone workers with no spare-capacity growth.
pub async fn tone_service(
    initial_size: usize,
    max_size: usize,
) -> (TtsService<ToneFactory>, Arc<FactoryLog>) {
    let log = Arc::new(FactoryLog::default());
    let factory = ToneFactory {
        log: Arc::clone(&log),
    };
    let config = PoolConfig {
        initial_size,
        min_spare: 0,
        max_size,
        acquire_timeout: Duration::from_millis(100),
    };
    let pool = ElasticPool::new(factory, config).unwrap();
    pool.warm_up(initial_size).await.unwrap();
    (TtsService::new(pool, model_info()), log)
}
