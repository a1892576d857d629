use std::sync::Arc;

use crate::error::AppError;
use crate::pool::WorkerFactory;
use crate::tts::piper::PiperEngine;
use crate::tts::voice::Voice;

/// Builds [`PiperEngine`]s for one voice model.
///
/// The voice config is parsed once at startup; each worker gets its own
/// ONNX session over the same model file.
pub struct PiperFactory {
    voice: Arc<Voice>,
    intra_threads: usize,
}

impl PiperFactory {
    pub fn new(voice: Voice, intra_threads: usize) -> Self {
        Self {
            voice: Arc::new(voice),
            intra_threads: intra_threads.max(1),
        }
    }
}

impl WorkerFactory for PiperFactory {
    type Worker = PiperEngine;
    type Error = AppError;

    fn selector(&self) -> &str {
        &self.voice.id
    }

    fn create(&self) -> Result<PiperEngine, AppError> {
        tracing::debug!(
            model = %self.voice.model_path.display(),
            "Loading ONNX session"
        );
        PiperEngine::new(Arc::clone(&self.voice), self.intra_threads)
    }
}
