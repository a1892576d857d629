use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;

use crate::error::AppError;
use crate::tts::voice::Voice;
use crate::tts::{SynthesisOptions, Synthesizer};

/// One pooled synthesis pipeline: an ONNX session for a single voice model.
///
/// The session is owned outright; a checkout gives the caller exclusive use.
pub struct PiperEngine {
    voice: Arc<Voice>,
    session: Session,
    noise_scale: f32,
    length_scale: f32,
    noise_w: f32,
}

impl PiperEngine {
    pub fn new(voice: Arc<Voice>, intra_threads: usize) -> Result<Self, AppError> {
        // Load the ONNX model using ort (official ONNX Runtime)
        let session = Session::builder()
            .map_err(|e| AppError::TtsError(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::TtsError(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(intra_threads)
            .map_err(|e| AppError::TtsError(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&voice.model_path)
            .map_err(|e| AppError::TtsError(format!("Failed to load model: {}", e)))?;

        let inference = voice.config.inference.clone().unwrap_or_default();

        Ok(Self {
            voice,
            session,
            noise_scale: inference.noise_scale,
            length_scale: inference.length_scale,
            noise_w: inference.noise_w,
        })
    }

    fn infer(&mut self, phoneme_ids: &[i64], options: &SynthesisOptions) -> Result<Vec<f32>, AppError> {
        if phoneme_ids.is_empty() {
            return Ok(Vec::new());
        }

        let input_len = phoneme_ids.len();

        // Prepare input tensors
        // input: [batch, sequence] = [1, phoneme_count]
        let input_value = Value::from_array((vec![1, input_len], phoneme_ids.to_vec()))
            .map_err(|e| AppError::TtsError(format!("Failed to create input tensor: {}", e)))?;

        // input_lengths: [batch] = [1]
        let lengths_value = Value::from_array((vec![1], vec![input_len as i64]))
            .map_err(|e| AppError::TtsError(format!("Failed to create lengths tensor: {}", e)))?;

        // scales: [3] = [noise_scale, length_scale, noise_w]
        // Faster speech means shorter phoneme durations.
        let scales_value = Value::from_array((vec![3], vec![
            self.noise_scale,
            self.length_scale / options.speed,
            self.noise_w,
        ]))
            .map_err(|e| AppError::TtsError(format!("Failed to create scales tensor: {}", e)))?;

        // Run inference
        let run = if self.voice.is_multi_speaker() {
            // sid: [batch] = [1]
            let sid_value = Value::from_array((vec![1], vec![options.speaker_id.unwrap_or(0)]))
                .map_err(|e| AppError::TtsError(format!("Failed to create speaker tensor: {}", e)))?;
            self.session
                .run(ort::inputs![input_value, lengths_value, scales_value, sid_value])
        } else {
            self.session
                .run(ort::inputs![input_value, lengths_value, scales_value])
        };
        let outputs = run.map_err(|e| AppError::TtsError(format!("Inference failed: {}", e)))?;

        // Extract audio samples from output
        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| AppError::TtsError("Missing output tensor".to_string()))?;

        let output_view = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::TtsError(format!("Failed to extract output tensor: {}", e)))?;

        let audio: Vec<f32> = output_view.1.iter().copied().collect();

        Ok(audio)
    }
}

impl Synthesizer for PiperEngine {
    fn synthesize(&mut self, text: &str, options: &SynthesisOptions) -> Result<Vec<f32>, AppError> {
        let phonemes = phonemize(text, self.voice.espeak_voice())?;
        let ids = phonemes_to_ids(&phonemes, &self.voice.config.phoneme_id_map);
        self.infer(&ids, options)
    }
}

/// Convert text to IPA phonemes using espeak-ng
pub fn phonemize(text: &str, voice: &str) -> Result<String, AppError> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }

    let output = Command::new("espeak-ng")
        .args(["--ipa", "-q", "-v", voice, text])
        .output()
        .map_err(|e| {
            AppError::TtsError(format!(
                "Failed to run espeak-ng (is it installed?): {}",
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::TtsError(format!("espeak-ng failed: {}", stderr)));
    }

    // espeak-ng prints one line per clause
    let phonemes = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(phonemes)
}

/// Map phonemes to model ids: `^ _ (p _)* $`, dropping unknown phonemes.
pub fn phonemes_to_ids(phonemes: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    let lookup = |key: &str| id_map.get(key).map(Vec::as_slice);
    let bos = lookup("^").unwrap_or(&[0]);
    let eos = lookup("$").unwrap_or(&[0]);
    let pad = lookup("_").unwrap_or(&[]);

    let mut ids = Vec::with_capacity(phonemes.len() * 2 + 3);
    ids.extend_from_slice(bos);
    ids.extend_from_slice(pad);

    let mut buf = [0u8; 4];
    for ch in phonemes.chars() {
        if let Some(mapped) = lookup(ch.encode_utf8(&mut buf)) {
            ids.extend_from_slice(mapped);
            ids.extend_from_slice(pad);
        }
    }

    ids.extend_from_slice(eos);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_map() -> HashMap<String, Vec<i64>> {
        [("^", 1), ("$", 2), ("_", 0), ("h", 20), ("ə", 59), (" ", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), vec![v]))
            .collect()
    }

    #[test]
    fn test_phonemes_to_ids_frames_and_pads() {
        assert_eq!(phonemes_to_ids("hə", &id_map()), vec![1, 0, 20, 0, 59, 0, 2]);
    }

    #[test]
    fn test_phonemes_to_ids_skips_unknown() {
        assert_eq!(phonemes_to_ids("h?", &id_map()), vec![1, 0, 20, 0, 2]);
    }

    #[test]
    fn test_phonemes_to_ids_without_markers() {
        let ids = phonemes_to_ids("", &HashMap::new());
        assert_eq!(ids, vec![0, 0]);
    }

    #[test]
    fn test_phonemize_blank_text_skips_espeak() {
        assert_eq!(phonemize("   ", "en").unwrap(), "");
    }
}
