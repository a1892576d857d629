use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub audio: AudioConfig,
    pub espeak: Option<EspeakConfig>,
    #[serde(default)]
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
    #[serde(default = "default_num_speakers")]
    pub num_speakers: usize,
    #[serde(default)]
    pub speaker_id_map: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

fn default_num_speakers() -> usize {
    1
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

/// A Piper voice model on disk: the ONNX file plus its JSON config.
#[derive(Debug)]
pub struct Voice {
    pub id: String,
    pub config: VoiceConfig,
    pub model_path: PathBuf,
}

impl Voice {
    pub fn load(voices_dir: &Path, voice_id: &str) -> Result<Self, AppError> {
        let model_path = voices_dir.join(format!("{}.onnx", voice_id));
        let config_path = voices_dir.join(format!("{}.onnx.json", voice_id));

        if !model_path.exists() {
            return Err(AppError::VoiceNotFound(voice_id.to_string()));
        }

        if !config_path.exists() {
            return Err(AppError::VoiceNotFound(format!(
                "{} (missing config file)",
                voice_id
            )));
        }

        let config: VoiceConfig = serde_json::from_reader(File::open(&config_path)?)?;

        Ok(Self {
            id: voice_id.to_string(),
            config,
            model_path,
        })
    }

    /// espeak-ng voice used for phonemization
    pub fn espeak_voice(&self) -> &str {
        self.config
            .espeak
            .as_ref()
            .map(|e| e.voice.as_str())
            .unwrap_or("en")
    }

    pub fn is_multi_speaker(&self) -> bool {
        self.config.num_speakers > 1
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            id: self.id.clone(),
            name: parse_voice_name(&self.id),
            language: self.espeak_voice().to_string(),
            sample_rate: self.config.audio.sample_rate,
            speakers: self
                .config
                .speaker_id_map
                .iter()
                .map(|(name, id)| (name.clone(), *id))
                .collect(),
        }
    }
}

/// What callers can know about the model every pooled worker runs.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub language: String,
    pub sample_rate: u32,
    /// Empty for single-speaker models
    pub speakers: BTreeMap<String, i64>,
}

fn parse_voice_name(id: &str) -> String {
    // Pattern: language-name-quality (e.g., en_GB-alba-medium)
    let parts: Vec<&str> = id.split('-').collect();
    if parts.len() >= 2 {
        // Capitalize the voice name
        let name = parts[1];
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => id.to_string(),
        }
    } else {
        id.to_string()
    }
}
