use crate::error::AppError;
use crate::tts::{ModelInfo, SynthesisOptions};

use super::SynthesizeRequest;

pub const MAX_TEXT_CHARS: usize = 10_000;
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
pub const DEFAULT_SPEED: f32 = 1.0;

/// Check a request against the loaded model and turn it into synthesis options.
pub fn validate(request: &SynthesizeRequest, model: &ModelInfo) -> Result<SynthesisOptions, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("Text cannot be empty".into()));
    }

    if request.text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Text too long (max {} chars)",
            MAX_TEXT_CHARS
        )));
    }

    let speed = request.speed.unwrap_or(DEFAULT_SPEED);
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(AppError::BadRequest(format!(
            "Speed must be between {} and {}",
            MIN_SPEED, MAX_SPEED
        )));
    }

    if let Some(language) = &request.language {
        if !language_matches(language, &model.language) {
            return Err(AppError::BadRequest(format!(
                "Language '{}' is not served here (model language: {})",
                language, model.language
            )));
        }
    }

    let speaker_id = resolve_speaker(request.voice.as_deref(), model)?;

    Ok(SynthesisOptions { speaker_id, speed })
}

/// `en` matches `en-us`; `en-US` matches `en-us`; `de` does not match `en`.
fn language_matches(requested: &str, served: &str) -> bool {
    let requested = requested.trim().replace('_', "-").to_ascii_lowercase();
    let served = served.replace('_', "-").to_ascii_lowercase();
    requested == served || served.split('-').next() == Some(requested.as_str())
}

fn resolve_speaker(voice: Option<&str>, model: &ModelInfo) -> Result<Option<i64>, AppError> {
    match voice {
        None if model.speakers.is_empty() => Ok(None),
        None => Ok(model.speakers.values().min().copied()),
        Some(voice) if voice.is_empty() => {
            Err(AppError::BadRequest("Voice cannot be empty".into()))
        }
        Some(voice) if model.speakers.is_empty() => {
            if voice == model.id {
                Ok(None)
            } else {
                Err(AppError::VoiceNotFound(voice.to_string()))
            }
        }
        Some(voice) => model
            .speakers
            .get(voice)
            .copied()
            .map(Some)
            .ok_or_else(|| AppError::VoiceNotFound(voice.to_string())),
    }
}
