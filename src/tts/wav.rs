use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::AppError;

/// Encode mono f32 samples in [-1.0, 1.0] as 16-bit PCM WAV.
pub fn encode(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut buffer, spec)
        .map_err(|e| AppError::TtsError(format!("Failed to create WAV writer: {}", e)))?;

    let mut pcm = writer.get_i16_writer(samples.len() as u32);
    for sample in samples {
        pcm.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16);
    }
    pcm.flush()
        .map_err(|e| AppError::TtsError(format!("Failed to write samples: {}", e)))?;

    writer
        .finalize()
        .map_err(|e| AppError::TtsError(format!("Failed to finalize WAV: {}", e)))?;

    Ok(buffer.into_inner())
}
