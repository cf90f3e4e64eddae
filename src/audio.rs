//! Mono PCM audio loading.
//!
//! WAV parsing itself is treated as an external collaborator (spec
//! §1 OUT OF SCOPE) and delegated to `hound`, the same crate the
//! teacher used. This module's job is the boundary: decode, reject
//! anything that isn't canonical PCM16, and average to mono.

use crate::error::FingerprintError;
use std::path::Path;

/// A mono signal normalized to `[-1, 1]`, with its sample rate.
#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Loads a canonical little-endian PCM16 WAV file and averages any
/// stereo/multi-channel input down to mono.
pub fn load_wav(path: impl AsRef<Path>) -> Result<AudioFrame, FingerprintError> {
    let path = path.as_ref();
    log::debug!("opening WAV file: {}", path.display());

    let mut reader = hound::WavReader::open(path).map_err(|e| {
        FingerprintError::MalformedAudio(format!("failed to open {}: {}", path.display(), e))
    })?;

    let spec = reader.spec();
    log::debug!(
        "WAV spec: {} Hz, {} channel(s), {} bits, format {:?}",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(FingerprintError::MalformedAudio(format!(
            "only 16-bit PCM WAV is supported, got {:?}/{} bits",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<Result<_, _>>()?;

    let channels = spec.channels as usize;
    let mono = if channels > 1 {
        log::debug!("averaging {} channels to mono", channels);
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        samples
    };

    log::info!(
        "loaded {} samples ({:.2}s at {} Hz) from {}",
        mono.len(),
        mono.len() as f64 / spec.sample_rate as f64,
        spec.sample_rate,
        path.display()
    );

    Ok(AudioFrame {
        samples: mono,
        sample_rate: spec.sample_rate,
    })
}

/// Returns the index of the first sample whose magnitude exceeds
/// `threshold`, or `0` if the signal never does (or is empty).
///
/// Grounded in `main.cpp`'s leading-silence scan in the diagnostic
/// mode. Only used there: indexing and query pipelines must process
/// audio identically so anchor times stay comparable, and re-trimming
/// would shift them.
pub fn find_audio_start(samples: &[f32], threshold: f32) -> usize {
    samples
        .iter()
        .position(|&s| s.abs() > threshold)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_audio_start_finds_first_loud_sample() {
        let samples = vec![0.0, 0.001, -0.005, 0.5, 0.2];
        assert_eq!(find_audio_start(&samples, 0.01), 3);
    }

    #[test]
    fn find_audio_start_defaults_to_zero_for_silence() {
        let samples = vec![0.0, 0.0, 0.0];
        assert_eq!(find_audio_start(&samples, 0.01), 0);
    }
}
