//! Sliding-window STFT (§4.2).
//!
//! Direct port of `Espectrograma::calcular`: precompute a Hamming
//! window, slide it across the signal at hop `H`, FFT each window,
//! and keep the first `N/2` magnitudes (positive frequencies only).

use crate::complex::Complex64;
use crate::error::FingerprintError;
use crate::fft;
use rayon::prelude::*;

/// A magnitude spectrogram and the axis metadata needed to map a
/// `(frame, bin)` pair back to `(seconds, Hz)`.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    /// `frames[v][b]` is the magnitude of frequency bin `b` in frame `v`.
    pub frames: Vec<Vec<f64>>,
    pub freq_resolution: f64,
    pub time_resolution: f64,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, |f| f.len())
    }
}

fn hamming_window(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.54 - 0.46 * (std::f64::consts::TAU * i as f64 / (size - 1) as f64).cos())
        .collect()
}

/// Computes the spectrogram of `samples` under `config`.
///
/// `config.window_size` must be a power of two; `config.hop` must
/// satisfy `1 <= hop <= window_size`, or `InvalidInput` is returned.
pub fn compute(
    samples: &[f32],
    sample_rate: u32,
    config: &crate::config::SpectrogramConfig,
) -> Result<Spectrogram, FingerprintError> {
    let n = config.window_size;
    let hop = config.hop;

    if !fft::is_power_of_two(n) {
        return Err(FingerprintError::InvalidInput(format!(
            "window_size must be a power of two, got {n}"
        )));
    }
    if hop == 0 || hop > n {
        return Err(FingerprintError::InvalidInput(format!(
            "hop must satisfy 1 <= hop <= window_size ({n}), got {hop}"
        )));
    }

    let window = if config.apply_hamming {
        hamming_window(n)
    } else {
        vec![1.0; n]
    };

    let num_bins = n / 2;
    let start = config.start_offset;

    let num_frames = if samples.len() >= start + n {
        (samples.len() - start - n) / hop + 1
    } else {
        0
    };

    log::debug!(
        "spectrogram: window={} hop={} frames={} freq_res={:.3} Hz/bin time_res={:.5} s/frame",
        n,
        hop,
        num_frames,
        sample_rate as f64 / n as f64,
        hop as f64 / sample_rate as f64
    );

    let frames: Vec<Vec<f64>> = (0..num_frames)
        .into_par_iter()
        .map(|v| {
            let frame_start = start + v * hop;
            let mut buf: Vec<Complex64> = (0..n)
                .map(|i| {
                    let sample = samples[frame_start + i] as f64 * window[i];
                    Complex64::new(sample, 0.0)
                })
                .collect();

            fft::forward(&mut buf).expect("window_size validated as power of two above");

            buf.iter().take(num_bins).map(|c| c.magnitude()).collect()
        })
        .collect();

    Ok(Spectrogram {
        frames,
        freq_resolution: sample_rate as f64 / n as f64,
        time_resolution: hop as f64 / sample_rate as f64,
        sample_rate,
    })
}
