//! Constellation-map peak picking (§4.3).
//!
//! Per frame: find strict local maxima within radius `r`, threshold
//! them (fixed or adaptive-percentile), keep the strongest
//! `peaks_per_frame`, then apply a global frequency/magnitude
//! post-filter. Strict `>` is used throughout — spec.md's Open
//! Question about the original's inconsistent `<`/`<=` usage is
//! resolved in favor of strict, non-tie-breaking local maxima.

use crate::config::PeakConfig;
use crate::spectrogram::Spectrogram;
use rayon::prelude::*;

/// A single time-frequency landmark.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub time: f64,
    pub frequency: f64,
    pub magnitude: f64,
    pub frame_idx: usize,
    pub bin_idx: usize,
}

/// Indices of bins that are strict local maxima within `radius` in
/// `magnitudes`. Bins closer than `radius` to either edge are excluded.
fn local_maxima(magnitudes: &[f64], radius: usize) -> Vec<usize> {
    let n = magnitudes.len();
    if n <= 2 * radius {
        return Vec::new();
    }
    (radius..n - radius)
        .filter(|&i| {
            let center = magnitudes[i];
            (1..=radius).all(|j| center > magnitudes[i - j] && center > magnitudes[i + j])
        })
        .collect()
}

/// The `percentile`-th value (0-100) of `magnitudes`, by sorting a copy.
fn adaptive_threshold(magnitudes: &[f64], percentile: f64) -> f64 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let mut sorted = magnitudes.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((percentile / 100.0) * sorted.len() as f64) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn peaks_in_frame(magnitudes: &[f64], frame_idx: usize, config: &PeakConfig) -> Vec<Peak> {
    let threshold = if config.adaptive {
        adaptive_threshold(magnitudes, config.percentile)
    } else {
        config.fixed_threshold
    };

    let mut candidates: Vec<(usize, f64)> = local_maxima(magnitudes, config.radius)
        .into_iter()
        .filter_map(|bin| {
            let m = magnitudes[bin];
            (m >= threshold).then_some((bin, m))
        })
        .collect();

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    candidates.truncate(config.peaks_per_frame);

    candidates
        .into_iter()
        .map(|(bin, magnitude)| Peak {
            time: 0.0,
            frequency: 0.0,
            magnitude,
            frame_idx,
            bin_idx: bin,
        })
        .collect()
}

/// Detects peaks across every frame of `spectrogram`, then applies the
/// `[freq_min, freq_max]` / `magnitude_min` post-filter (§4.3's final
/// step). The returned list is sorted by time ascending, ties broken
/// by frequency ascending then bin index — the ordering §5 requires
/// before hashing.
pub fn detect(spectrogram: &Spectrogram, config: &PeakConfig) -> Vec<Peak> {
    let mut peaks: Vec<Peak> = spectrogram
        .frames
        .par_iter()
        .enumerate()
        .flat_map_iter(|(frame_idx, magnitudes)| {
            peaks_in_frame(magnitudes, frame_idx, config)
                .into_iter()
                .map(move |mut p| {
                    p.time = frame_idx as f64 * spectrogram.time_resolution;
                    p.frequency = p.bin_idx as f64 * spectrogram.freq_resolution;
                    p
                })
        })
        .collect();

    peaks.retain(|p| {
        p.frequency >= config.freq_min
            && p.frequency <= config.freq_max
            && p.magnitude >= config.magnitude_min
    });

    peaks.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap()
            .then(a.frequency.partial_cmp(&b.frequency).unwrap())
            .then(a.bin_idx.cmp(&b.bin_idx))
    });

    peaks
}
