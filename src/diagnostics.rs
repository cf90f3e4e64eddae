//! Diagnostic artifact export, used only by the single-file demo mode.
//!
//! Ported from `Espectrograma::exportarCSV`/`dividirEnBandas`/
//! `exportarBandasCSV`, `DetectorPicos::exportarCSV`/`exportarConstelacion`,
//! and `GeneradorHashes::exportarHashes`. Plain `std::fs`/`write!`
//! formatting, same as the original's `ofstream` dumps — these files
//! exist for a human to open in a spreadsheet or plotting tool, not
//! for the pipeline to read back.

use crate::error::FingerprintError;
use crate::hashing::FingerprintHash;
use crate::peaks::Peak;
use crate::spectrogram::Spectrogram;
use std::io::Write;
use std::path::Path;

/// A named frequency band, in Hz, used by [`divide_into_bands`].
#[derive(Clone, Copy, Debug)]
pub struct FrequencyBand {
    pub low: f64,
    pub high: f64,
}

pub fn export_spectrogram_csv(
    spectrogram: &Spectrogram,
    path: impl AsRef<Path>,
) -> Result<(), FingerprintError> {
    let mut file = std::fs::File::create(path)?;

    write!(file, "window,time_s")?;
    for f in 0..spectrogram.num_bins() {
        write!(file, ",{:.2}Hz", f as f64 * spectrogram.freq_resolution)?;
    }
    writeln!(file)?;

    for (v, frame) in spectrogram.frames.iter().enumerate() {
        write!(file, "{},{:.4}", v, v as f64 * spectrogram.time_resolution)?;
        for magnitude in frame {
            write!(file, ",{:.6e}", magnitude)?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Averages each frame's magnitudes within each band, one column per band.
pub fn divide_into_bands(spectrogram: &Spectrogram, bands: &[FrequencyBand]) -> Vec<Vec<f64>> {
    spectrogram
        .frames
        .iter()
        .map(|frame| {
            bands
                .iter()
                .map(|band| {
                    let idx_min = (band.low / spectrogram.freq_resolution) as usize;
                    let idx_max = (band.high / spectrogram.freq_resolution) as usize;
                    let mut sum = 0.0;
                    let mut count = 0usize;
                    for f in idx_min..=idx_max.min(spectrogram.num_bins().saturating_sub(1)) {
                        if let Some(&m) = frame.get(f) {
                            sum += m;
                            count += 1;
                        }
                    }
                    if count > 0 {
                        sum / count as f64
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

pub fn export_bands_csv(
    bands_per_frame: &[Vec<f64>],
    bands: &[FrequencyBand],
    path: impl AsRef<Path>,
) -> Result<(), FingerprintError> {
    let mut file = std::fs::File::create(path)?;

    write!(file, "window")?;
    for band in bands {
        write!(file, ",{}-{}Hz", band.low, band.high)?;
    }
    writeln!(file)?;

    for (v, row) in bands_per_frame.iter().enumerate() {
        write!(file, "{}", v)?;
        for value in row {
            write!(file, ",{:.6e}", value)?;
        }
        writeln!(file)?;
    }
    Ok(())
}

pub fn export_peaks_csv(peaks: &[Peak], path: impl AsRef<Path>) -> Result<(), FingerprintError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "time_s,frequency_hz,magnitude,frame_idx,bin_idx")?;
    for peak in peaks {
        writeln!(
            file,
            "{:.6},{:.6},{:.6e},{},{}",
            peak.time, peak.frequency, peak.magnitude, peak.frame_idx, peak.bin_idx
        )?;
    }
    Ok(())
}

pub fn export_constellation(
    peaks: &[Peak],
    total_duration_secs: f64,
    path: impl AsRef<Path>,
) -> Result<(), FingerprintError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "# spectral peak constellation")?;
    writeln!(file, "# total peaks: {}", peaks.len())?;
    writeln!(file, "# duration: {:.3} seconds", total_duration_secs)?;
    writeln!(file, "# format: time(s) frequency(Hz) magnitude")?;
    for peak in peaks {
        writeln!(file, "{:.4} {:.4} {:.6e}", peak.time, peak.frequency, peak.magnitude)?;
    }
    Ok(())
}

pub fn export_hashes_csv(
    hashes: &[FingerprintHash],
    path: impl AsRef<Path>,
) -> Result<(), FingerprintError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "hash_hex,anchor_time,anchor_idx,target_idx")?;
    for h in hashes {
        writeln!(
            file,
            "0x{:08x},{:.4},{},{}",
            h.value, h.anchor_time, h.anchor_idx, h.target_idx
        )?;
    }
    Ok(())
}
