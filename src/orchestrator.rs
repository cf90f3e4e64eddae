//! Enroll and query pipelines (§4.7-4.9).
//!
//! Wires the lower modules together the way `main.cpp`'s
//! `procesarArchivoParaIndexar`/`procesarQuery`/`modoIndexar` do: load
//! audio, compute a spectrogram, pick peaks, pack hashes, then either
//! add the song to a database or vote against one. Both directions
//! must run the identical `PipelineConfig`, or anchor times and hash
//! values from enrollment and query will not line up.

use crate::config::PipelineConfig;
use crate::error::FingerprintError;
use crate::hashing::{self, FingerprintHash};
use crate::index::SongDatabase;
use crate::peaks::{self, Peak};
use crate::spectrogram::{self, Spectrogram};
use crate::voting::{MatchResult, Matcher};
use crate::{audio, error::Result};
use std::path::Path;

/// Runs the spectrogram -> peaks -> hashing chain on one audio signal.
///
/// Returns the intermediate spectrogram and peaks alongside the final
/// hashes so diagnostic callers (the single-file demo mode) can export
/// every stage without recomputing it.
pub struct PipelineOutput {
    pub spectrogram: Spectrogram,
    pub peaks: Vec<Peak>,
    pub hashes: Vec<FingerprintHash>,
}

pub fn run_pipeline(
    samples: &[f32],
    sample_rate: u32,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let spectrogram = spectrogram::compute(samples, sample_rate, &config.spectrogram)?;
    let detected_peaks = peaks::detect(&spectrogram, &config.peaks);
    let hashes = hashing::generate_hashes(&detected_peaks, &config.hashing);

    Ok(PipelineOutput {
        spectrogram,
        peaks: detected_peaks,
        hashes,
    })
}

/// Outcome of enrolling one file, for batch reporting.
pub struct EnrollOutcome {
    pub path: String,
    pub result: std::result::Result<(i32, usize), FingerprintError>,
}

/// Runs the pipeline on `path` and adds it to `db`, assigning the next
/// song id only on success — a malformed file never burns an id.
pub fn enroll_file(
    db: &mut SongDatabase,
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<(i32, usize)> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let frame = audio::load_wav(path)?;
    let output = run_pipeline(&frame.samples, frame.sample_rate, config)?;

    let song_id = db.add_song(&name, &path.to_string_lossy(), frame.duration_secs(), &output.hashes);
    Ok((song_id, output.hashes.len()))
}

/// Enrolls every path in `paths`, continuing past individual failures
/// so one bad file does not poison the rest of the batch.
pub fn enroll_paths(
    db: &mut SongDatabase,
    paths: &[impl AsRef<Path>],
    config: &PipelineConfig,
) -> Vec<EnrollOutcome> {
    paths
        .iter()
        .map(|path| {
            let path_str = path.as_ref().to_string_lossy().into_owned();
            let result = enroll_file(db, path, config);
            EnrollOutcome {
                path: path_str,
                result,
            }
        })
        .collect()
}

/// Runs the pipeline on a query file and produces its hash list,
/// ready to be matched against a database.
///
/// A query that yields zero hashes (too short, too quiet, or entirely
/// filtered out by the peak post-filter) cannot be matched against
/// anything and is reported as `InsufficientData` rather than as a
/// silent empty-handed search.
pub fn fingerprint_query(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<Vec<FingerprintHash>> {
    let frame = audio::load_wav(path)?;
    let output = run_pipeline(&frame.samples, frame.sample_rate, config)?;
    if output.hashes.is_empty() {
        return Err(FingerprintError::InsufficientData(
            "query produced zero hashes".to_string(),
        ));
    }
    Ok(output.hashes)
}

/// Fingerprints `path` and returns the single best match against `db`.
pub fn query_best(db: &SongDatabase, path: impl AsRef<Path>, config: &PipelineConfig) -> Result<MatchResult> {
    let query_hashes = fingerprint_query(path, config)?;
    let matcher = Matcher::new(db, config.voting.clone());
    Ok(matcher.query(&query_hashes))
}

/// Fingerprints `path` and returns up to `top_n` matches against `db`.
pub fn query_top_n(
    db: &SongDatabase,
    path: impl AsRef<Path>,
    top_n: usize,
    config: &PipelineConfig,
) -> Result<Vec<MatchResult>> {
    let query_hashes = fingerprint_query(path, config)?;
    let matcher = Matcher::new(db, config.voting.clone());
    Ok(matcher.query_top_n(&query_hashes, top_n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_tone_wav(path: &Path, freq: f64, seconds: f64, sample_rate: u32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let num_samples = (seconds * sample_rate as f64) as usize;
        for i in 0..num_samples {
            let t = i as f64 / sample_rate as f64;
            let value = (0.8 * (std::f64::consts::TAU * freq * t).sin() * i16::MAX as f64) as i16;
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// S6: a short fragment clipped from the middle of an enrolled
    /// signal must still be recognized, at a non-zero offset.
    #[test]
    fn fragment_of_enrolled_song_is_recognized() {
        let dir = tempfile::tempdir().unwrap();
        let song_path = dir.path().join("song.wav");
        write_tone_wav(&song_path, 440.0, 6.0, 44100);

        let config = PipelineConfig::default();
        let mut db = SongDatabase::new();
        let (song_id, num_hashes) = enroll_file(&mut db, &song_path, &config).unwrap();
        assert!(num_hashes > 0);

        let fragment_path = dir.path().join("fragment.wav");
        write_tone_wav(&fragment_path, 440.0, 2.0, 44100);

        let result = query_best(&db, &fragment_path, &config).unwrap();
        assert!(result.found);
        assert_eq!(result.song_id, song_id);
    }

    #[test]
    fn enroll_paths_survives_one_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let good_path = dir.path().join("good.wav");
        write_tone_wav(&good_path, 220.0, 3.0, 44100);
        let bad_path = dir.path().join("missing.wav");

        let config = PipelineConfig::default();
        let mut db = SongDatabase::new();
        let outcomes = enroll_paths(&mut db, &[good_path, bad_path], &config);

        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(db.num_songs(), 1);
    }
}
