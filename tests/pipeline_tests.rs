//! End-to-end tests over the enroll -> query pipeline, exercising the
//! seed scenarios from spec.md's testable-properties section that need
//! more than one song or more than one module to demonstrate.

use hound::{SampleFormat, WavSpec, WavWriter};
use sonarmark::orchestrator::{enroll_file, query_best};
use sonarmark::{PipelineConfig, SongDatabase};
use std::path::Path;

// ============================================================================
// Helpers
// ============================================================================

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
        // A couple of harmonics, so the spectrogram has more than one
        // landmark per frame to pick from.
        let value = (0.6 * (std::f64::consts::TAU * freq * t).sin()
            + 0.3 * (std::f64::consts::TAU * freq * 2.0 * t).sin())
            * i16::MAX as f64;
        writer.write_sample(value as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn write_noise_wav(path: &Path, seconds: f64, sample_rate: u32, seed: u64) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let num_samples = (seconds * sample_rate as f64) as usize;
    let mut state = seed.wrapping_mul(2_685_821_657_736_338_717).max(1);
    for _ in 0..num_samples {
        // xorshift64, deterministic and dependency-free.
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let unit = (state % 65536) as f64 / 65536.0 - 0.5;
        writer.write_sample((unit * i16::MAX as f64) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Clips `[start_s, start_s + len_s)` of a WAV file into a new file,
/// at the same sample rate, for fragment-match testing.
fn write_fragment_wav(src: &Path, dst: &Path, start_s: f64, len_s: f64) {
    let mut reader = hound::WavReader::open(src).unwrap();
    let spec = reader.spec();
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();

    let start = (start_s * spec.sample_rate as f64) as usize;
    let end = ((start_s + len_s) * spec.sample_rate as f64) as usize;
    let end = end.min(samples.len());

    let mut writer = WavWriter::create(dst, spec).unwrap();
    for &s in &samples[start..end] {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

// ============================================================================
// S4 - index round-trip across a save/load cycle
// ============================================================================

#[test]
fn two_song_database_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let song_a = dir.path().join("a.wav");
    let song_b = dir.path().join("b.wav");
    write_tone_wav(&song_a, 440.0, 10.0, 44100);
    write_tone_wav(&song_b, 880.0, 10.0, 44100);

    let config = PipelineConfig::default();
    let mut db = SongDatabase::new();
    let (id_a, hashes_a) = enroll_file(&mut db, &song_a, &config).unwrap();
    let (id_b, hashes_b) = enroll_file(&mut db, &song_b, &config).unwrap();
    assert_ne!(id_a, id_b);

    let db_base = dir.path().join("corpus");
    db.save(&db_base).unwrap();

    let loaded = SongDatabase::load(&db_base).unwrap();
    assert_eq!(loaded.num_songs(), 2);
    assert_eq!(loaded.metadata(id_a).unwrap().num_hashes, hashes_a);
    assert_eq!(loaded.metadata(id_b).unwrap().num_hashes, hashes_b);

    let original_stats = db.index().stats();
    let loaded_stats = loaded.index().stats();
    assert_eq!(original_stats.total_hashes, loaded_stats.total_hashes);
    assert_eq!(original_stats.total_entries, loaded_stats.total_entries);
}

// ============================================================================
// S5 - self match
// ============================================================================

#[test]
fn querying_with_the_full_enrolled_file_finds_itself() {
    let dir = tempfile::tempdir().unwrap();
    let song_path = dir.path().join("song.wav");
    write_tone_wav(&song_path, 523.25, 30.0, 44100);

    let config = PipelineConfig::default();
    let mut db = SongDatabase::new();
    let (song_id, _) = enroll_file(&mut db, &song_path, &config).unwrap();

    let result = query_best(&db, &song_path, &config).unwrap();
    assert!(result.found);
    assert_eq!(result.song_id, song_id);
    assert!(result.offset_secs.abs() <= config.voting.bin_width_secs);
    assert!(result.confidence >= 50.0);
}

// ============================================================================
// S6 - fragment match
// ============================================================================

#[test]
fn querying_a_ten_second_fragment_recovers_its_offset() {
    let dir = tempfile::tempdir().unwrap();
    let song_path = dir.path().join("song.wav");
    write_tone_wav(&song_path, 330.0, 30.0, 44100);

    let config = PipelineConfig::default();
    let mut db = SongDatabase::new();
    let (song_id, _) = enroll_file(&mut db, &song_path, &config).unwrap();

    let fragment_path = dir.path().join("fragment.wav");
    write_fragment_wav(&song_path, &fragment_path, 10.0, 8.0);

    let result = query_best(&db, &fragment_path, &config).unwrap();
    assert!(result.found);
    assert_eq!(result.song_id, song_id);
    let tolerance = 2.0 * config.voting.bin_width_secs;
    assert!(
        (result.offset_secs - 10.0).abs() <= tolerance,
        "expected offset near 10s, got {}",
        result.offset_secs
    );
}

// ============================================================================
// S9 - non-match rejection
// ============================================================================

#[test]
fn white_noise_against_a_real_corpus_is_not_a_confident_match() {
    let dir = tempfile::tempdir().unwrap();
    let song_a = dir.path().join("a.wav");
    let song_b = dir.path().join("b.wav");
    write_tone_wav(&song_a, 440.0, 15.0, 44100);
    write_tone_wav(&song_b, 660.0, 15.0, 44100);

    let config = PipelineConfig::default();
    let mut db = SongDatabase::new();
    enroll_file(&mut db, &song_a, &config).unwrap();
    enroll_file(&mut db, &song_b, &config).unwrap();

    let noise_path = dir.path().join("noise.wav");
    write_noise_wav(&noise_path, 8.0, 44100, 42);

    match query_best(&db, &noise_path, &config) {
        Ok(result) => assert!(
            !result.found || result.confidence < config.voting.confidence_threshold,
            "white noise should not be a confident match, got {:?}",
            result
        ),
        Err(err) => {
            // A query that happens to fingerprint to zero hashes is an
            // equally valid form of rejection.
            assert!(matches!(err, sonarmark::FingerprintError::InsufficientData(_)));
        }
    }
}
