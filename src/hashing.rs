//! Combinatorial anchor/target hashing (§4.4).
//!
//! Ported from `GeneradorHashes::generarHashes`: peaks are filtered to
//! a usable frequency range, sorted by time, then each peak anchors a
//! forward-looking search for up to `max_targets` peaks within
//! `window_ms`. Each anchor/target pair is packed into a 32-bit hash.
//! Unlike the original, bit widths are read from `HashConfig` rather
//! than hardcoded, so `encode`/`decode` stay inverses of each other for
//! any valid configuration.

use crate::config::HashConfig;
use crate::peaks::Peak;
use rayon::prelude::*;

/// One combinatorial hash: an anchor/target peak pair collapsed into
/// a 32-bit fingerprint plus the anchor's absolute time, needed later
/// to recover the song-to-query time offset during voting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingerprintHash {
    pub value: u32,
    pub anchor_time: f64,
    pub anchor_idx: usize,
    pub target_idx: usize,
}

/// The three quantized fields packed into a hash, recovered by `decode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedHash {
    pub q_anchor_freq: u32,
    pub q_target_freq: u32,
    pub q_delta_t: u32,
}

fn quantize(value: f64, min: f64, max: f64, bits: u32) -> u32 {
    let norm = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let max_val = (1u32 << bits) - 1;
    (norm * max_val as f64) as u32
}

/// Packs an anchor/target peak pair into a 32-bit hash under `config`.
///
/// Bit layout (high to low): `[anchor_freq : bits_freq_anchor]
/// [target_freq : bits_freq_target] [delta_t : bits_delta_t]`.
pub fn encode(anchor_freq: f64, target_freq: f64, delta_t_ms: f64, config: &HashConfig) -> u32 {
    let q_f1 = quantize(anchor_freq, config.freq_min, config.freq_max, config.bits_freq_anchor);
    let q_f2 = quantize(target_freq, config.freq_min, config.freq_max, config.bits_freq_target);
    let q_dt = quantize(delta_t_ms, 0.0, config.window_ms, config.bits_delta_t);

    (q_f1 << (config.bits_freq_target + config.bits_delta_t))
        | (q_f2 << config.bits_delta_t)
        | q_dt
}

/// Inverts `encode`, recovering the three quantized fields (not the
/// original floats — quantization is lossy).
pub fn decode(hash: u32, config: &HashConfig) -> DecodedHash {
    let dt_mask = (1u32 << config.bits_delta_t) - 1;
    let f2_mask = (1u32 << config.bits_freq_target) - 1;
    let f1_mask = (1u32 << config.bits_freq_anchor) - 1;

    let q_delta_t = hash & dt_mask;
    let q_target_freq = (hash >> config.bits_delta_t) & f2_mask;
    let q_anchor_freq = (hash >> (config.bits_freq_target + config.bits_delta_t)) & f1_mask;

    DecodedHash {
        q_anchor_freq,
        q_target_freq,
        q_delta_t,
    }
}

/// Generates every anchor/target hash from `peaks` under `config`.
///
/// `peaks` need not be pre-sorted; this function sorts its own copy by
/// time first, matching `generarHashes`'s explicit re-sort.
pub fn generate_hashes(peaks: &[Peak], config: &HashConfig) -> Vec<FingerprintHash> {
    let mut filtered: Vec<Peak> = peaks
        .iter()
        .copied()
        .filter(|p| p.frequency >= config.freq_min && p.frequency <= config.freq_max)
        .collect();
    filtered.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap());

    if filtered.is_empty() {
        return Vec::new();
    }

    let window_secs = config.window_ms / 1000.0;

    log::debug!(
        "hashing: {} peaks in range, window={} ms, max_targets={}",
        filtered.len(),
        config.window_ms,
        config.max_targets
    );

    let hashes: Vec<FingerprintHash> = (0..filtered.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let anchor = filtered[i];
            let time_limit = anchor.time + window_secs;
            filtered[i + 1..]
                .iter()
                .enumerate()
                .take_while(|(_, target)| target.time <= time_limit)
                .filter(|(_, target)| target.time > anchor.time)
                .take(config.max_targets)
                .map(move |(offset, target)| {
                    let j = i + 1 + offset;
                    let delta_t_ms = (target.time - anchor.time) * 1000.0;
                    let value = encode(anchor.frequency, target.frequency, delta_t_ms, config);
                    FingerprintHash {
                        value,
                        anchor_time: anchor.time,
                        anchor_idx: i,
                        target_idx: j,
                    }
                })
        })
        .collect();

    hashes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(time: f64, frequency: f64) -> Peak {
        Peak {
            time,
            frequency,
            magnitude: 1.0,
            frame_idx: 0,
            bin_idx: 0,
        }
    }

    /// S3: encode/decode must round-trip the quantized triple, and
    /// small (±0.5 Hz) jitter in the input frequencies must not change
    /// the quantized bins most of the time (coarse quantization is the
    /// whole point of robustness to noise).
    #[test]
    fn encode_decode_round_trip() {
        let config = HashConfig::default();
        let hash = encode(440.0, 880.0, 350.0, &config);
        let decoded = decode(hash, &config);

        let expected_f1 = quantize(440.0, config.freq_min, config.freq_max, config.bits_freq_anchor);
        let expected_f2 = quantize(880.0, config.freq_min, config.freq_max, config.bits_freq_target);
        let expected_dt = quantize(350.0, 0.0, config.window_ms, config.bits_delta_t);

        assert_eq!(decoded.q_anchor_freq, expected_f1);
        assert_eq!(decoded.q_target_freq, expected_f2);
        assert_eq!(decoded.q_delta_t, expected_dt);
    }

    #[test]
    fn small_frequency_jitter_usually_preserves_quantized_bin() {
        let config = HashConfig::default();
        let base = encode(440.0, 880.0, 350.0, &config);
        let jittered = encode(440.3, 880.3, 350.0, &config);
        assert_eq!(decode(base, &config).q_anchor_freq, decode(jittered, &config).q_anchor_freq);
    }

    #[test]
    fn anchor_never_pairs_with_non_strictly_later_peak() {
        let peaks = vec![peak(1.0, 200.0), peak(1.0, 300.0), peak(1.5, 400.0)];
        let config = HashConfig::default();
        let hashes = generate_hashes(&peaks, &config);
        for h in &hashes {
            let target = peaks[h.target_idx];
            assert!(target.time > peaks[h.anchor_idx].time);
        }
    }

    #[test]
    fn max_targets_per_anchor_is_respected() {
        let peaks: Vec<Peak> = (0..10).map(|i| peak(i as f64 * 0.01, 200.0 + i as f64)).collect();
        let config = HashConfig {
            max_targets: 3,
            window_ms: 10_000.0,
            ..HashConfig::default()
        };
        let hashes = generate_hashes(&peaks, &config);
        let anchor0_count = hashes.iter().filter(|h| h.anchor_idx == 0).count();
        assert_eq!(anchor0_count, 3);
    }

    #[test]
    fn empty_peaks_yield_no_hashes() {
        let config = HashConfig::default();
        assert!(generate_hashes(&[], &config).is_empty());
    }
}
