//! Per-stage configuration structs.
//!
//! One struct per pipeline phase, each with a `Default` impl carrying
//! the spec's numeric defaults — the same shape as the original's
//! `Configuracion` structs (one per class, inline default member
//! initializers), rather than a single global settings object or an
//! external config file. All knobs used during enrollment must be
//! reused verbatim for queries of the same database; callers that
//! build a custom `PipelineConfig` are responsible for keeping it
//! identical across enrollment and query.

/// Spectrogram generation (§4.2).
#[derive(Clone, Debug)]
pub struct SpectrogramConfig {
    /// FFT window size in samples. Must be a power of two.
    pub window_size: usize,
    /// Hop size in samples between successive windows. `1 <= hop <= window_size`.
    pub hop: usize,
    /// Sample index to start analysis from (used to skip leading silence).
    pub start_offset: usize,
    /// Whether to apply a Hamming window before the FFT.
    pub apply_hamming: bool,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        SpectrogramConfig {
            window_size: 1024,
            hop: 512,
            start_offset: 0,
            apply_hamming: true,
        }
    }
}

/// Peak detection (§4.3).
#[derive(Clone, Debug)]
pub struct PeakConfig {
    /// Local-maximum search radius.
    pub radius: usize,
    /// Maximum peaks retained per frame, after thresholding.
    pub peaks_per_frame: usize,
    /// Use the adaptive percentile threshold instead of a fixed one.
    pub adaptive: bool,
    /// Percentile (0-100) used when `adaptive` is set.
    pub percentile: f64,
    /// Magnitude floor used when `adaptive` is false.
    pub fixed_threshold: f64,
    /// Post-filter: minimum accepted frequency in Hz.
    pub freq_min: f64,
    /// Post-filter: maximum accepted frequency in Hz.
    pub freq_max: f64,
    /// Post-filter: minimum accepted magnitude.
    pub magnitude_min: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        PeakConfig {
            radius: 3,
            peaks_per_frame: 5,
            adaptive: true,
            percentile: 75.0,
            fixed_threshold: 0.1,
            freq_min: 100.0,
            freq_max: 5000.0,
            magnitude_min: 0.15,
        }
    }
}

/// Combinatorial hash generation (§4.4).
#[derive(Clone, Debug)]
pub struct HashConfig {
    /// Fan-out time window, in milliseconds.
    pub window_ms: f64,
    /// Maximum number of target peaks paired with a single anchor.
    pub max_targets: usize,
    /// Frequency range used for quantization bounds (not a filter).
    pub freq_min: f64,
    pub freq_max: f64,
    /// Bit widths for (anchor frequency, target frequency, delta-t). Must sum to <= 32.
    pub bits_freq_anchor: u32,
    pub bits_freq_target: u32,
    pub bits_delta_t: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        HashConfig {
            window_ms: 2000.0,
            max_targets: 5,
            freq_min: 30.0,
            freq_max: 5000.0,
            bits_freq_anchor: 9,
            bits_freq_target: 9,
            bits_delta_t: 14,
        }
    }
}

/// Histogram voting (§4.6).
#[derive(Clone, Debug)]
pub struct VotingConfig {
    /// Offset quantization bin width, in seconds.
    pub bin_width_secs: f64,
    /// Minimum votes in the winning bin to be considered a candidate.
    pub min_matches: usize,
    /// Minimum confidence (0-100) to be considered a candidate.
    pub confidence_threshold: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        VotingConfig {
            bin_width_secs: 0.050,
            min_matches: 5,
            confidence_threshold: 15.0,
        }
    }
}

/// Bundles every stage's configuration so enrollment and query can
/// share one value and be certain they agree.
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub spectrogram: SpectrogramConfig,
    pub peaks: PeakConfig,
    pub hashing: HashConfig,
    pub voting: VotingConfig,
}
