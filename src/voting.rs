//! Offset-histogram voting and match ranking (§4.6).
//!
//! Ported from `SistemaVotacion`/`BuscadorCanciones`: every query hash
//! that also appears in the database casts one vote per posting,
//! keyed by `(song_id, quantized_offset)`. A song with a vote in its
//! winning bin above `min_matches` and a confidence above
//! `confidence_threshold` becomes a candidate. Offsets are quantized
//! to an integer bin index rather than a rounded float, per the
//! Design Notes guidance against float-keyed histograms — two offsets
//! that round to the same float can still hash to different map
//! buckets because of floating point representation, silently
//! splitting what should be one bin.

use crate::config::VotingConfig;
use crate::hashing::FingerprintHash;
use crate::index::{InvertedIndex, SongDatabase};
use std::collections::BTreeMap;
use std::time::Instant;

/// One song's strongest offset and how many hashes voted for it.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateResult {
    pub song_id: i32,
    pub total_matches: usize,
    pub best_offset_secs: f64,
    pub best_votes: usize,
    pub confidence: f64,
}

fn offset_bin(offset_secs: f64, bin_width_secs: f64) -> i64 {
    (offset_secs / bin_width_secs).round() as i64
}

fn confidence(best_votes: usize, total_query_hashes: usize) -> f64 {
    if total_query_hashes == 0 {
        return 0.0;
    }
    (100.0 * best_votes as f64 / total_query_hashes as f64).clamp(0.0, 100.0)
}

/// `song_id -> offset_bin -> vote count`, plus a running total per song.
///
/// Both levels use `BTreeMap` rather than `HashMap` so iteration order
/// is the sorted key order on every run, not the randomized order
/// `std::collections::HashMap` gives per-process. That determinism is
/// what lets peak-bin and candidate-song selection break ties the same
/// way every time (spec §4.6/§9).
struct VotingSystem {
    histograms: BTreeMap<i32, BTreeMap<i64, usize>>,
    counters: BTreeMap<i32, usize>,
    config: VotingConfig,
}

impl VotingSystem {
    fn new(config: VotingConfig) -> Self {
        VotingSystem {
            histograms: BTreeMap::new(),
            counters: BTreeMap::new(),
            config,
        }
    }

    fn register_vote(&mut self, song_id: i32, query_time: f64, db_time: f64) {
        let offset = db_time - query_time;
        let bin = offset_bin(offset, self.config.bin_width_secs);

        *self
            .histograms
            .entry(song_id)
            .or_default()
            .entry(bin)
            .or_insert(0) += 1;
        *self.counters.entry(song_id).or_insert(0) += 1;
    }

    /// Picks the winning bin of one song's histogram. Ties are broken
    /// by first-seen in ascending-bin traversal, i.e. the smallest bin
    /// among those tied for the most votes wins.
    fn peak_bin(histogram: &BTreeMap<i64, usize>) -> (i64, usize) {
        let mut best_bin = 0i64;
        let mut best_votes = 0usize;
        for (&bin, &votes) in histogram {
            if votes > best_votes {
                best_bin = bin;
                best_votes = votes;
            }
        }
        (best_bin, best_votes)
    }

    fn results(&self, total_query_hashes: usize) -> Vec<CandidateResult> {
        let mut out = Vec::new();

        for (&song_id, histogram) in &self.histograms {
            let (best_bin, best_votes) = Self::peak_bin(histogram);

            if best_votes < self.config.min_matches {
                continue;
            }

            let conf = confidence(best_votes, total_query_hashes);
            if conf < self.config.confidence_threshold {
                continue;
            }

            out.push(CandidateResult {
                song_id,
                total_matches: self.counters[&song_id],
                best_offset_secs: best_bin as f64 * self.config.bin_width_secs,
                best_votes,
                confidence: conf,
            });
        }

        // Stable sort over a BTreeMap-ordered (ascending song_id) input:
        // confidence ties keep the lower song_id first, deterministically.
        out.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
        out
    }
}

/// A final, user-facing match, mirroring `BuscadorCanciones::Resultado`.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub found: bool,
    pub song_id: i32,
    pub song_name: String,
    pub offset_secs: f64,
    pub confidence: f64,
    pub matches: usize,
    pub total_query_hashes: usize,
    /// Wall-clock time spent casting votes and ranking candidates, in
    /// milliseconds. Does not include fingerprinting the query audio.
    pub search_ms: f64,
}

impl MatchResult {
    fn not_found(total_query_hashes: usize, search_ms: f64) -> Self {
        MatchResult {
            found: false,
            song_id: -1,
            song_name: String::new(),
            offset_secs: 0.0,
            confidence: 0.0,
            matches: 0,
            total_query_hashes,
            search_ms,
        }
    }
}

fn to_match_result(
    candidate: &CandidateResult,
    db: &SongDatabase,
    total: usize,
    search_ms: f64,
) -> MatchResult {
    let name = db
        .metadata(candidate.song_id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    MatchResult {
        found: true,
        song_id: candidate.song_id,
        song_name: name,
        offset_secs: candidate.best_offset_secs,
        confidence: candidate.confidence,
        matches: candidate.best_votes,
        total_query_hashes: total,
        search_ms,
    }
}

/// Looks up each query hash in `index`, casting votes, and ranks the
/// resulting candidates against `db`'s metadata.
pub struct Matcher<'a> {
    db: &'a SongDatabase,
    config: VotingConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(db: &'a SongDatabase, config: VotingConfig) -> Self {
        Matcher { db, config }
    }

    fn cast_votes(&self, query_hashes: &[FingerprintHash]) -> VotingSystem {
        let index: &InvertedIndex = self.db.index();
        let mut voting = VotingSystem::new(self.config.clone());

        for hash in query_hashes {
            if let Some(entries) = index.lookup(hash.value) {
                for entry in entries {
                    voting.register_vote(entry.song_id, hash.anchor_time, entry.anchor_time);
                }
            }
        }
        voting
    }

    /// Returns only the single best match, or `found: false` if no
    /// candidate cleared both thresholds.
    pub fn query(&self, query_hashes: &[FingerprintHash]) -> MatchResult {
        let started = Instant::now();
        let voting = self.cast_votes(query_hashes);
        let results = voting.results(query_hashes.len());
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match results.first() {
            Some(best) => to_match_result(best, self.db, query_hashes.len(), elapsed_ms),
            None => MatchResult::not_found(query_hashes.len(), elapsed_ms),
        }
    }

    /// Returns up to `top_n` candidates ranked by confidence descending.
    pub fn query_top_n(&self, query_hashes: &[FingerprintHash], top_n: usize) -> Vec<MatchResult> {
        let started = Instant::now();
        let voting = self.cast_votes(query_hashes);
        let results = voting.results(query_hashes.len());
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        results
            .iter()
            .take(top_n)
            .map(|c| to_match_result(c, self.db, query_hashes.len(), elapsed_ms))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(value: u32, anchor_time: f64) -> FingerprintHash {
        FingerprintHash {
            value,
            anchor_time,
            anchor_idx: 0,
            target_idx: 1,
        }
    }

    #[test]
    fn offset_bin_groups_nearby_offsets() {
        assert_eq!(offset_bin(1.02, 0.05), offset_bin(1.03, 0.05));
        assert_ne!(offset_bin(1.00, 0.05), offset_bin(1.20, 0.05));
    }

    #[test]
    fn confidence_clamped_to_0_100() {
        assert_eq!(confidence(200, 100), 100.0);
        assert_eq!(confidence(0, 100), 0.0);
        assert_eq!(confidence(0, 0), 0.0);
    }

    /// S5: a query built from the same hashes as the enrolled song,
    /// at a fixed offset, must be recovered as a high-confidence self-match.
    #[test]
    fn self_match_recovers_song_and_offset() {
        let mut db = SongDatabase::new();
        let song_hashes = vec![hash(111, 0.0), hash(222, 1.0), hash(333, 2.0), hash(444, 3.0), hash(555, 4.0)];
        let id = db.add_song("Self Match Song", "song.wav", 10.0, &song_hashes);

        let offset = 3.0;
        let query_hashes: Vec<FingerprintHash> = song_hashes
            .iter()
            .map(|h| hash(h.value, h.anchor_time - offset))
            .collect();

        let matcher = Matcher::new(&db, VotingConfig {
            min_matches: 3,
            confidence_threshold: 10.0,
            ..VotingConfig::default()
        });
        let result = matcher.query(&query_hashes);

        assert!(result.found);
        assert_eq!(result.song_id, id);
        assert!((result.offset_secs - offset).abs() < 1e-6);
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn unmatched_hashes_yield_not_found() {
        let db = SongDatabase::new();
        let matcher = Matcher::new(&db, VotingConfig::default());
        let result = matcher.query(&[hash(1, 0.0)]);
        assert!(!result.found);
    }

    #[test]
    fn query_top_n_respects_limit_and_ordering() {
        let mut db = SongDatabase::new();
        let hashes_a = vec![hash(1, 0.0), hash(2, 1.0), hash(3, 2.0), hash(4, 3.0), hash(5, 4.0)];
        let hashes_b = vec![hash(1, 0.0), hash(2, 1.0), hash(3, 2.0)];
        db.add_song("A", "a.wav", 5.0, &hashes_a);
        db.add_song("B", "b.wav", 3.0, &hashes_b);

        let query: Vec<FingerprintHash> = hashes_a.clone();
        let matcher = Matcher::new(&db, VotingConfig {
            min_matches: 1,
            confidence_threshold: 0.0,
            ..VotingConfig::default()
        });
        let top = matcher.query_top_n(&query, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].song_name, "A");
    }
}
