//! Inverted index and song database (§4.5).
//!
//! Ported from `IndiceInvertido`/`BaseDatosHashes`: a `hash -> Vec<(song_id,
//! anchor_time)>` posting-list map, plus a song-id-keyed metadata store.
//! The binary index layout keeps the original's field order and sizes
//! byte-for-byte, but pins it to little-endian explicitly — the
//! original's `fwrite`/`fread` of raw structs is host-endian and would
//! silently corrupt a database moved between architectures.

use crate::error::FingerprintError;
use crate::hashing::FingerprintHash;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexEntry {
    pub song_id: i32,
    pub anchor_time: f64,
}

/// Aggregate counts over the index, mirroring `obtenerEstadisticas`.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexStats {
    pub total_hashes: usize,
    pub total_entries: usize,
    pub unique_hashes: usize,
    pub duplicated_hashes: usize,
    pub avg_entries_per_hash: f64,
    pub max_entries_in_hash: usize,
}

/// `hash -> [(song_id, anchor_time)]`, append-only during enrollment.
#[derive(Clone, Debug, Default)]
pub struct InvertedIndex {
    table: HashMap<u32, Vec<IndexEntry>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex {
            table: HashMap::new(),
        }
    }

    pub fn add(&mut self, hash: u32, song_id: i32, anchor_time: f64) {
        self.table
            .entry(hash)
            .or_default()
            .push(IndexEntry { song_id, anchor_time });
    }

    pub fn lookup(&self, hash: u32) -> Option<&[IndexEntry]> {
        self.table.get(&hash).map(|v| v.as_slice())
    }

    pub fn contains(&self, hash: u32) -> bool {
        self.table.contains_key(&hash)
    }

    pub fn num_unique_hashes(&self) -> usize {
        self.table.len()
    }

    pub fn stats(&self) -> IndexStats {
        let total_hashes = self.table.len();
        let mut total_entries = 0usize;
        let mut unique_hashes = 0usize;
        let mut duplicated_hashes = 0usize;
        let mut max_entries_in_hash = 0usize;

        for entries in self.table.values() {
            let n = entries.len();
            total_entries += n;
            if n == 1 {
                unique_hashes += 1;
            } else {
                duplicated_hashes += 1;
            }
            max_entries_in_hash = max_entries_in_hash.max(n);
        }

        let avg_entries_per_hash = if total_hashes > 0 {
            total_entries as f64 / total_hashes as f64
        } else {
            0.0
        };

        IndexStats {
            total_hashes,
            total_entries,
            unique_hashes,
            duplicated_hashes,
            avg_entries_per_hash,
            max_entries_in_hash,
        }
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Writes the index in the fixed little-endian layout:
    /// `u64 num_hashes; per hash { u32 value; u64 num_entries; per entry { i32 song_id; f64 anchor_time } }`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FingerprintError> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&(self.table.len() as u64).to_le_bytes())?;

        for (&hash, entries) in &self.table {
            file.write_all(&hash.to_le_bytes())?;
            file.write_all(&(entries.len() as u64).to_le_bytes())?;
            for entry in entries {
                file.write_all(&entry.song_id.to_le_bytes())?;
                file.write_all(&entry.anchor_time.to_le_bytes())?;
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FingerprintError> {
        let mut file = std::fs::File::open(path)?;
        let mut index = InvertedIndex::new();

        let num_hashes = read_u64(&mut file)?;
        for _ in 0..num_hashes {
            let hash = read_u32(&mut file)?;
            let num_entries = read_u64(&mut file)?;
            let mut entries = Vec::with_capacity(num_entries as usize);
            for _ in 0..num_entries {
                let song_id = read_i32(&mut file)?;
                let anchor_time = read_f64(&mut file)?;
                entries.push(IndexEntry { song_id, anchor_time });
            }
            index.table.insert(hash, entries);
        }
        Ok(index)
    }
}

fn read_u32(r: &mut impl Read) -> Result<u32, FingerprintError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> Result<i32, FingerprintError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> Result<u64, FingerprintError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> Result<f64, FingerprintError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(f64::from_le_bytes(buf))
}

fn malformed(e: std::io::Error) -> FingerprintError {
    FingerprintError::MalformedDatabase(format!("truncated index file: {e}"))
}

/// Per-song metadata, mirroring `MetadatosCancion`.
#[derive(Clone, Debug, PartialEq)]
pub struct SongMetadata {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub duration: f64,
    pub num_hashes: usize,
}

/// Aggregate counts over the song catalog, mirroring `BaseDatosHashes::Estadisticas`.
#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseStats {
    pub total_songs: usize,
    pub total_hashes: usize,
    pub total_duration: f64,
    pub avg_hashes_per_song: f64,
    pub avg_hashes_per_second: f64,
}

/// The full on-disk database: an `InvertedIndex` plus a song catalog.
#[derive(Clone, Debug, Default)]
pub struct SongDatabase {
    index: InvertedIndex,
    songs: HashMap<i32, SongMetadata>,
    next_id: i32,
}

impl SongDatabase {
    pub fn new() -> Self {
        SongDatabase {
            index: InvertedIndex::new(),
            songs: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    /// Registers a song and its hashes, returning the assigned id.
    /// `next_id` only advances here, so a failed enrollment upstream
    /// (audio that never reaches this call) never burns an id.
    pub fn add_song(
        &mut self,
        name: &str,
        path: &str,
        duration: f64,
        hashes: &[FingerprintHash],
    ) -> i32 {
        let song_id = self.next_id;
        self.next_id += 1;

        self.songs.insert(
            song_id,
            SongMetadata {
                id: song_id,
                name: name.to_string(),
                path: path.to_string(),
                duration,
                num_hashes: hashes.len(),
            },
        );

        for hash in hashes {
            self.index.add(hash.value, song_id, hash.anchor_time);
        }

        log::info!("added song '{name}' (id={song_id}, {} hashes)", hashes.len());
        song_id
    }

    pub fn metadata(&self, song_id: i32) -> Option<&SongMetadata> {
        self.songs.get(&song_id)
    }

    pub fn by_name(&self, name: &str) -> Option<&SongMetadata> {
        self.songs.values().find(|m| m.name == name)
    }

    pub fn num_songs(&self) -> usize {
        self.songs.len()
    }

    pub fn list_songs(&self) -> Vec<&SongMetadata> {
        let mut songs: Vec<&SongMetadata> = self.songs.values().collect();
        songs.sort_by_key(|s| s.id);
        songs
    }

    pub fn stats(&self) -> DatabaseStats {
        let total_songs = self.songs.len();
        let total_hashes: usize = self.songs.values().map(|s| s.num_hashes).sum();
        let total_duration: f64 = self.songs.values().map(|s| s.duration).sum();

        let avg_hashes_per_song = if total_songs > 0 {
            total_hashes as f64 / total_songs as f64
        } else {
            0.0
        };
        let avg_hashes_per_second = if total_duration > 0.0 {
            total_hashes as f64 / total_duration
        } else {
            0.0
        };

        DatabaseStats {
            total_songs,
            total_hashes,
            total_duration,
            avg_hashes_per_song,
            avg_hashes_per_second,
        }
    }

    /// Saves `{base}_metadata.txt` (human-readable) and `{base}_index.bin`
    /// (binary posting lists).
    pub fn save(&self, base_path: impl AsRef<Path>) -> Result<(), FingerprintError> {
        let base = base_path.as_ref();
        let metadata_path = with_suffix(base, "_metadata.txt");
        let index_path = with_suffix(base, "_index.bin");

        let mut text = String::new();
        text.push_str("[METADATA]\n");
        text.push_str(&format!("num_songs={}\n", self.songs.len()));
        text.push_str("version=1.0\n\n");

        let mut songs: Vec<&SongMetadata> = self.songs.values().collect();
        songs.sort_by_key(|s| s.id);
        for song in songs {
            text.push_str(&format!("[SONG_{}]\n", song.id));
            text.push_str(&format!("id={}\n", song.id));
            text.push_str(&format!("name={}\n", song.name));
            text.push_str(&format!("path={}\n", song.path));
            text.push_str(&format!("duration={:.3}\n", song.duration));
            text.push_str(&format!("num_hashes={}\n\n", song.num_hashes));
        }

        std::fs::write(&metadata_path, text)?;
        self.index.save(&index_path)?;

        log::info!(
            "saved database: {} songs, {} unique hashes",
            self.songs.len(),
            self.index.num_unique_hashes()
        );
        Ok(())
    }

    pub fn load(base_path: impl AsRef<Path>) -> Result<Self, FingerprintError> {
        let base = base_path.as_ref();
        let metadata_path = with_suffix(base, "_metadata.txt");
        let index_path = with_suffix(base, "_index.bin");

        let text = std::fs::read_to_string(&metadata_path)?;
        let mut songs = HashMap::new();
        let mut next_id = 0;

        let mut current_id: Option<i32> = None;
        let mut current_name = String::new();
        let mut current_path = String::new();
        let mut current_duration = 0.0;
        let mut current_num_hashes = 0usize;

        let flush = |songs: &mut HashMap<i32, SongMetadata>,
                     id: Option<i32>,
                     name: &str,
                     path: &str,
                     duration: f64,
                     num_hashes: usize,
                     next_id: &mut i32| {
            if let Some(id) = id {
                if !name.is_empty() {
                    songs.insert(
                        id,
                        SongMetadata {
                            id,
                            name: name.to_string(),
                            path: path.to_string(),
                            duration,
                            num_hashes,
                        },
                    );
                    if id >= *next_id {
                        *next_id = id + 1;
                    }
                }
            }
        };

        for line in text.lines() {
            if line.is_empty() || line.starts_with('[') {
                flush(
                    &mut songs,
                    current_id,
                    &current_name,
                    &current_path,
                    current_duration,
                    current_num_hashes,
                    &mut next_id,
                );
                if line.starts_with("[SONG_") {
                    current_id = None;
                    current_name.clear();
                    current_path.clear();
                    current_duration = 0.0;
                    current_num_hashes = 0;
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "id" => {
                    current_id = value.parse().ok();
                }
                "name" => current_name = value.to_string(),
                "path" => current_path = value.to_string(),
                "duration" => current_duration = value.parse().unwrap_or(0.0),
                "num_hashes" => current_num_hashes = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        flush(
            &mut songs,
            current_id,
            &current_name,
            &current_path,
            current_duration,
            current_num_hashes,
            &mut next_id,
        );

        let index = InvertedIndex::load(&index_path)?;

        log::info!(
            "loaded database: {} songs, {} unique hashes",
            songs.len(),
            index.num_unique_hashes()
        );

        Ok(SongDatabase {
            index,
            songs,
            next_id,
        })
    }
}

fn with_suffix(base: &Path, suffix: &str) -> std::path::PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    std::path::PathBuf::from(s)
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
    fn lookup_returns_entries_in_insertion_order() {
        let mut index = InvertedIndex::new();
        index.add(42, 0, 1.0);
        index.add(42, 1, 2.0);
        let entries = index.lookup(42).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].song_id, 0);
        assert_eq!(entries[1].song_id, 1);
    }

    #[test]
    fn unknown_hash_returns_none() {
        let index = InvertedIndex::new();
        assert!(index.lookup(99).is_none());
    }

    #[test]
    fn stats_counts_unique_and_duplicated_hashes() {
        let mut index = InvertedIndex::new();
        index.add(1, 0, 0.0);
        index.add(2, 0, 0.0);
        index.add(2, 1, 1.0);
        let stats = index.stats();
        assert_eq!(stats.total_hashes, 2);
        assert_eq!(stats.unique_hashes, 1);
        assert_eq!(stats.duplicated_hashes, 1);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.max_entries_in_hash, 2);
    }

    /// S4: an index/database saved and reloaded must reproduce every
    /// posting list and every song's metadata exactly.
    #[test]
    fn database_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("mydb");

        let mut db = SongDatabase::new();
        let id = db.add_song(
            "Track One",
            "/music/track_one.wav",
            123.456,
            &[hash(10, 0.5), hash(20, 1.5)],
        );
        assert_eq!(id, 0);
        db.save(&base).unwrap();

        let loaded = SongDatabase::load(&base).unwrap();
        assert_eq!(loaded.num_songs(), 1);
        let meta = loaded.metadata(0).unwrap();
        assert_eq!(meta.name, "Track One");
        assert_eq!(meta.path, "/music/track_one.wav");
        assert!((meta.duration - 123.456).abs() < 1e-9);
        assert_eq!(meta.num_hashes, 2);

        assert!(loaded.index().contains(10));
        assert!(loaded.index().contains(20));
        let entries = loaded.index().lookup(10).unwrap();
        assert_eq!(entries[0].song_id, 0);
        assert!((entries[0].anchor_time - 0.5).abs() < 1e-9);
    }

    #[test]
    fn song_id_only_advances_after_successful_add() {
        let mut db = SongDatabase::new();
        let first = db.add_song("A", "a.wav", 1.0, &[]);
        let second = db.add_song("B", "b.wav", 1.0, &[]);
        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }
}
