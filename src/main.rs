//! Command-line front end: diagnostic demo, enroll (`--indexar`), and
//! query (`--buscar`) modes, matching `main.cpp`'s `modoDemo`/
//! `modoIndexar`/`modoBuscar` one-to-one. `clap`'s subcommands don't
//! fit this surface (the demo mode is a bare positional, the other two
//! are flags each followed by a variable-length file list), so a flat
//! `Parser` with `trailing_var_arg` captures whichever tail applies.

use anyhow::{bail, Context, Result};
use clap::Parser;
use sonarmark::orchestrator;
use sonarmark::{PipelineConfig, SongDatabase};
use std::path::PathBuf;

/// Shazam-style acoustic fingerprinting and recognition engine.
#[derive(Parser, Debug)]
#[command(name = "sonarmark", version, about)]
struct Cli {
    /// Enroll mode: index the given WAV files into DATABASE.
    #[arg(long = "indexar", value_name = "DATABASE")]
    indexar: Option<String>,

    /// Query mode: search DATABASE for the given WAV file.
    #[arg(long = "buscar", value_name = "DATABASE")]
    buscar: Option<String>,

    /// Number of ranked candidates to report in query mode.
    #[arg(long = "top", default_value_t = 1)]
    top: usize,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Remaining positional arguments: song files to enroll, the
    /// query file, or the single demo-mode file, depending on mode.
    #[arg(trailing_var_arg = true, allow_hyphen_values = false)]
    rest: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match (&cli.indexar, &cli.buscar) {
        (Some(_), Some(_)) => bail!("--indexar and --buscar are mutually exclusive"),
        (Some(db), None) => run_enroll(db, &cli.rest),
        (None, Some(db)) => run_query(db, &cli.rest, cli.top),
        (None, None) => run_demo(&cli.rest),
    }
}

fn run_demo(rest: &[String]) -> Result<()> {
    let Some(file) = rest.first() else {
        bail!("usage: sonarmark <file.wav>");
    };

    println!("=== Acoustic fingerprinting diagnostic ===");
    println!("File: {file}");

    let frame = sonarmark::audio::load_wav(file).context("failed to read audio file")?;
    let start = sonarmark::audio::find_audio_start(&frame.samples, 0.01);
    println!(
        "Detected audio start at sample {start} ({:.3}s of leading silence)",
        start as f64 / frame.sample_rate as f64
    );

    let mut config = PipelineConfig::default();
    config.spectrogram.start_offset = start;

    let output = orchestrator::run_pipeline(&frame.samples, frame.sample_rate, &config)?;
    println!(
        "Spectrogram: {} windows x {} bins",
        output.spectrogram.num_frames(),
        output.spectrogram.num_bins()
    );
    println!("Peaks detected: {}", output.peaks.len());
    println!("Fingerprints generated: {}", output.hashes.len());

    sonarmark::diagnostics::export_spectrogram_csv(&output.spectrogram, "spectrogram.csv")?;

    let bands = [
        sonarmark::diagnostics::FrequencyBand { low: 30.0, high: 40.0 },
        sonarmark::diagnostics::FrequencyBand { low: 40.0, high: 80.0 },
        sonarmark::diagnostics::FrequencyBand { low: 80.0, high: 120.0 },
        sonarmark::diagnostics::FrequencyBand { low: 120.0, high: 180.0 },
        sonarmark::diagnostics::FrequencyBand { low: 180.0, high: 300.0 },
    ];
    let bands_per_frame = sonarmark::diagnostics::divide_into_bands(&output.spectrogram, &bands);
    sonarmark::diagnostics::export_bands_csv(&bands_per_frame, &bands, "bandas_frecuencia.csv")?;

    sonarmark::diagnostics::export_peaks_csv(&output.peaks, "picos_completos.csv")?;
    sonarmark::diagnostics::export_constellation(
        &output.peaks,
        output.spectrogram.num_frames() as f64 * output.spectrogram.time_resolution,
        "constelacion.txt",
    )?;
    sonarmark::diagnostics::export_hashes_csv(&output.hashes, "fingerprints.csv")?;

    println!("\nOutput files written:");
    println!("  spectrogram.csv");
    println!("  bandas_frecuencia.csv");
    println!("  picos_completos.csv");
    println!("  constelacion.txt");
    println!("  fingerprints.csv");

    Ok(())
}

fn run_enroll(db_name: &str, files: &[String]) -> Result<()> {
    if files.is_empty() {
        bail!("usage: sonarmark --indexar <database> <file1.wav> [file2.wav] ...");
    }

    println!("=== Enrolling songs into '{db_name}' ===");

    let base = PathBuf::from(db_name);
    let metadata_path = {
        let mut p = base.as_os_str().to_os_string();
        p.push("_metadata.txt");
        PathBuf::from(p)
    };

    let mut db = if metadata_path.exists() {
        println!("Existing database found, loading...");
        SongDatabase::load(&base)?
    } else {
        SongDatabase::new()
    };

    let config = PipelineConfig::default();
    let outcomes = orchestrator::enroll_paths(&mut db, files, &config);

    let mut succeeded = 0;
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok((song_id, num_hashes)) => {
                println!("  OK  {} (id={song_id}, {num_hashes} hashes)", outcome.path);
                succeeded += 1;
            }
            Err(err) => {
                eprintln!("  FAIL {}: {err}", outcome.path);
                failed += 1;
            }
        }
    }

    db.save(&base)?;

    println!("\nEnrollment summary: {succeeded} succeeded, {failed} failed");
    println!("Database now holds {} song(s)", db.num_songs());
    println!("\n>> Use 'sonarmark --buscar {db_name} query.wav' to search");

    Ok(())
}

fn run_query(db_name: &str, rest: &[String], top: usize) -> Result<()> {
    let Some(query_file) = rest.first() else {
        bail!("usage: sonarmark --buscar <database> <query.wav> [--top N]");
    };

    println!("=== Searching '{db_name}' ===");
    let db = SongDatabase::load(db_name).context("failed to load database")?;
    println!(
        "Loaded {} song(s), {} unique hash(es)",
        db.num_songs(),
        db.index().num_unique_hashes()
    );

    let config = PipelineConfig::default();

    if top <= 1 {
        let result = orchestrator::query_best(&db, query_file, &config)?;
        print_result(&result);
    } else {
        let results = orchestrator::query_top_n(&db, query_file, top, &config)?;
        println!("\n=== Top {top} results ===");
        if results.is_empty() {
            println!("No matches found");
        } else {
            for (i, result) in results.iter().enumerate() {
                println!(
                    "#{} - {} (confidence {:.1}%, offset {:.2}s)",
                    i + 1,
                    result.song_name,
                    result.confidence,
                    result.offset_secs
                );
            }
        }
    }

    Ok(())
}

fn print_result(result: &sonarmark::MatchResult) {
    println!("\n=== Match result ===");
    if !result.found {
        println!("No match found ({} query hashes analyzed)", result.total_query_hashes);
        return;
    }

    println!("Song: {}", result.song_name);
    println!("Confidence: {:.1}%", result.confidence);
    println!("Offset: {:.2}s", result.offset_secs);
    println!(
        "Matches: {} of {} hashes",
        result.matches, result.total_query_hashes
    );
    println!("Search time: {:.2}ms", result.search_ms);

    let level = if result.confidence >= 70.0 {
        "VERY HIGH"
    } else if result.confidence >= 50.0 {
        "HIGH"
    } else if result.confidence >= 30.0 {
        "MEDIUM"
    } else {
        "LOW"
    };
    println!("Confidence level: {level}");
}
