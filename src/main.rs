use anyhow::{Context, Result};
use catalog_match::association::AssociationStepChain;
use catalog_match::catalog::CandidateStore;
use catalog_match::config::{AssociationSettings, MIN_SCORE};
use catalog_match::matcher::TrackMatcher;
use catalog_match::processor::{AssociationProcessor, ProcessOptions};
use catalog_match::progress::{
    format_duration, init_logging, is_log_only, set_log_only, CandidateProgress,
};
use catalog_match::safety::validate_report_path;
use catalog_match::store::SqliteLibrary;
use catalog_match::tags::LoftyTagExtractor;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "catalog-match")]
#[command(about = "Associate unmatched audio files with catalog tracks")]
struct Args {
    /// Library database (SQLite)
    library: PathBuf,

    /// Score and report without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Process at most this many unmatched candidates
    #[arg(long)]
    limit: Option<usize>,

    /// Override association.min_score from the configuration table
    #[arg(long)]
    min_score: Option<f64>,

    /// Write run statistics as JSON
    #[arg(long)]
    stats_output: Option<PathBuf>,

    /// Hide progress bars and print periodic progress lines
    #[arg(long)]
    log_only: bool,
}

const LOG_INTERVAL: u64 = 500;

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    init_logging();

    if let Some(ref path) = args.stats_output {
        validate_report_path(path, &args.library)?;
    }

    let start = Instant::now();

    println!("Opening library: {:?}", args.library);
    let library = SqliteLibrary::open(&args.library)?;

    let mut config = library
        .configuration()
        .context("Failed to load configuration")?;
    if let Some(min_score) = args.min_score {
        config.set(MIN_SCORE, min_score);
    }
    let config = Arc::new(config);
    let settings = AssociationSettings::from_provider(&*config);
    println!(
        "Min score: {} (exact artist: {}, exact title: {}, exact duration: {})",
        settings.min_score,
        settings.exact_artist_match,
        settings.exact_title_match,
        settings.exact_duration_match
    );

    let candidates = library
        .unmatched_tracks(args.limit)
        .context("Failed to read unmatched tracks")?;
    println!("Found {} unmatched candidates", candidates.len());

    let matcher = TrackMatcher::with_defaults(config.clone());
    let extractor = LoftyTagExtractor::new();
    let chain = AssociationStepChain::standard(&extractor, &library, &library, &matcher, &*config);
    let processor = AssociationProcessor::new(chain, &library, settings);

    let total = candidates.len() as u64;
    let progress = CandidateProgress::new("Associating", total, LOG_INTERVAL);
    let report = processor.process_with_progress(
        candidates,
        ProcessOptions {
            dry_run: args.dry_run,
        },
        |done| progress.set_done(done),
    );
    progress.finish(format!(
        "Associated {} of {}",
        report.stats.associated_count, total
    ));

    let stats = &report.stats;
    if is_log_only() {
        stats.log_phase("association");
    }
    if let Some(ref path) = args.stats_output {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
        println!("Stats written to {:?}", path);
    }

    println!("\n{:=<60}", "");
    println!(
        "Association complete{}",
        if args.dry_run { " (dry run)" } else { "" }
    );
    println!("  Candidates: {}", stats.candidates_seen);
    println!("  Skipped (already matched): {}", stats.skipped_count);
    println!(
        "  Associated: {} ({:.1}%)",
        stats.associated_count,
        stats.association_rate()
    );
    println!(
        "    excellent: {}  good: {}  fair: {}  poor: {}",
        stats.score_excellent, stats.score_good, stats.score_fair, stats.score_poor
    );
    println!("  Not found: {}", stats.not_found_count);
    println!("  Audio files analyzed: {}", stats.audio_analysis_count);
    println!("  Errors: {}", stats.errors.len());
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
