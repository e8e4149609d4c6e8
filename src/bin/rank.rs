use anyhow::{bail, Context, Result};
use catalog_match::calculators::CalculatorKind;
use catalog_match::catalog::CandidateStore;
use catalog_match::matcher::{TrackMatcher, DEFAULT_RANK_LIMIT};
use catalog_match::models::{score_quality, Track};
use catalog_match::path_hints::extract_path_hints;
use catalog_match::progress::{init_logging, loading_spinner, set_log_only};
use catalog_match::store::SqliteLibrary;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rank-candidates")]
#[command(about = "Rank catalog tracks for one unmatched audio file")]
struct Args {
    /// Library database (SQLite)
    library: PathBuf,

    /// Unmatched track id
    candidate: i64,

    #[arg(long, default_value_t = DEFAULT_RANK_LIMIT)]
    limit: usize,

    /// Also report a partial score from these calculators (comma-separated,
    /// e.g. "title,artist,trackNumber")
    #[arg(long)]
    only: Option<String>,

    /// Print the full score breakdown for the best match
    #[arg(long)]
    explain: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "0")]
    workers: usize,
}

#[derive(Serialize)]
struct RankRow<'a> {
    rank: usize,
    score: f64,
    quality: &'static str,
    partial_score: Option<f64>,
    reason: &'a str,
    track: &'a Track,
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.json);
    init_logging();

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let kinds = args
        .only
        .as_deref()
        .map(CalculatorKind::parse_list)
        .transpose()?;

    let library = SqliteLibrary::open(&args.library)?;
    let Some(candidate) = library.unmatched_track(args.candidate)? else {
        bail!("Unmatched track {} not found", args.candidate);
    };

    let spinner = loading_spinner("Loading catalog");
    let tracks = library.all_tracks()?;
    spinner.finish_with_message(format!("Loaded {} catalog tracks", tracks.len()));

    let config = Arc::new(library.configuration()?);
    let matcher = TrackMatcher::with_defaults(config);
    let hints = extract_path_hints(&candidate.file_path);
    let matches = matcher.find_best_matches(&candidate, &tracks, args.limit);

    let rows: Vec<RankRow> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| RankRow {
            rank: i + 1,
            score: m.score,
            quality: score_quality(m.score),
            partial_score: kinds
                .as_deref()
                .map(|k| matcher.calculate_match_score_with_kinds(m.track, &candidate, &hints, k)),
            reason: &m.reason,
            track: m.track,
        })
        .collect();

    let analysis = if args.explain {
        matches
            .first()
            .map(|best| matcher.detailed_analysis(best.track, &candidate, &hints))
    } else {
        None
    };

    if args.json {
        let output = serde_json::json!({
            "candidate": candidate,
            "path_hints": hints,
            "matches": rows,
            "analysis": analysis,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "\nCandidate [{}] {} - {} - {}",
        candidate.id,
        candidate.artist.as_deref().unwrap_or("?"),
        candidate.album.as_deref().unwrap_or("?"),
        candidate.title.as_deref().unwrap_or("?"),
    );
    println!("  Path: {}", candidate.file_path);
    println!("{:-<80}", "");

    if rows.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    for row in &rows {
        let partial = row
            .partial_score
            .map(|p| format!(" partial={:.1}", p))
            .unwrap_or_default();
        println!(
            "{:>2}. [{:.1} {}{}] [{}] {} - {} - {}",
            row.rank,
            row.score,
            row.quality,
            partial,
            row.track.id,
            row.track.artist_name().unwrap_or("?"),
            row.track.album_title().unwrap_or("?"),
            row.track.title,
        );
        println!("      {}", row.reason);
    }

    if let Some(analysis) = analysis {
        println!("\nBest match breakdown (total {:.1}):", analysis.total_score);
        for reason in &analysis.reasons {
            println!("  - {}", reason);
        }
        println!(
            "  Path hints: artist={:?} album={:?} year={:?} track={:?}",
            analysis.path_hints.artist,
            analysis.path_hints.album,
            analysis.path_hints.year,
            analysis.path_hints.track_number
        );
    }

    Ok(())
}
