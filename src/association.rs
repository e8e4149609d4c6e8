//! Association pipeline: resolves one candidate file to a catalog track.
//!
//! Steps run in descending priority over a shared [`AssociationContext`].
//! Each step returns a [`StepOutput`] that is merged into the context before
//! the next step runs. Nothing here fails: "not found", missing inputs and
//! storage errors all become entries in `errors`, and later steps that need
//! the missing value add their own.
//!
//! | Priority | Step |
//! |---|---|
//! | 110 | metadata extraction |
//! | 100 | artist finding |
//! | 80 | album finding |
//! | 70 | track finding + score gate |
//! | 60 | track file creation |
//! | 50 | album status update |

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;

use crate::catalog::{AssociationSink, CatalogRepository};
use crate::config::{ConfigProvider, DEFAULT_MIN_SCORE, MIN_SCORE};
use crate::matcher::TrackMatcher;
use crate::models::{Album, Artist, Track, TrackFile, UnmatchedTrack};
use crate::normalize::normalize_apostrophes;
use crate::path_hints::extract_path_hints;
use crate::tags::TagExtractor;

// ============================================================================
// Context
// ============================================================================

/// Accumulated state of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssociationContext {
    pub dry_run: bool,

    // Text resolved from tags (or the candidate record)
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,

    // Catalog entities resolved so far
    pub artist: Option<Artist>,
    pub album: Option<Album>,
    pub track: Option<Track>,
    pub track_file: Option<TrackFile>,

    pub score: Option<f64>,
    pub match_reason: Option<String>,
    pub metadata: Map<String, Value>,
    pub audio_analysis_count: usize,
    pub errors: Vec<String>,
}

impl AssociationContext {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// A run succeeded iff it resolved a track.
    pub fn is_associated(&self) -> bool {
        self.track.is_some()
    }

    /// Fold a step's output in: set fields overwrite, metadata is
    /// union-merged, counts add up, errors append.
    pub fn merge(&mut self, output: StepOutput) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.title, output.title);
        take(&mut self.artist_name, output.artist_name);
        take(&mut self.album_name, output.album_name);
        take(&mut self.artist, output.artist);
        take(&mut self.album, output.album);
        take(&mut self.track, output.track);
        take(&mut self.track_file, output.track_file);
        take(&mut self.score, output.score);
        take(&mut self.match_reason, output.match_reason);
        self.metadata.extend(output.metadata);
        self.audio_analysis_count += output.audio_analysis_count;
        self.errors.extend(output.errors);
    }
}

/// Partial result of one step. Unset fields leave the context untouched.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub artist: Option<Artist>,
    pub album: Option<Album>,
    pub track: Option<Track>,
    pub track_file: Option<TrackFile>,
    pub score: Option<f64>,
    pub match_reason: Option<String>,
    pub metadata: Map<String, Value>,
    pub audio_analysis_count: usize,
    pub errors: Vec<String>,
}

impl StepOutput {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, key: &str) -> Self {
        self.metadata.insert(key.to_string(), Value::Bool(true));
        self
    }
}

// ============================================================================
// Step Trait
// ============================================================================

pub trait AssociationStep {
    fn kind(&self) -> &'static str;

    /// Higher runs first.
    fn priority(&self) -> i32;

    fn should_run(&self, _context: &AssociationContext) -> bool {
        true
    }

    fn process(&self, candidate: &UnmatchedTrack, context: &AssociationContext) -> StepOutput;
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Metadata Extraction (110)
// ============================================================================

pub struct MetadataExtractionStep<'a> {
    extractor: &'a dyn TagExtractor,
}

impl<'a> MetadataExtractionStep<'a> {
    pub fn new(extractor: &'a dyn TagExtractor) -> Self {
        Self { extractor }
    }
}

impl AssociationStep for MetadataExtractionStep<'_> {
    fn kind(&self) -> &'static str {
        "metadata_extraction"
    }

    fn priority(&self) -> i32 {
        110
    }

    fn process(&self, candidate: &UnmatchedTrack, _context: &AssociationContext) -> StepOutput {
        let mut output = StepOutput {
            title: candidate.title.clone(),
            artist_name: candidate.artist.clone(),
            album_name: candidate.album.clone(),
            ..Default::default()
        };
        output.metadata.insert("title".into(), json!(candidate.title));
        output.metadata.insert("artist".into(), json!(candidate.artist));
        output.metadata.insert("album".into(), json!(candidate.album));
        output.metadata.insert("file_path".into(), json!(candidate.file_path));

        let path = Path::new(&candidate.file_path);
        if candidate.file_path.is_empty() || !path.exists() {
            return output;
        }

        let analysis = match self.extractor.extract(path) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(file = %candidate.file_path, error = %e, "Tag extraction failed");
                return output;
            }
        };
        if let Some(error) = &analysis.error {
            tracing::warn!(file = %candidate.file_path, error = %error, "Tag extraction reported an error");
            return output;
        }

        let tags = &analysis.tags;
        if let Some(title) = non_empty(tags.title.as_deref()) {
            output.title = Some(normalize_apostrophes(title));
        }
        if let Some(artist) = tags.preferred_artist() {
            output.artist_name = Some(normalize_apostrophes(artist));
        }
        if let Some(album) = non_empty(tags.album.as_deref()) {
            output.album_name = Some(normalize_apostrophes(album));
        }

        let m = &mut output.metadata;
        m.insert("title".into(), json!(output.title));
        m.insert("artist".into(), json!(output.artist_name));
        m.insert("album".into(), json!(output.album_name));
        m.insert("track_number".into(), json!(tags.track_number));
        m.insert("year".into(), json!(tags.year));
        m.insert("genre".into(), json!(tags.genre));
        m.insert("composer".into(), json!(tags.composer));
        m.insert("album_artist".into(), json!(tags.album_artist));
        m.insert("performer".into(), json!(tags.performer));
        m.insert("disc_number".into(), json!(tags.disc_number));
        m.insert("total_tracks".into(), json!(tags.total_tracks));
        m.insert("total_discs".into(), json!(tags.total_discs));
        m.insert("comment".into(), json!(tags.comment));
        m.insert(
            "audio_quality".into(),
            json!({
                "format": analysis.format,
                "channels": analysis.channels,
                "bitrate": analysis.bitrate,
                "sample_rate": analysis.sample_rate,
                "bits_per_sample": analysis.bits_per_sample,
                "duration": analysis.duration,
                "quality_level": analysis.quality_level(),
            }),
        );
        output.audio_analysis_count = 1;
        output
    }
}

// ============================================================================
// Artist Finding (100)
// ============================================================================

pub struct ArtistFindingStep<'a> {
    catalog: &'a dyn CatalogRepository,
}

impl<'a> ArtistFindingStep<'a> {
    pub fn new(catalog: &'a dyn CatalogRepository) -> Self {
        Self { catalog }
    }
}

impl AssociationStep for ArtistFindingStep<'_> {
    fn kind(&self) -> &'static str {
        "artist_finding"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn process(&self, candidate: &UnmatchedTrack, context: &AssociationContext) -> StepOutput {
        let name = non_empty(context.artist_name.as_deref())
            .or_else(|| non_empty(candidate.artist.as_deref()));
        let Some(name) = name else {
            return StepOutput::error("No artist name available");
        };

        match self.catalog.find_artist_by_name(name) {
            Ok(Some(artist)) => StepOutput {
                artist: Some(artist),
                ..Default::default()
            }
            .with_flag("artist_found"),
            Ok(None) => StepOutput::error(format!("Artist not found: {}", name)),
            Err(e) => StepOutput::error(format!("Artist lookup failed for {}: {:#}", name, e)),
        }
    }
}

// ============================================================================
// Album Finding (80)
// ============================================================================

pub struct AlbumFindingStep<'a> {
    catalog: &'a dyn CatalogRepository,
}

impl<'a> AlbumFindingStep<'a> {
    pub fn new(catalog: &'a dyn CatalogRepository) -> Self {
        Self { catalog }
    }
}

impl AssociationStep for AlbumFindingStep<'_> {
    fn kind(&self) -> &'static str {
        "album_finding"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn process(&self, candidate: &UnmatchedTrack, context: &AssociationContext) -> StepOutput {
        let Some(artist) = &context.artist else {
            return StepOutput::error("No artist available for album search");
        };
        let title = non_empty(context.album_name.as_deref())
            .or_else(|| non_empty(candidate.album.as_deref()));
        let Some(title) = title else {
            return StepOutput::error("No album name available");
        };

        match self.catalog.find_album_by_title_and_artist_flexible(title, artist) {
            Ok(Some(album)) => StepOutput {
                album: Some(album),
                ..Default::default()
            }
            .with_flag("album_found"),
            Ok(None) => StepOutput::error(format!(
                "Album not found: {} for artist: {}",
                title, artist.name
            )),
            Err(e) => StepOutput::error(format!("Album lookup failed for {}: {:#}", title, e)),
        }
    }
}

// ============================================================================
// Track Finding (70)
// ============================================================================

pub struct TrackFindingStep<'a> {
    catalog: &'a dyn CatalogRepository,
    matcher: &'a TrackMatcher,
    config: &'a dyn ConfigProvider,
}

impl<'a> TrackFindingStep<'a> {
    pub fn new(
        catalog: &'a dyn CatalogRepository,
        matcher: &'a TrackMatcher,
        config: &'a dyn ConfigProvider,
    ) -> Self {
        Self {
            catalog,
            matcher,
            config,
        }
    }

    /// Exact artist+album+title first when an album is known, then the
    /// flexible artist+title lookup.
    fn lookup(&self, artist: &Artist, album: Option<&Album>, title: &str) -> anyhow::Result<Option<Track>> {
        if let Some(album) = album {
            if let Some(track) = self.catalog.find_track_by_artist_album_title(artist, album, title)? {
                return Ok(Some(track));
            }
        }
        self.catalog.find_track_by_artist_title_flexible(artist, title)
    }
}

impl AssociationStep for TrackFindingStep<'_> {
    fn kind(&self) -> &'static str {
        "track_finding"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn process(&self, candidate: &UnmatchedTrack, context: &AssociationContext) -> StepOutput {
        let Some(artist) = &context.artist else {
            return StepOutput::error("No artist available for track search");
        };
        let title = non_empty(context.title.as_deref()).or_else(|| non_empty(candidate.title.as_deref()));
        let Some(title) = title.map(normalize_apostrophes) else {
            return StepOutput::error("No track title available");
        };

        let track = match self.lookup(artist, context.album.as_ref(), &title) {
            Ok(Some(track)) => track,
            Ok(None) => {
                return StepOutput::error(format!(
                    "Track not found: {} for artist: {}",
                    title, artist.name
                ))
            }
            Err(e) => return StepOutput::error(format!("Track lookup failed for {}: {:#}", title, e)),
        };

        let hints = extract_path_hints(&candidate.file_path);
        let score = self.matcher.calculate_match_score(&track, candidate, &hints);
        let reason = self.matcher.match_reason(&track, candidate, &hints);
        let min_score = self.config.get_f64(MIN_SCORE, DEFAULT_MIN_SCORE);

        if score < min_score {
            tracing::debug!(track_id = track.id, score, min_score, "Track rejected by score gate");
            return StepOutput {
                errors: vec![
                    format!("Track found but score too low: {} < {}", score, min_score),
                    format!("Match reason: {}", reason),
                ],
                ..Default::default()
            };
        }

        let mut output = StepOutput {
            track: Some(track),
            score: Some(score),
            match_reason: Some(reason.clone()),
            ..Default::default()
        };
        output.metadata.insert("score".into(), json!(score));
        output.metadata.insert("match_reason".into(), json!(reason));
        output
    }
}

// ============================================================================
// Track File Creation (60)
// ============================================================================

/// Writes the file record for the matched track. Skipped in dry runs.
pub struct TrackFileCreationStep<'a> {
    sink: &'a dyn AssociationSink,
}

impl<'a> TrackFileCreationStep<'a> {
    pub fn new(sink: &'a dyn AssociationSink) -> Self {
        Self { sink }
    }

    fn reuse_existing(&self, candidate: &UnmatchedTrack, track: &Track, mut file: TrackFile) -> anyhow::Result<StepOutput> {
        let mut dirty = false;
        if file.track_id != track.id {
            dirty = true;
        }
        if file.lyrics_path.is_none() && candidate.lyrics_path.is_some() {
            file.lyrics_path = candidate.lyrics_path.clone();
            dirty = true;
        }
        if dirty {
            file = self.sink.attach_file(track, file)?;
        }

        let mut track = track.clone();
        track.has_file = true;
        track.downloaded = true;
        self.sink.save_track(&track)?;

        Ok(StepOutput {
            track: Some(track),
            track_file: Some(file),
            ..Default::default()
        }
        .with_flag("track_file_exists"))
    }

    fn create(&self, candidate: &UnmatchedTrack, track: &Track) -> anyhow::Result<StepOutput> {
        let file = TrackFile {
            id: None,
            track_id: track.id,
            file_path: candidate.file_path.clone(),
            file_size: candidate.file_size,
            format: candidate.extension.clone(),
            duration: candidate.duration,
            lyrics_path: None,
        };
        let file = self.sink.attach_file(track, file)?;
        self.sink.save_track(track)?;

        Ok(StepOutput {
            track_file: Some(file),
            ..Default::default()
        }
        .with_flag("track_file_created"))
    }
}

impl AssociationStep for TrackFileCreationStep<'_> {
    fn kind(&self) -> &'static str {
        "track_file_creation"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn should_run(&self, context: &AssociationContext) -> bool {
        !context.dry_run
    }

    fn process(&self, candidate: &UnmatchedTrack, context: &AssociationContext) -> StepOutput {
        let Some(track) = &context.track else {
            return StepOutput::error("No track available for TrackFile creation");
        };
        if candidate.file_path.is_empty() {
            return StepOutput::error("No file path available");
        }

        let result = match self.sink.find_track_file_by_path(&candidate.file_path) {
            Ok(Some(existing)) => self.reuse_existing(candidate, track, existing),
            Ok(None) => self.create(candidate, track),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            StepOutput::error(format!(
                "Track file update failed for {}: {:#}",
                candidate.file_path, e
            ))
        })
    }
}

// ============================================================================
// Album Status Update (50)
// ============================================================================

/// Marks the album as having files. Skipped in dry runs.
pub struct AlbumStatusUpdateStep<'a> {
    sink: &'a dyn AssociationSink,
}

impl<'a> AlbumStatusUpdateStep<'a> {
    pub fn new(sink: &'a dyn AssociationSink) -> Self {
        Self { sink }
    }
}

impl AssociationStep for AlbumStatusUpdateStep<'_> {
    fn kind(&self) -> &'static str {
        "album_status_update"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn should_run(&self, context: &AssociationContext) -> bool {
        !context.dry_run
    }

    fn process(&self, _candidate: &UnmatchedTrack, context: &AssociationContext) -> StepOutput {
        let Some(track) = &context.track else {
            return StepOutput::error("No track available for album status update");
        };
        let Some(album) = context.album.as_ref().or(track.album.as_ref()) else {
            return StepOutput::error("No album available for status update");
        };

        match self.sink.update_album_status(album) {
            Ok(status) => {
                let mut output = StepOutput::default().with_flag("album_status_updated");
                output.metadata.insert("album_status".into(), json!(status.as_str()));
                output
            }
            Err(e) => StepOutput::error(format!(
                "Album status update failed for {}: {:#}",
                album.title, e
            )),
        }
    }
}

// ============================================================================
// Chain
// ============================================================================

pub struct AssociationStepChain<'a> {
    steps: Vec<Box<dyn AssociationStep + 'a>>,
}

impl<'a> AssociationStepChain<'a> {
    /// Steps are ordered by descending priority; ties keep insertion order.
    pub fn new(mut steps: Vec<Box<dyn AssociationStep + 'a>>) -> Self {
        steps.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        Self { steps }
    }

    /// The six production steps wired to their collaborators.
    pub fn standard(
        extractor: &'a dyn TagExtractor,
        catalog: &'a dyn CatalogRepository,
        sink: &'a dyn AssociationSink,
        matcher: &'a TrackMatcher,
        config: &'a dyn ConfigProvider,
    ) -> Self {
        Self::new(vec![
            Box::new(MetadataExtractionStep::new(extractor)),
            Box::new(ArtistFindingStep::new(catalog)),
            Box::new(AlbumFindingStep::new(catalog)),
            Box::new(TrackFindingStep::new(catalog, matcher, config)),
            Box::new(TrackFileCreationStep::new(sink)),
            Box::new(AlbumStatusUpdateStep::new(sink)),
        ])
    }

    pub fn step_kinds(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.kind()).collect()
    }

    /// Run every applicable step for `candidate`. Always returns a complete
    /// context; check [`AssociationContext::is_associated`] for the outcome.
    pub fn execute(&self, candidate: &UnmatchedTrack, dry_run: bool) -> AssociationContext {
        let mut context = AssociationContext::new(dry_run);

        for step in &self.steps {
            if !step.should_run(&context) {
                tracing::debug!(step = step.kind(), candidate = candidate.id, "Step skipped");
                continue;
            }
            let output = step.process(candidate, &context);
            if !output.errors.is_empty() {
                tracing::debug!(
                    step = step.kind(),
                    candidate = candidate.id,
                    errors = ?output.errors,
                    "Step reported errors"
                );
            }
            context.merge(output);
        }

        context
    }
}

// ============================================================================
// TESTS
// ============================================================================
