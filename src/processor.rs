//! Top-level association run over a batch of candidate files.
//!
//! Candidates already matched are skipped. Every other candidate goes
//! through the step chain; an associated candidate is marked matched and
//! stamped with the attempt time unless the run is a dry run.

use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

use crate::association::AssociationStepChain;
use crate::catalog::CandidateStore;
use crate::config::AssociationSettings;
use crate::models::{score_quality, AssociationStats, UnmatchedTrack};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub dry_run: bool,
}

/// What happened to one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateOutcome {
    pub candidate_id: i64,
    pub file_path: String,
    pub associated: bool,
    pub track_id: Option<i64>,
    pub score: Option<f64>,
    pub match_reason: Option<String>,
    pub audio_analysis_count: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    pub outcomes: Vec<CandidateOutcome>,
    pub stats: AssociationStats,
}

pub struct AssociationProcessor<'a> {
    chain: AssociationStepChain<'a>,
    candidates: &'a dyn CandidateStore,
    settings: AssociationSettings,
}

impl<'a> AssociationProcessor<'a> {
    pub fn new(
        chain: AssociationStepChain<'a>,
        candidates: &'a dyn CandidateStore,
        settings: AssociationSettings,
    ) -> Self {
        Self {
            chain,
            candidates,
            settings,
        }
    }

    pub fn settings(&self) -> &AssociationSettings {
        &self.settings
    }

    pub fn process(&self, candidates: Vec<UnmatchedTrack>, options: ProcessOptions) -> ProcessReport {
        self.process_with_progress(candidates, options, |_| {})
    }

    /// As [`process`](Self::process), calling `on_progress` with the number
    /// of candidates handled so far (skipped ones included).
    pub fn process_with_progress(
        &self,
        candidates: Vec<UnmatchedTrack>,
        options: ProcessOptions,
        mut on_progress: impl FnMut(u64),
    ) -> ProcessReport {
        let start = Instant::now();
        let mut report = ProcessReport::default();

        if !self.settings.auto_association {
            tracing::warn!("Automatic association is disabled; no candidates processed");
            report
                .stats
                .errors
                .push("Automatic association is disabled".to_string());
            return report;
        }

        for (i, mut candidate) in candidates.into_iter().enumerate() {
            report.stats.candidates_seen += 1;

            if candidate.matched {
                report.stats.skipped_count += 1;
            } else {
                let outcome = self.process_candidate(&mut candidate, options);
                let stats = &mut report.stats;
                match outcome.score {
                    Some(score) if outcome.associated => {
                        stats.associated_count += 1;
                        stats.audio_analysis_count += outcome.audio_analysis_count;
                        stats.record_score_band(score);
                    }
                    _ => stats.not_found_count += 1,
                }
                stats.errors.extend(outcome.errors.iter().cloned());
                report.outcomes.push(outcome);
            }

            on_progress(i as u64 + 1);
        }

        report.stats.elapsed_seconds = start.elapsed().as_secs_f64();
        report
    }

    /// Run the chain for one unmatched candidate. On success the candidate is
    /// marked matched in place and persisted, except in a dry run.
    pub fn process_candidate(&self, candidate: &mut UnmatchedTrack, options: ProcessOptions) -> CandidateOutcome {
        let context = self.chain.execute(candidate, options.dry_run);
        let mut errors = context.errors;

        if let (Some(track), Some(score)) = (&context.track, context.score) {
            tracing::info!(
                candidate = candidate.id,
                track_id = track.id,
                title = %track.title,
                score,
                quality = score_quality(score),
                dry_run = options.dry_run,
                "Associated candidate"
            );

            if !options.dry_run {
                candidate.matched = true;
                candidate.last_attempted_match = Some(Utc::now());
                if let Err(e) = self.candidates.save_unmatched_track(candidate) {
                    errors.push(format!("Failed to mark candidate {} as matched: {:#}", candidate.id, e));
                }
            }
        } else {
            tracing::debug!(
                candidate = candidate.id,
                file = %candidate.file_path,
                errors = ?errors,
                "No association"
            );
        }

        CandidateOutcome {
            candidate_id: candidate.id,
            file_path: candidate.file_path.clone(),
            associated: context.track.is_some(),
            track_id: context.track.as_ref().map(|t| t.id),
            score: context.score,
            match_reason: context.match_reason,
            audio_analysis_count: context.audio_analysis_count,
            errors,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssociationSink, CatalogRepository};
    use crate::config::{ConfigProvider, MapConfig, AUTO_ASSOCIATION};
    use crate::matcher::TrackMatcher;
    use crate::models::fixtures;
    use crate::store::SqliteLibrary;
    use crate::tags::LoftyTagExtractor;
    use chrono::NaiveDate;
    use std::sync::Arc;

    /// Catalog with the fixture track plus three candidates: one that
    /// matches, one by an unknown artist, one already matched.
    fn library() -> SqliteLibrary {
        let library = SqliteLibrary::open_in_memory().unwrap();
        let artist = library.insert_artist("Test Artist").unwrap();
        let album = library
            .insert_album(artist, "Test Album", NaiveDate::from_ymd_opt(2020, 1, 1))
            .unwrap();
        library.insert_track(album, "Test Song", Some("01"), Some(180)).unwrap();

        library.insert_unmatched_track(&fixtures::candidate()).unwrap();
        library
            .insert_unmatched_track(&UnmatchedTrack {
                file_path: "/library/Music/Nobody/Nothing/01 Test Song.mp3".to_string(),
                artist: Some("Nobody".to_string()),
                ..fixtures::candidate()
            })
            .unwrap();
        library
            .insert_unmatched_track(&UnmatchedTrack {
                file_path: "/library/done.mp3".to_string(),
                matched: true,
                ..fixtures::candidate()
            })
            .unwrap();
        library
    }

    fn run(library: &SqliteLibrary, config: MapConfig, options: ProcessOptions) -> ProcessReport {
        let config = Arc::new(config);
        let settings = AssociationSettings::from_provider(&*config);
        let matcher = TrackMatcher::with_defaults(config.clone());
        let extractor = LoftyTagExtractor::new();
        let chain = AssociationStepChain::standard(&extractor, library, library, &matcher, &*config);
        let processor = AssociationProcessor::new(chain, library, settings);

        let mut all = library.unmatched_tracks(None).unwrap();
        all.push(UnmatchedTrack {
            matched: true,
            ..fixtures::candidate()
        });
        processor.process(all, options)
    }

    #[test]
    fn test_process_associates_and_marks_matched() {
        let library = library();
        let report = run(&library, MapConfig::new(), ProcessOptions::default());

        let stats = &report.stats;
        assert_eq!(stats.candidates_seen, 3);
        assert_eq!(stats.skipped_count, 1);
        assert_eq!(stats.associated_count, 1);
        assert_eq!(stats.not_found_count, 1);
        assert_eq!(stats.score_excellent, 1);
        assert!(stats.errors.contains(&"Artist not found: Nobody".to_string()));

        let associated = &report.outcomes[0];
        assert!(associated.associated);
        assert_eq!(associated.score, Some(100.0));

        let saved = library.unmatched_track(associated.candidate_id).unwrap().unwrap();
        assert!(saved.matched);
        assert!(saved.last_attempted_match.is_some());

        let file = library
            .find_track_file_by_path(&saved.file_path)
            .unwrap()
            .unwrap();
        assert_eq!(Some(file.track_id), associated.track_id);

        // Second run finds only the unknown-artist candidate left
        assert_eq!(library.unmatched_tracks(None).unwrap().len(), 1);
    }

    #[test]
    fn test_process_dry_run_mutates_nothing() {
        let library = library();
        let report = run(&library, MapConfig::new(), ProcessOptions { dry_run: true });

        assert_eq!(report.stats.associated_count, 1);
        assert_eq!(library.unmatched_tracks(None).unwrap().len(), 2);
        let candidate = &report.outcomes[0];
        assert!(library.find_track_file_by_path(&candidate.file_path).unwrap().is_none());
        let artist = library.find_artist_by_name("Test Artist").unwrap().unwrap();
        let track = library
            .find_track_by_artist_title_flexible(&artist, "Test Song")
            .unwrap()
            .unwrap();
        assert!(!track.has_file);
    }

    #[test]
    fn test_process_respects_min_score() {
        let library = library();
        let config = MapConfig::new().with(crate::config::MIN_SCORE, 101.0);
        let report = run(&library, config, ProcessOptions::default());

        assert_eq!(report.stats.associated_count, 0);
        assert_eq!(report.stats.not_found_count, 2);
        assert!(report
            .stats
            .errors
            .iter()
            .any(|e| e == "Track found but score too low: 100 < 101"));
    }

    #[test]
    fn test_auto_association_disabled() {
        let library = library();
        let config = MapConfig::new().with(AUTO_ASSOCIATION, false);
        assert!(!config.get_bool(AUTO_ASSOCIATION, true));

        let report = run(&library, config, ProcessOptions::default());
        assert!(report.outcomes.is_empty());
        assert_eq!(report.stats.candidates_seen, 0);
        assert_eq!(report.stats.errors, vec!["Automatic association is disabled"]);
        assert_eq!(library.unmatched_tracks(None).unwrap().len(), 2);
    }

    #[test]
    fn test_progress_callback_counts_every_candidate() {
        let library = library();
        let config = Arc::new(MapConfig::new());
        let matcher = TrackMatcher::with_defaults(config.clone());
        let extractor = LoftyTagExtractor::new();
        let chain = AssociationStepChain::standard(&extractor, &library, &library, &matcher, &*config);
        let processor = AssociationProcessor::new(chain, &library, AssociationSettings::default());

        let mut seen = Vec::new();
        let candidates = library.unmatched_tracks(None).unwrap();
        processor.process_with_progress(candidates, ProcessOptions { dry_run: true }, |n| seen.push(n));
        assert_eq!(seen, vec![1, 2]);
    }
}
