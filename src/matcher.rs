//! Track matcher: scores catalog tracks against one candidate file.
//!
//! Single-pair scores are clamped to `[0, 100]`. Ranking many tracks is
//! embarrassingly parallel and fans out over rayon; results are collected in
//! input order before the stable sort so equal scores keep catalog order.

use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::calculators::CalculatorKind;
use crate::config::ConfigProvider;
use crate::models::{Track, UnmatchedTrack};
use crate::normalize::{similarity, DEFAULT_SIMILARITY_THRESHOLD};
use crate::path_hints::{extract_path_hints, PathHints};
use crate::scoring::ScoreCalculatorChain;

// ============================================================================
// Constants
// ============================================================================

/// Matches must score strictly above this to be ranked.
pub const MIN_RANKED_SCORE: f64 = 0.1;

pub const MAX_SCORE: f64 = 100.0;

pub const DEFAULT_RANK_LIMIT: usize = 10;

const NO_MATCH_REASON: &str = "No significant matches found";

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch<'a> {
    pub track: &'a Track,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    pub title: Option<String>,
    pub track_number: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchAnalysis {
    /// Capped at 100, not floored
    pub total_score: f64,
    pub reasons: Vec<String>,
    pub path_hints: PathHints,
    pub available_kinds: Vec<CalculatorKind>,
    pub track: TrackSummary,
    pub candidate: TrackSummary,
}

// ============================================================================
// Matcher
// ============================================================================

pub struct TrackMatcher {
    chain: ScoreCalculatorChain,
}

impl TrackMatcher {
    pub fn new(chain: ScoreCalculatorChain) -> Self {
        Self { chain }
    }

    pub fn with_defaults(config: Arc<dyn ConfigProvider>) -> Self {
        Self::new(ScoreCalculatorChain::with_defaults(config))
    }

    pub fn chain(&self) -> &ScoreCalculatorChain {
        &self.chain
    }

    /// Summed calculator score clamped to `[0, 100]`.
    pub fn calculate_match_score(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> f64 {
        self.chain
            .execute(track, candidate, hints)
            .score
            .clamp(0.0, MAX_SCORE)
    }

    pub fn match_reason(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> String {
        let reasons = self.chain.execute(track, candidate, hints).reasons;
        if reasons.is_empty() {
            NO_MATCH_REASON.to_string()
        } else {
            reasons.join(", ")
        }
    }

    /// Rank `tracks` for `candidate`, best first, at most `limit` entries.
    pub fn find_best_matches<'a>(
        &self,
        candidate: &UnmatchedTrack,
        tracks: &'a [Track],
        limit: usize,
    ) -> Vec<RankedMatch<'a>> {
        let hints = extract_path_hints(&candidate.file_path);

        let scored: Vec<Option<RankedMatch<'a>>> = tracks
            .par_iter()
            .map(|track| {
                let result = self.chain.execute(track, candidate, &hints);
                let score = result.score.clamp(0.0, MAX_SCORE);
                if score <= MIN_RANKED_SCORE {
                    return None;
                }
                let reason = if result.reasons.is_empty() {
                    NO_MATCH_REASON.to_string()
                } else {
                    result.reasons.join(", ")
                };
                Some(RankedMatch { track, score, reason })
            })
            .collect();

        let mut matches: Vec<RankedMatch<'a>> = scored.into_iter().flatten().collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(limit);
        matches
    }

    /// Equivalence check between two catalog tracks: mean of artist, album
    /// and title similarity against `threshold`. Not the scoring chain.
    pub fn are_tracks_similar(&self, a: &Track, b: &Track, threshold: Option<f64>) -> bool {
        let threshold = threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        let (Some(artist_a), Some(artist_b)) = (a.artist_name(), b.artist_name()) else {
            return false;
        };
        let (Some(album_a), Some(album_b)) = (a.album_title(), b.album_title()) else {
            return false;
        };

        let overall = (similarity(artist_a, artist_b)
            + similarity(album_a, album_b)
            + similarity(&a.title, &b.title))
            / 3.0;
        overall >= threshold
    }

    /// Partial score from the listed calculators only. Capped at 100, not floored.
    pub fn calculate_match_score_with_kinds(
        &self,
        track: &Track,
        candidate: &UnmatchedTrack,
        hints: &PathHints,
        kinds: &[CalculatorKind],
    ) -> f64 {
        self.chain
            .execute_with_kinds(track, candidate, hints, kinds)
            .score
            .min(MAX_SCORE)
    }

    pub fn detailed_analysis(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> MatchAnalysis {
        let result = self.chain.execute(track, candidate, hints);
        MatchAnalysis {
            total_score: result.score.min(MAX_SCORE),
            reasons: result.reasons,
            path_hints: hints.clone(),
            available_kinds: self.chain.available_kinds(),
            track: TrackSummary {
                title: Some(track.title.clone()),
                track_number: track.track_number.clone(),
                album: track.album_title().map(str::to_string),
                artist: track.artist_name().map(str::to_string),
            },
            candidate: TrackSummary {
                title: candidate.title.clone(),
                track_number: candidate.track_number.clone(),
                album: candidate.album.clone(),
                artist: candidate.artist.clone(),
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::models::fixtures;

    fn matcher() -> TrackMatcher {
        TrackMatcher::with_defaults(Arc::new(MapConfig::new()))
    }

    fn track_titled(id: i64, title: &str) -> Track {
        Track {
            id,
            title: title.to_string(),
            ..fixtures::track()
        }
    }

    #[test]
    fn test_exact_match_dominance() {
        let matcher = matcher();
        let candidate = fixtures::candidate();
        let hints = extract_path_hints(&candidate.file_path);
        let track = fixtures::track();

        let score = matcher.calculate_match_score(&track, &candidate, &hints);
        assert!(score > 80.0);
        assert_eq!(score, 100.0);
        assert!(matcher.match_reason(&track, &candidate, &hints).contains("Exact title match"));
    }

    #[test]
    fn test_score_floored_at_zero() {
        let matcher = matcher();
        let track = Track {
            title: "Zzzz".to_string(),
            duration: None,
            track_number: Some("1".to_string()),
            album: Some(fixtures::album("Qqqq", "Wwww", None)),
            ..fixtures::track()
        };
        let candidate = UnmatchedTrack {
            title: Some("Test Song".to_string()),
            artist: Some("Test Artist".to_string()),
            album: Some("Test Album".to_string()),
            track_number: Some("12".to_string()),
            ..Default::default()
        };
        let hints = PathHints::default();
        // artist -15, album -10, track number -5, title 0
        assert!(matcher.chain().execute(&track, &candidate, &hints).score < 0.0);
        assert_eq!(matcher.calculate_match_score(&track, &candidate, &hints), 0.0);
        assert_eq!(
            matcher.calculate_match_score_with_kinds(&track, &candidate, &hints, &[CalculatorKind::Artist]),
            -15.0
        );
    }

    #[test]
    fn test_match_reason_empty() {
        let matcher = matcher();
        let track = Track {
            album: None,
            ..fixtures::track()
        };
        assert_eq!(
            matcher.match_reason(&track, &fixtures::candidate(), &PathHints::default()),
            "No significant matches found"
        );
    }

    #[test]
    fn test_find_best_matches_ranking() {
        let matcher = matcher();
        let candidate = fixtures::candidate();
        // Weaker on every factor but artist, so it stays below the clamp
        let weaker = Track {
            id: 1,
            title: "Another Song".to_string(),
            track_number: None,
            duration: None,
            album: Some(fixtures::album("Other Album", "Test Artist", None)),
            ..fixtures::track()
        };
        let tracks = vec![
            weaker,
            track_titled(2, "Test Song"),
            track_titled(3, "Test Song"),
            Track {
                id: 4,
                album: None,
                ..fixtures::track()
            },
        ];

        let matches = matcher.find_best_matches(&candidate, &tracks, DEFAULT_RANK_LIMIT);
        // Track 4 is unscorable and filtered out
        assert_eq!(matches.len(), 3);
        // Equal scores keep input order
        assert_eq!(matches[0].track.id, 2);
        assert_eq!(matches[1].track.id, 3);
        assert_eq!(matches[2].track.id, 1);
        assert!(matches[2].score < 100.0);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(matches[0].reason.starts_with("Exact title match"));

        let limited = matcher.find_best_matches(&candidate, &tracks, 1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].track.id, 2);
    }

    #[test]
    fn test_find_best_matches_empty() {
        let matcher = matcher();
        assert!(matcher.find_best_matches(&fixtures::candidate(), &[], 10).is_empty());
    }

    #[test]
    fn test_are_tracks_similar() {
        let matcher = matcher();
        let a = fixtures::track();
        let b = track_titled(2, "Test Song (Live)");
        assert!(matcher.are_tracks_similar(&a, &a, None));
        assert!(matcher.are_tracks_similar(&a, &b, None));

        let c = Track {
            title: "Completely Other".to_string(),
            album: Some(fixtures::album("Nothing Alike", "Somebody Else", None)),
            ..fixtures::track()
        };
        assert!(!matcher.are_tracks_similar(&a, &c, None));
        assert!(matcher.are_tracks_similar(&a, &c, Some(0.0)));

        let orphan = Track {
            album: None,
            ..fixtures::track()
        };
        assert!(!matcher.are_tracks_similar(&a, &orphan, Some(0.0)));
    }

    #[test]
    fn test_detailed_analysis() {
        let matcher = matcher();
        let candidate = fixtures::candidate();
        let hints = extract_path_hints(&candidate.file_path);
        let analysis = matcher.detailed_analysis(&fixtures::track(), &candidate, &hints);

        assert_eq!(analysis.total_score, 100.0);
        assert_eq!(analysis.reasons.len(), 6);
        assert_eq!(analysis.path_hints.artist.as_deref(), Some("Test Artist"));
        assert_eq!(analysis.available_kinds.len(), 7);
        assert_eq!(analysis.track.artist.as_deref(), Some("Test Artist"));
        assert_eq!(analysis.candidate.album.as_deref(), Some("Test Album"));
    }
}
