//! Interchangeable scoring strategies and the chain that picks one of them.
//!
//! Strategies inside one chain are alternatives, not signals to add up: the
//! chain walks them by descending priority and the first non-zero score is
//! the chain's score. Reasons follow the same rule with "first `Some`".

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::{ConfigProvider, EXACT_ARTIST_MATCH, EXACT_DURATION_MATCH};
use crate::normalize::similarity;
use crate::path_hints::PathHints;

// ============================================================================
// Strategy Trait + Chain
// ============================================================================

/// One way of scoring a single factor. `T` is the compared value: `str` for
/// names and track numbers, `u32` for durations.
pub trait ScoringStrategy<T: ?Sized>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher runs first.
    fn priority(&self) -> i32;

    fn score(&self, catalog: &T, candidate: &T, hints: &PathHints) -> f64;

    fn reason(&self, catalog: &T, candidate: &T, hints: &PathHints) -> Option<String>;
}

/// Priority-ordered list of strategies, sorted once at construction.
pub struct StrategyChain<T: ?Sized> {
    strategies: Vec<Box<dyn ScoringStrategy<T>>>,
}

impl<T: ?Sized> StrategyChain<T> {
    /// Equal priorities keep their insertion order.
    pub fn new(mut strategies: Vec<Box<dyn ScoringStrategy<T>>>) -> Self {
        strategies.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        Self { strategies }
    }

    /// First non-zero strategy score, else 0.0.
    pub fn score(&self, catalog: &T, candidate: &T, hints: &PathHints) -> f64 {
        self.strategies
            .iter()
            .map(|s| s.score(catalog, candidate, hints))
            .find(|&score| score != 0.0)
            .unwrap_or(0.0)
    }

    /// First strategy reason, if any.
    pub fn reason(&self, catalog: &T, candidate: &T, hints: &PathHints) -> Option<String> {
        self.strategies
            .iter()
            .find_map(|s| s.reason(catalog, candidate, hints))
    }

    /// Strategy names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Artist chain as wired in production: both exact variants, the path hint
/// and fuzzy similarity.
pub fn default_artist_chain(config: Arc<dyn ConfigProvider>) -> StrategyChain<str> {
    StrategyChain::new(vec![
        Box::new(ExactArtistMatch::new(Arc::clone(&config))),
        Box::new(ExactMatch::new(config)),
        Box::new(ArtistPathMatch),
        Box::new(ArtistSimilarity),
    ])
}

pub fn default_album_chain() -> StrategyChain<str> {
    StrategyChain::new(vec![
        Box::new(ExactAlbumMatch),
        Box::new(AlbumPathMatch),
        Box::new(AlbumSimilarity),
    ])
}

pub fn default_duration_chain(config: Arc<dyn ConfigProvider>) -> StrategyChain<u32> {
    StrategyChain::new(vec![
        Box::new(ExactDuration::new(config)),
        Box::new(ApproximateDuration),
    ])
}

pub fn default_track_number_chain() -> StrategyChain<str> {
    StrategyChain::new(vec![
        Box::new(ExactTrackNumber),
        Box::new(VinylTrackNumber),
        Box::new(NumericTrackNumber),
    ])
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

// ============================================================================
// Artist Strategies
// ============================================================================

const STRICT_ARTIST_PENALTY: f64 = -50.0;

/// Case-insensitive equality, +30. Penalized when strict artist matching is on.
pub struct ExactArtistMatch {
    config: Arc<dyn ConfigProvider>,
}

impl ExactArtistMatch {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }
}

impl ScoringStrategy<str> for ExactArtistMatch {
    fn name(&self) -> &'static str {
        "exact_artist_match"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        if eq_ignore_case(catalog, candidate) {
            30.0
        } else if self.config.get_bool(EXACT_ARTIST_MATCH, false) {
            STRICT_ARTIST_PENALTY
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        if eq_ignore_case(catalog, candidate) {
            Some("Artist match".to_string())
        } else if self.config.get_bool(EXACT_ARTIST_MATCH, false) {
            Some("Artist mismatch (exact match required)".to_string())
        } else {
            None
        }
    }
}

/// Lower-weighted exact variant (+25). Only reached when [`ExactArtistMatch`]
/// is absent from the chain, since both fire on the same condition.
pub struct ExactMatch {
    config: Arc<dyn ConfigProvider>,
}

impl ExactMatch {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }
}

impl ScoringStrategy<str> for ExactMatch {
    fn name(&self) -> &'static str {
        "exact_match"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        if eq_ignore_case(catalog, candidate) {
            25.0
        } else if self.config.get_bool(EXACT_ARTIST_MATCH, false) {
            STRICT_ARTIST_PENALTY
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        if eq_ignore_case(catalog, candidate) {
            Some("Exact artist match".to_string())
        } else if self.config.get_bool(EXACT_ARTIST_MATCH, false) {
            Some("Artist mismatch (exact match required)".to_string())
        } else {
            None
        }
    }
}

/// Catalog artist equals the artist directory in the file path.
pub struct ArtistPathMatch;

impl ArtistPathMatch {
    fn matches(catalog: &str, hints: &PathHints) -> bool {
        hints
            .artist
            .as_deref()
            .is_some_and(|artist| eq_ignore_case(catalog, artist))
    }
}

impl ScoringStrategy<str> for ArtistPathMatch {
    fn name(&self) -> &'static str {
        "artist_path_match"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn score(&self, catalog: &str, _candidate: &str, hints: &PathHints) -> f64 {
        if Self::matches(catalog, hints) {
            20.0
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, _candidate: &str, hints: &PathHints) -> Option<String> {
        Self::matches(catalog, hints).then(|| "Directory artist match".to_string())
    }
}

pub struct ArtistSimilarity;

impl ScoringStrategy<str> for ArtistSimilarity {
    fn name(&self) -> &'static str {
        "artist_similarity"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        let sim = similarity(catalog, candidate);
        if sim > 0.8 {
            sim * 5.0
        } else if sim < 0.3 {
            -15.0
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        let sim = similarity(catalog, candidate);
        if sim > 0.8 {
            Some(format!("Artist similarity ({:.2})", sim))
        } else if sim < 0.3 {
            Some(format!("Artist mismatch penalty ({:.2})", sim))
        } else {
            None
        }
    }
}

// ============================================================================
// Album Strategies
// ============================================================================

/// Trimmed, case-insensitive equality, +25.
pub struct ExactAlbumMatch;

impl ScoringStrategy<str> for ExactAlbumMatch {
    fn name(&self) -> &'static str {
        "exact_album_match"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        if eq_ignore_case(catalog.trim(), candidate.trim()) {
            25.0
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        eq_ignore_case(catalog.trim(), candidate.trim()).then(|| "Exact album match".to_string())
    }
}

/// Catalog album equals the album directory in the file path.
pub struct AlbumPathMatch;

impl AlbumPathMatch {
    fn matches(catalog: &str, hints: &PathHints) -> bool {
        hints
            .album
            .as_deref()
            .is_some_and(|album| eq_ignore_case(catalog, album))
    }
}

impl ScoringStrategy<str> for AlbumPathMatch {
    fn name(&self) -> &'static str {
        "album_path_match"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn score(&self, catalog: &str, _candidate: &str, hints: &PathHints) -> f64 {
        if Self::matches(catalog, hints) {
            15.0
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, _candidate: &str, hints: &PathHints) -> Option<String> {
        Self::matches(catalog, hints).then(|| "Directory album match".to_string())
    }
}

pub struct AlbumSimilarity;

impl ScoringStrategy<str> for AlbumSimilarity {
    fn name(&self) -> &'static str {
        "album_similarity"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        let sim = similarity(catalog, candidate);
        if sim >= 0.8 {
            sim * 5.0
        } else if sim < 0.3 {
            -10.0
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        let sim = similarity(catalog, candidate);
        if sim >= 0.8 {
            Some(format!("Album similarity ({:.2})", sim))
        } else if sim < 0.3 {
            Some(format!("Album mismatch penalty ({:.2})", sim))
        } else {
            None
        }
    }
}

// ============================================================================
// Duration Strategies
// ============================================================================

/// Returned by [`ExactDuration`] when strict matching rejects the pair.
pub const DURATION_REJECTED: f64 = -1.0;

pub struct ExactDuration {
    config: Arc<dyn ConfigProvider>,
}

impl ExactDuration {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }
}

impl ScoringStrategy<u32> for ExactDuration {
    fn name(&self) -> &'static str {
        "exact_duration"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn score(&self, catalog: &u32, candidate: &u32, _hints: &PathHints) -> f64 {
        if catalog == candidate {
            100.0
        } else if self.config.get_bool(EXACT_DURATION_MATCH, false) {
            DURATION_REJECTED
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &u32, candidate: &u32, _hints: &PathHints) -> Option<String> {
        if catalog == candidate {
            Some("Exact duration match".to_string())
        } else if self.config.get_bool(EXACT_DURATION_MATCH, false) {
            Some("Duration mismatch (exact match required)".to_string())
        } else {
            None
        }
    }
}

/// Tiered score by absolute difference in seconds.
pub struct ApproximateDuration;

impl ApproximateDuration {
    pub fn score_for_diff(diff: u32) -> f64 {
        match diff {
            1 => 90.0,
            0..=3 => 80.0,
            4..=5 => 70.0,
            6..=10 => 50.0,
            11..=30 => 30.0,
            _ => 10.0,
        }
    }
}

impl ScoringStrategy<u32> for ApproximateDuration {
    fn name(&self) -> &'static str {
        "approximate_duration"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn score(&self, catalog: &u32, candidate: &u32, _hints: &PathHints) -> f64 {
        Self::score_for_diff(catalog.abs_diff(*candidate))
    }

    fn reason(&self, catalog: &u32, candidate: &u32, _hints: &PathHints) -> Option<String> {
        let diff = catalog.abs_diff(*candidate);
        if diff == 1 {
            Some(format!(
                "Close duration match: {}s vs {}s (1s difference)",
                candidate, catalog
            ))
        } else {
            Some(format!(
                "Duration match: {}s vs {}s ({}s difference)",
                candidate, catalog, diff
            ))
        }
    }
}

// ============================================================================
// Track Number Strategies
// ============================================================================

/// Whole-value vinyl position: "A1", "B12"
static VINYL_TRACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z])(\d+)$").unwrap());

static LEADING_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());

/// Leading integer of a track number ("03", "7/12" -> 7); 0 when there is none.
pub fn leading_int(s: &str) -> i64 {
    LEADING_INT
        .captures(s)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn vinyl_position(s: &str) -> Option<(char, i64)> {
    let caps = VINYL_TRACK.captures(s)?;
    let side = caps[1].chars().next()?;
    let position = caps[2].parse().ok()?;
    Some((side, position))
}

/// Same-side vinyl distance, if both values are vinyl positions on one side.
fn vinyl_distance(catalog: &str, candidate: &str) -> Option<i64> {
    let (side_a, pos_a) = vinyl_position(catalog)?;
    let (side_b, pos_b) = vinyl_position(candidate)?;
    (side_a == side_b).then(|| (pos_a - pos_b).abs())
}

pub struct ExactTrackNumber;

impl ScoringStrategy<str> for ExactTrackNumber {
    fn name(&self) -> &'static str {
        "exact_track_number"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        if catalog == candidate {
            15.0
        } else {
            0.0
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        (catalog == candidate).then(|| "Track number match".to_string())
    }
}

pub struct VinylTrackNumber;

impl ScoringStrategy<str> for VinylTrackNumber {
    fn name(&self) -> &'static str {
        "vinyl_track_number"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        match vinyl_distance(catalog, candidate) {
            Some(0) => 15.0,
            Some(1..=2) => 10.0,
            Some(3..=5) => 5.0,
            _ => 0.0,
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        match vinyl_distance(catalog, candidate)? {
            0 => Some("Track number match on same side".to_string()),
            d @ 1..=2 => Some(format!(
                "Close track number match on same side (difference: {})",
                d
            )),
            d @ 3..=5 => Some(format!(
                "Reasonable track number match on same side (difference: {})",
                d
            )),
            _ => None,
        }
    }
}

/// Penalizes numeric track numbers more than 5 apart.
pub struct NumericTrackNumber;

impl NumericTrackNumber {
    fn distance(catalog: &str, candidate: &str) -> Option<i64> {
        let a = leading_int(catalog);
        let b = leading_int(candidate);
        (a > 0 && b > 0).then(|| (a - b).abs())
    }
}

impl ScoringStrategy<str> for NumericTrackNumber {
    fn name(&self) -> &'static str {
        "numeric_track_number"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn score(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> f64 {
        match Self::distance(catalog, candidate) {
            Some(d) if d > 5 => -5.0,
            _ => 0.0,
        }
    }

    fn reason(&self, catalog: &str, candidate: &str, _hints: &PathHints) -> Option<String> {
        match Self::distance(catalog, candidate) {
            Some(d) if d > 5 => Some(format!("Track number mismatch (difference: {})", d)),
            _ => None,
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn no_hints() -> PathHints {
        PathHints::default()
    }

    fn default_config() -> Arc<dyn ConfigProvider> {
        Arc::new(MapConfig::new())
    }

    fn strict_config(key: &str) -> Arc<dyn ConfigProvider> {
        Arc::new(MapConfig::new().with(key, true))
    }

    /// Fixed-score strategy that counts how often it is asked.
    struct Counting {
        priority: i32,
        score: f64,
        calls: Arc<AtomicUsize>,
    }

    impl ScoringStrategy<str> for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn score(&self, _: &str, _: &str, _: &PathHints) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.score
        }

        fn reason(&self, _: &str, _: &str, _: &PathHints) -> Option<String> {
            (self.score != 0.0).then(|| format!("counting {}", self.priority))
        }
    }

    fn counting(priority: i32, score: f64) -> (Box<dyn ScoringStrategy<str>>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Counting {
            priority,
            score,
            calls: Arc::clone(&calls),
        };
        (Box::new(strategy), calls)
    }

    #[test]
    fn test_chain_short_circuits_on_first_non_zero() {
        let (low, low_calls) = counting(10, 7.0);
        let (high, high_calls) = counting(90, 3.0);
        // Inserted low-first; the chain must still run the high priority one first
        let chain = StrategyChain::new(vec![low, high]);

        assert_eq!(chain.score("a", "b", &no_hints()), 3.0);
        assert_eq!(high_calls.load(Ordering::SeqCst), 1);
        assert_eq!(low_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.reason("a", "b", &no_hints()).as_deref(), Some("counting 90"));
    }

    #[test]
    fn test_chain_falls_through_zero_scores() {
        let (zero, zero_calls) = counting(90, 0.0);
        let (neg, neg_calls) = counting(50, -4.0);
        let chain = StrategyChain::new(vec![zero, neg]);

        assert_eq!(chain.score("a", "b", &no_hints()), -4.0);
        assert_eq!(zero_calls.load(Ordering::SeqCst), 1);
        assert_eq!(neg_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chain_all_zero_is_neutral() {
        let (a, _) = counting(90, 0.0);
        let (b, _) = counting(50, 0.0);
        let chain = StrategyChain::new(vec![a, b]);
        assert_eq!(chain.score("a", "b", &no_hints()), 0.0);
        assert_eq!(chain.reason("a", "b", &no_hints()), None);

        let empty: StrategyChain<str> = StrategyChain::new(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.score("a", "b", &no_hints()), 0.0);
    }

    #[test]
    fn test_default_artist_chain_order() {
        let chain = default_artist_chain(default_config());
        assert_eq!(
            chain.names(),
            vec!["exact_artist_match", "exact_match", "artist_path_match", "artist_similarity"]
        );
    }

    #[test]
    fn test_exact_artist_strategies() {
        let strict = strict_config(EXACT_ARTIST_MATCH);
        let hints = no_hints();

        let primary = ExactArtistMatch::new(default_config());
        assert_eq!(primary.score("Test Artist", "test artist", &hints), 30.0);
        assert_eq!(primary.score("Test Artist", "Other", &hints), 0.0);
        assert_eq!(primary.reason("Test Artist", "TEST ARTIST", &hints).as_deref(), Some("Artist match"));

        let variant = ExactMatch::new(default_config());
        assert_eq!(variant.score("Test Artist", "test artist", &hints), 25.0);
        assert_eq!(variant.reason("a", "A", &hints).as_deref(), Some("Exact artist match"));

        let strict_primary = ExactArtistMatch::new(Arc::clone(&strict));
        assert_eq!(strict_primary.score("Test Artist", "Other", &hints), -50.0);
        assert_eq!(
            strict_primary.reason("Test Artist", "Other", &hints).as_deref(),
            Some("Artist mismatch (exact match required)")
        );
        assert_eq!(ExactMatch::new(strict).score("x", "y", &hints), -50.0);
    }

    #[test]
    fn test_artist_chain_scores() {
        let chain = default_artist_chain(default_config());
        let hints = PathHints {
            artist: Some("the band".to_string()),
            ..Default::default()
        };

        assert_eq!(chain.score("Test Artist", "Test Artist", &no_hints()), 30.0);
        // Candidate differs but the directory names the catalog artist
        assert_eq!(chain.score("The Band", "Band, The", &hints), 20.0);
        assert_eq!(
            chain.reason("The Band", "Band, The", &hints).as_deref(),
            Some("Directory artist match")
        );
        // Punctuation-only difference: similarity 1.0 after normalization
        assert_eq!(chain.score("AC/DC", "AC-DC", &no_hints()), 5.0);
        assert_eq!(chain.score("Metallica", "Abba", &no_hints()), -15.0);
    }

    #[test]
    fn test_artist_similarity_middle_band_is_neutral() {
        // "abcdef" vs "abcxyz": similarity 0.5
        let strategy = ArtistSimilarity;
        assert_eq!(strategy.score("abcdef", "abcxyz", &no_hints()), 0.0);
        assert_eq!(strategy.reason("abcdef", "abcxyz", &no_hints()), None);
    }

    #[test]
    fn test_album_chain() {
        let chain = default_album_chain();
        assert_eq!(chain.names(), vec!["exact_album_match", "album_path_match", "album_similarity"]);

        assert_eq!(chain.score(" Test Album ", "test album", &no_hints()), 25.0);
        assert_eq!(chain.reason("Test Album", "TEST ALBUM", &no_hints()).as_deref(), Some("Exact album match"));

        let hints = PathHints {
            album: Some("animals".to_string()),
            ..Default::default()
        };
        assert_eq!(chain.score("Animals", "Animals (Remastered)", &hints), 15.0);

        // "abcdefghij" vs "abcdefghix": similarity 0.9
        assert!((chain.score("abcdefghij", "abcdefghix", &no_hints()) - 4.5).abs() < 1e-9);
        assert_eq!(
            chain.reason("abcdefghij", "abcdefghix", &no_hints()).as_deref(),
            Some("Album similarity (0.90)")
        );
        assert_eq!(chain.score("Abbey Road", "Zzz", &no_hints()), -10.0);
    }

    #[test]
    fn test_duration_buckets() {
        let chain = default_duration_chain(default_config());
        let h = no_hints();
        assert_eq!(chain.score(&180, &180, &h), 100.0);
        assert_eq!(chain.score(&180, &181, &h), 90.0);
        assert_eq!(chain.score(&180, &183, &h), 80.0);
        assert_eq!(chain.score(&180, &185, &h), 70.0);
        assert_eq!(chain.score(&180, &190, &h), 50.0);
        assert_eq!(chain.score(&180, &210, &h), 30.0);
        assert_eq!(chain.score(&180, &400, &h), 10.0);
    }

    #[test]
    fn test_duration_reasons() {
        let chain = default_duration_chain(default_config());
        let h = no_hints();
        assert_eq!(chain.reason(&180, &180, &h).as_deref(), Some("Exact duration match"));
        assert_eq!(
            chain.reason(&180, &181, &h).as_deref(),
            Some("Close duration match: 181s vs 180s (1s difference)")
        );
        assert_eq!(
            chain.reason(&180, &190, &h).as_deref(),
            Some("Duration match: 190s vs 180s (10s difference)")
        );
    }

    #[test]
    fn test_strict_duration_rejects() {
        let chain = default_duration_chain(strict_config(EXACT_DURATION_MATCH));
        let h = no_hints();
        assert_eq!(chain.score(&180, &181, &h), DURATION_REJECTED);
        assert_eq!(
            chain.reason(&180, &181, &h).as_deref(),
            Some("Duration mismatch (exact match required)")
        );
        assert_eq!(chain.score(&180, &180, &h), 100.0);
    }

    #[test]
    fn test_vinyl_track_numbers() {
        let chain = default_track_number_chain();
        let h = no_hints();
        assert_eq!(chain.score("A1", "A1", &h), 15.0);
        assert_eq!(chain.reason("A1", "A1", &h).as_deref(), Some("Track number match"));
        assert_eq!(chain.score("A1", "A3", &h), 10.0);
        assert_eq!(
            chain.reason("A1", "A3", &h).as_deref(),
            Some("Close track number match on same side (difference: 2)")
        );
        assert_eq!(chain.score("A1", "A6", &h), 5.0);
        assert_eq!(chain.score("A1", "B1", &h), 0.0);
        assert_eq!(chain.reason("A1", "B1", &h), None);
        assert_eq!(chain.score("A1", "A9", &h), 0.0);
    }

    #[test]
    fn test_numeric_track_numbers() {
        let chain = default_track_number_chain();
        let h = no_hints();
        assert_eq!(chain.score("01", "01", &h), 15.0);
        // "1" and "01" are not string-equal and differ by 0 numerically
        assert_eq!(chain.score("1", "01", &h), 0.0);
        assert_eq!(chain.score("3", "5", &h), 0.0);
        assert_eq!(chain.score("1", "12", &h), -5.0);
        assert_eq!(
            chain.reason("1", "12", &h).as_deref(),
            Some("Track number mismatch (difference: 11)")
        );
        assert_eq!(chain.score("x", "12", &h), 0.0);
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("07"), 7);
        assert_eq!(leading_int("7/12"), 7);
        assert_eq!(leading_int("A1"), 0);
        assert_eq!(leading_int(""), 0);
    }
}
