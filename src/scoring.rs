//! Score calculator chain: runs every per-factor calculator and sums them.
//!
//! Unlike a strategy chain, nothing short-circuits here. Each calculator's
//! score is added and each reason it gives is kept, in priority order.

use std::sync::Arc;

use crate::calculators::{
    AlbumCalculator, ArtistCalculator, CalculatorKind, DurationCalculator, NullCalculator,
    ScoreCalculator, TitleCalculator, TrackNumberCalculator, YearCalculator,
};
use crate::config::ConfigProvider;
use crate::models::{ScoreResult, Track, UnmatchedTrack};
use crate::path_hints::PathHints;

pub struct ScoreCalculatorChain {
    calculators: Vec<Box<dyn ScoreCalculator>>,
}

impl ScoreCalculatorChain {
    /// Calculators are ordered by descending priority; ties keep insertion order.
    pub fn new(mut calculators: Vec<Box<dyn ScoreCalculator>>) -> Self {
        calculators.sort_by_key(|c| std::cmp::Reverse(c.priority()));
        Self { calculators }
    }

    /// Title, artist, album, duration, year, track number and the neutral calculator.
    pub fn with_defaults(config: Arc<dyn ConfigProvider>) -> Self {
        Self::new(vec![
            Box::new(TitleCalculator::new(Arc::clone(&config))),
            Box::new(ArtistCalculator::new(Arc::clone(&config))),
            Box::new(AlbumCalculator::new(Arc::clone(&config))),
            Box::new(DurationCalculator::new(Arc::clone(&config))),
            Box::new(YearCalculator::new(config)),
            Box::new(TrackNumberCalculator::new()),
            Box::new(NullCalculator),
        ])
    }

    pub fn execute(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> ScoreResult {
        self.run(self.calculators.iter(), track, candidate, hints)
    }

    /// Same as [`execute`](Self::execute) restricted to the listed kinds.
    pub fn execute_with_kinds(
        &self,
        track: &Track,
        candidate: &UnmatchedTrack,
        hints: &PathHints,
        kinds: &[CalculatorKind],
    ) -> ScoreResult {
        let allowed = self
            .calculators
            .iter()
            .filter(|c| kinds.contains(&c.kind()));
        self.run(allowed, track, candidate, hints)
    }

    fn run<'a>(
        &self,
        calculators: impl Iterator<Item = &'a Box<dyn ScoreCalculator>>,
        track: &Track,
        candidate: &UnmatchedTrack,
        hints: &PathHints,
    ) -> ScoreResult {
        let mut result = ScoreResult::default();
        for calculator in calculators {
            result.score += calculator.score(track, candidate, hints);
            if let Some(reason) = calculator.reason(track, candidate, hints) {
                result.reasons.push(reason);
            }
        }
        result
    }

    /// Registered kinds in execution order, without duplicates.
    pub fn available_kinds(&self) -> Vec<CalculatorKind> {
        let mut kinds: Vec<CalculatorKind> = Vec::with_capacity(self.calculators.len());
        for calculator in &self.calculators {
            if !kinds.contains(&calculator.kind()) {
                kinds.push(calculator.kind());
            }
        }
        kinds
    }

    /// First registered calculator of the given kind.
    pub fn calculator(&self, kind: CalculatorKind) -> Option<&dyn ScoreCalculator> {
        self.calculators
            .iter()
            .find(|c| c.kind() == kind)
            .map(|c| c.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::models::fixtures;
    use crate::path_hints::extract_path_hints;

    fn chain() -> ScoreCalculatorChain {
        ScoreCalculatorChain::with_defaults(Arc::new(MapConfig::new()))
    }

    /// Constant calculator for checking aggregation.
    struct Fixed(CalculatorKind, f64, Option<&'static str>);

    impl ScoreCalculator for Fixed {
        fn kind(&self) -> CalculatorKind {
            self.0
        }

        fn score(&self, _: &Track, _: &UnmatchedTrack, _: &PathHints) -> f64 {
            self.1
        }

        fn reason(&self, _: &Track, _: &UnmatchedTrack, _: &PathHints) -> Option<String> {
            self.2.map(str::to_string)
        }
    }

    #[test]
    fn test_chain_sums_all_calculators() {
        let chain = ScoreCalculatorChain::new(vec![
            Box::new(Fixed(CalculatorKind::Year, 10.0, Some("year"))),
            Box::new(Fixed(CalculatorKind::Title, 50.0, Some("title"))),
            Box::new(Fixed(CalculatorKind::Artist, -15.0, None)),
        ]);
        let result = chain.execute(&fixtures::track(), &fixtures::candidate(), &PathHints::default());
        assert_eq!(result.score, 45.0);
        // Priority order, not insertion order
        assert_eq!(result.reasons, vec!["title", "year"]);
    }

    #[test]
    fn test_identical_pair_full_chain() {
        let candidate = fixtures::candidate();
        let hints = extract_path_hints(&candidate.file_path);
        let result = chain().execute(&fixtures::track(), &candidate, &hints);

        // title 100 + artist 30 + album 25 + duration 100 + year 100 + track 15
        assert_eq!(result.score, 370.0);
        assert_eq!(
            result.reasons,
            vec![
                "Exact title match",
                "Artist match",
                "Exact album match",
                "Exact duration match",
                "Exact year match: 2020",
                "Track number match",
            ]
        );
    }

    #[test]
    fn test_execute_with_kinds() {
        let candidate = fixtures::candidate();
        let hints = extract_path_hints(&candidate.file_path);
        let chain = chain();

        let result = chain.execute_with_kinds(
            &fixtures::track(),
            &candidate,
            &hints,
            &[CalculatorKind::Title, CalculatorKind::TrackNumber],
        );
        assert_eq!(result.score, 115.0);
        assert_eq!(result.reasons, vec!["Exact title match", "Track number match"]);

        let none = chain.execute_with_kinds(&fixtures::track(), &candidate, &hints, &[]);
        assert_eq!(none, ScoreResult::default());
    }

    #[test]
    fn test_available_kinds_and_lookup() {
        let chain = chain();
        assert_eq!(
            chain.available_kinds(),
            vec![
                CalculatorKind::Title,
                CalculatorKind::Artist,
                CalculatorKind::Album,
                CalculatorKind::Duration,
                CalculatorKind::Year,
                CalculatorKind::TrackNumber,
                CalculatorKind::Null,
            ]
        );
        let year = chain.calculator(CalculatorKind::Year).unwrap();
        assert_eq!(year.kind(), CalculatorKind::Year);
        assert_eq!(year.priority(), 40);

        let sparse = ScoreCalculatorChain::new(vec![Box::new(NullCalculator)]);
        assert!(sparse.calculator(CalculatorKind::Title).is_none());
    }
}
