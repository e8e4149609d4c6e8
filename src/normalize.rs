//! Text normalization and bounded string similarity.
//!
//! Every fuzzy comparison in the matcher goes through [`similarity`], so the
//! folding rules here decide what counts as "the same text" for titles,
//! artists and albums alike.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Anything that is neither a word character nor whitespace.
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Letters that survive canonical decomposition but still have a plain
/// ASCII spelling.
const ASCII_FALLBACK: &[(char, &str)] = &[
    ('æ', "ae"),
    ('ð', "o"),
    ('ø', "o"),
    ('þ', "th"),
    ('Æ', "AE"),
    ('Ð', "O"),
    ('Ø', "O"),
    ('Þ', "TH"),
];

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Strip diacritics: NFD, drop combining marks, recompose, then apply the
/// ASCII fallback table to letters that have no decomposition.
pub fn strip_diacritics(s: &str) -> String {
    let stripped: String = s.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect();

    if stripped.is_ascii() {
        return stripped;
    }

    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match ASCII_FALLBACK.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

/// Fold curly quotes into the straight apostrophe.
fn fold_quotes(s: &str) -> String {
    s.replace(['\u{2019}', '\u{2018}', '\u{201C}', '\u{201D}'], "'")
}

/// Fold the curly apostrophe (U+2019) into `'`.
/// Tags written by different taggers disagree on which one to use.
pub fn normalize_apostrophes(s: &str) -> String {
    s.replace('\u{2019}', "'")
}

/// Canonical comparison form: lowercase, trimmed, quotes folded, diacritics
/// stripped, punctuation turned into single spaces.
///
/// Idempotent: normalizing an already-normalized string returns it unchanged.
pub fn normalize_string(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let quoted = fold_quotes(&lowered);
    let folded = strip_diacritics(&quoted);
    let spaced = NON_WORD.replace_all(&folded, " ");
    let collapsed = MULTI_SPACE.replace_all(&spaced, " ");
    collapsed.trim().to_string()
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// Default threshold for [`is_similar`].
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Normalized Levenshtein similarity in `[0, 1]`.
///
/// Two strings that are both empty after normalization score `0.0`; there is
/// nothing to compare.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_string(a);
    let b = normalize_string(b);

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let distance = strsim::levenshtein(&a, &b);
    1.0 - distance as f64 / max_len as f64
}

pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity(a, b) >= threshold
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestMatch<'a> {
    pub matched: &'a str,
    pub score: f64,
}

/// Linear scan for the candidate most similar to `target`.
/// Ties keep the earliest candidate; a candidate must score above zero.
pub fn find_best_match<'a, S: AsRef<str>>(target: &str, candidates: &'a [S]) -> Option<BestMatch<'a>> {
    let mut best: Option<BestMatch<'a>> = None;
    let mut best_score = 0.0;

    for candidate in candidates {
        let score = similarity(target, candidate.as_ref());
        if score > best_score {
            best_score = score;
            best = Some(BestMatch {
                matched: candidate.as_ref(),
                score,
            });
        }
    }

    best
}

// ============================================================================
// TESTS
// ============================================================================
