//! Weak artist/album/year/track-number hints derived from a file path.
//!
//! Nothing here touches the catalog. The heuristics assume the usual
//! `Artist/Album/NN Title.ext` nesting, optionally under a `Music` root.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// "2020 Album Name"
static LEADING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})\s*(.+)$").unwrap());

/// "Album Name 2020"
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\s+(\d{4})$").unwrap());

/// Vinyl side + position: "A1", "B12"
static VINYL_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z])(\d+)").unwrap());

static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)").unwrap());

/// Number followed by a separator anywhere in the name: "Song - 03 - Title"
static NUMERIC_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)[.\-\s]").unwrap());

/// Library roots that hide the artist/album levels below them.
const LIBRARY_ROOTS: [&str; 2] = ["Music", "music"];

// ============================================================================
// PATH HINTS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathHints {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<String>,
    /// Every non-empty directory segment, root first.
    pub directory_structure: Vec<String>,
}

/// Parse a file path into [`PathHints`].
pub fn extract_path_hints(file_path: &str) -> PathHints {
    let path = Path::new(file_path);

    let segments: Vec<String> = path
        .parent()
        .map(|dir| {
            dir.to_string_lossy()
                .split(['/', '\\'])
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut hints = PathHints::default();

    for segment in relevant_segments(&segments) {
        if let Some(caps) = LEADING_YEAR.captures(segment) {
            hints.year = caps[1].parse().ok();
            hints.album = Some(caps[2].trim().to_string());
        } else if let Some(caps) = TRAILING_YEAR.captures(segment) {
            hints.album = Some(caps[1].trim().to_string());
            hints.year = caps[2].parse().ok();
        } else if hints.artist.is_none() {
            hints.artist = Some(segment.to_string());
        } else if hints.album.is_none() {
            hints.album = Some(segment.to_string());
        }
    }

    if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        hints.track_number = track_number_from_filename(file_name);
    }

    hints.directory_structure = segments;
    hints
}

fn is_library_root(segment: &str) -> bool {
    LIBRARY_ROOTS.contains(&segment)
}

/// Segments after the first library root, with every root segment dropped.
/// Falls back to all segments when there is no root or nothing else follows.
fn relevant_segments(segments: &[String]) -> Vec<&str> {
    let below_root: Vec<&str> = segments
        .iter()
        .map(String::as_str)
        .skip_while(|s| !is_library_root(s))
        .filter(|s| !is_library_root(s))
        .collect();

    if below_root.is_empty() {
        segments.iter().map(String::as_str).collect()
    } else {
        below_root
    }
}

fn track_number_from_filename(file_name: &str) -> Option<String> {
    if let Some(caps) = VINYL_PREFIX.captures(file_name) {
        return Some(format!("{}{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = NUMERIC_PREFIX.captures(file_name) {
        return Some(caps[1].to_string());
    }
    NUMERIC_TOKEN
        .captures(file_name)
        .map(|caps| caps[1].to_string())
}

// ============================================================================
// CONVENIENCE ACCESSORS
// ============================================================================

pub fn artist_from_path(file_path: &str) -> Option<String> {
    extract_path_hints(file_path).artist
}

pub fn album_from_path(file_path: &str) -> Option<String> {
    extract_path_hints(file_path).album
}

pub fn year_from_path(file_path: &str) -> Option<i32> {
    extract_path_hints(file_path).year
}

pub fn track_number_from_path(file_path: &str) -> Option<String> {
    extract_path_hints(file_path).track_number
}

pub fn has_year_in_path(file_path: &str) -> bool {
    year_from_path(file_path).is_some()
}

pub fn directory_structure(file_path: &str) -> Vec<String> {
    extract_path_hints(file_path).directory_structure
}

// ============================================================================
// TESTS
// ============================================================================
