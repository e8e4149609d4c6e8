//! Read-only configuration consumed by scoring and the association pipeline.
//!
//! Values are looked up by dotted key (`association.min_score`, ...). A key
//! that is absent, or holds a value of the wrong JSON type, falls back to
//! its default.

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Keys + Defaults
// ============================================================================

pub const MIN_SCORE: &str = "association.min_score";
pub const EXACT_ARTIST_MATCH: &str = "association.exact_artist_match";
pub const EXACT_ALBUM_MATCH: &str = "association.exact_album_match";
pub const EXACT_DURATION_MATCH: &str = "association.exact_duration_match";
pub const EXACT_YEAR_MATCH: &str = "association.exact_year_match";
pub const EXACT_TITLE_MATCH: &str = "association.exact_title_match";
pub const AUTO_ASSOCIATION: &str = "association.auto_association";

pub const DEFAULT_MIN_SCORE: f64 = 85.0;

// ============================================================================
// Provider
// ============================================================================

/// Key/value configuration source. Shared across rayon workers during
/// ranking, hence `Send + Sync`.
pub trait ConfigProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }
}

/// In-memory snapshot of configuration values.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: FxHashMap<String, Value>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigProvider for MapConfig {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

// ============================================================================
// Typed Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationSettings {
    pub min_score: f64,
    pub exact_artist_match: bool,
    pub exact_album_match: bool,
    pub exact_duration_match: bool,
    pub exact_year_match: bool,
    pub exact_title_match: bool,
    pub auto_association: bool,
}

impl Default for AssociationSettings {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            exact_artist_match: false,
            exact_album_match: false,
            exact_duration_match: false,
            exact_year_match: false,
            exact_title_match: false,
            auto_association: true,
        }
    }
}

impl AssociationSettings {
    pub fn from_provider(config: &dyn ConfigProvider) -> Self {
        Self {
            min_score: config.get_f64(MIN_SCORE, DEFAULT_MIN_SCORE),
            exact_artist_match: config.get_bool(EXACT_ARTIST_MATCH, false),
            exact_album_match: config.get_bool(EXACT_ALBUM_MATCH, false),
            exact_duration_match: config.get_bool(EXACT_DURATION_MATCH, false),
            exact_year_match: config.get_bool(EXACT_YEAR_MATCH, false),
            exact_title_match: config.get_bool(EXACT_TITLE_MATCH, false),
            auto_association: config.get_bool(AUTO_ASSOCIATION, true),
        }
    }
}
