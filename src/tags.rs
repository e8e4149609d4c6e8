//! Audio tag and property extraction.
//!
//! Extraction is best-effort: an unreadable or unsupported file yields an
//! [`AudioAnalysis`] with `error` set rather than an `Err`.

use anyhow::{anyhow, Result};
use lofty::file::FileType;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use serde::Serialize;
use std::path::Path;

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub performer: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub disc_number: Option<u32>,
    pub total_discs: Option<u32>,
    pub year: Option<u32>,
}

impl ExtractedTags {
    /// Artist credit: track artist, then album artist, then performer.
    pub fn preferred_artist(&self) -> Option<&str> {
        [&self.artist, &self.album_artist, &self.performer]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioAnalysis {
    pub error: Option<String>,
    /// "MP3", "FLAC", "WAV", "AAC", "M4A", ...
    pub format: Option<String>,
    pub channels: Option<u8>,
    /// kbps
    pub bitrate: Option<u32>,
    /// Hz
    pub sample_rate: Option<u32>,
    pub bits_per_sample: Option<u8>,
    /// Seconds
    pub duration: Option<f64>,
    pub tags: ExtractedTags,
}

impl AudioAnalysis {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Coarse quality class from format, sample rate, bit depth and bitrate.
    pub fn quality_level(&self) -> &'static str {
        let format = self.format.as_deref().unwrap_or("").to_uppercase();
        let bitrate = self.bitrate.unwrap_or(0);
        let sample_rate = self.sample_rate.unwrap_or(0);
        let bits = self.bits_per_sample.unwrap_or(0);

        match format.as_str() {
            "FLAC" | "WAV" => {
                if sample_rate >= 96_000 && bits >= 24 {
                    "hi-res"
                } else if sample_rate >= 44_100 && bits >= 16 {
                    "lossless"
                } else {
                    "unknown"
                }
            }
            "MP3" => match bitrate {
                320.. => "high",
                192.. => "medium",
                _ => "low",
            },
            "AAC" | "M4A" => match bitrate {
                256.. => "high",
                128.. => "medium",
                _ => "low",
            },
            _ => "unknown",
        }
    }
}

// ============================================================================
// Extractor
// ============================================================================

pub trait TagExtractor {
    fn extract(&self, path: &Path) -> Result<AudioAnalysis>;
}

/// [`TagExtractor`] backed by lofty.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagExtractor;

impl LoftyTagExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn format_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Mpeg => "MP3",
        FileType::Flac => "FLAC",
        FileType::Wav => "WAV",
        FileType::Aac => "AAC",
        FileType::Mp4 => "M4A",
        FileType::Opus => "Opus",
        FileType::Vorbis => "OGG Vorbis",
        FileType::Aiff => "AIFF",
        FileType::WavPack => "WavPack",
        _ => "Unknown",
    }
}

impl TagExtractor for LoftyTagExtractor {
    fn extract(&self, path: &Path) -> Result<AudioAnalysis> {
        let probe = Probe::open(path)
            .map_err(|e| anyhow!("Failed to open audio file {}: {}", path.display(), e))?;

        let tagged_file = match probe.read() {
            Ok(file) => file,
            Err(e) => return Ok(AudioAnalysis::failed(e.to_string())),
        };

        let properties = tagged_file.properties();
        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let tags = match tag {
            Some(tag) => ExtractedTags {
                title: tag.title().map(|s| s.to_string()),
                artist: tag.artist().map(|s| s.to_string()),
                album: tag.album().map(|s| s.to_string()),
                album_artist: tag.get_string(&ItemKey::AlbumArtist).map(str::to_string),
                performer: tag.get_string(&ItemKey::Performer).map(str::to_string),
                composer: tag.get_string(&ItemKey::Composer).map(str::to_string),
                genre: tag.genre().map(|s| s.to_string()),
                comment: tag.comment().map(|s| s.to_string()),
                track_number: tag.track(),
                total_tracks: tag.track_total(),
                disc_number: tag.disk(),
                total_discs: tag.disk_total(),
                year: tag.year(),
            },
            None => ExtractedTags::default(),
        };

        let analysis = AudioAnalysis {
            error: None,
            format: Some(format_name(tagged_file.file_type()).to_string()),
            channels: properties.channels(),
            bitrate: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            bits_per_sample: properties.bit_depth(),
            duration: Some(properties.duration().as_secs_f64()),
            tags,
        };

        tracing::debug!(
            file = %path.display(),
            format = ?analysis.format,
            title = ?analysis.tags.title,
            artist = ?analysis.tags.artist,
            "Extracted audio metadata"
        );

        Ok(analysis)
    }
}
