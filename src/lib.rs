//! Catalog matching library - shared modules for all binaries.
//!
//! Scores candidate audio files against catalog tracks and resolves each
//! candidate to a track through a priority-ordered association pipeline.

pub mod association;
pub mod calculators;
pub mod catalog;
pub mod config;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod path_hints;
pub mod processor;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod store;
pub mod strategy;
pub mod tags;
