//! Configuration for the scan engine.
//!
//! Every threshold carries a default matching the tuned production values,
//! so `EngineConfig::default()` is a fully working configuration and a TOML
//! file only needs to override what it changes.

use crate::types::verdict::{ConfidenceBounds, RecommendationBands};
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Reference-matching fallback settings
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Keypoint/descriptor extraction settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Security-feature analysis settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Score-to-recommendation band thresholds
    #[serde(default)]
    pub bands: RecommendationBands,

    /// Score bounds for the High confidence level
    #[serde(default)]
    pub confidence: ConfidenceBounds,
}

/// Reference-matching fallback settings
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    /// Hamming distance below which a descriptor pair counts as a good match
    #[serde(default = "default_good_match_distance")]
    pub good_match_distance: u32,

    /// Minimum good matches summed over all reference images of a
    /// denomination; rules out noise from many weak partial matches
    #[serde(default = "default_min_total_matches")]
    pub min_total_matches: usize,

    /// Minimum good matches against a single reference image; rules out
    /// accidental accumulation with no strong match anywhere
    #[serde(default = "default_min_best_single_score")]
    pub min_best_single_score: usize,

    /// Confidence cap for fallback detections; the fallback is a heuristic
    /// and never treated as fully certain
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f64,
}

fn default_good_match_distance() -> u32 {
    50
}

fn default_min_total_matches() -> usize {
    15
}

fn default_min_best_single_score() -> usize {
    8
}

fn default_max_confidence() -> f64 {
    0.95
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            good_match_distance: default_good_match_distance(),
            min_total_matches: default_min_total_matches(),
            min_best_single_score: default_min_best_single_score(),
            max_confidence: default_max_confidence(),
        }
    }
}

/// Keypoint/descriptor extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// FAST-9 corner detection threshold
    #[serde(default = "default_fast_threshold")]
    pub fast_threshold: u8,

    /// Maximum keypoints kept per image, strongest first
    #[serde(default = "default_max_keypoints")]
    pub max_keypoints: usize,
}

fn default_fast_threshold() -> u8 {
    20
}

fn default_max_keypoints() -> usize {
    2000
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fast_threshold: default_fast_threshold(),
            max_keypoints: default_max_keypoints(),
        }
    }
}

/// Security-feature analysis settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Security detections at or below this confidence are discarded as noise
    #[serde(default = "default_min_feature_confidence")]
    pub min_feature_confidence: f64,
}

fn default_min_feature_confidence() -> f64 {
    0.3
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_feature_confidence: default_min_feature_confidence(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the conventional path
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/engine.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
