//! Type definitions for the scan engine

pub mod detection;
pub mod verdict;

pub use detection::{Denomination, Detection, DetectionSource};
pub use verdict::{
    ConfidenceBounds, ConfidenceLevel, Recommendation, RecommendationBands, ScanReport,
    SecurityAnalysis, SecurityFeatureFlags, Verdict,
};
