//! Verdict data structures: recommendation bands, security flags, scan reports

use crate::types::detection::Detection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-facing verdict band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Authentic,
    LikelyAuthentic,
    Suspicious,
    LikelyCounterfeit,
}

impl Recommendation {
    /// Determine recommendation from authenticity score and band thresholds
    pub fn from_score(score: f64, bands: &RecommendationBands) -> Self {
        if score >= bands.authentic {
            Recommendation::Authentic
        } else if score >= bands.likely_authentic {
            Recommendation::LikelyAuthentic
        } else if score >= bands.suspicious {
            Recommendation::Suspicious
        } else {
            Recommendation::LikelyCounterfeit
        }
    }

    /// Wire-format band name, matching the serialized representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Authentic => "AUTHENTIC",
            Recommendation::LikelyAuthentic => "LIKELY_AUTHENTIC",
            Recommendation::Suspicious => "SUSPICIOUS",
            Recommendation::LikelyCounterfeit => "LIKELY_COUNTERFEIT",
        }
    }

    /// One-line advisory for the end user
    pub fn advice(&self) -> &'static str {
        match self {
            Recommendation::Authentic => "Bill appears genuine with high confidence",
            Recommendation::LikelyAuthentic => {
                "Bill appears genuine but verify security features manually"
            }
            Recommendation::Suspicious => {
                "Authenticity uncertain, professional verification recommended"
            }
            Recommendation::LikelyCounterfeit => "Bill appears fake, do not accept",
        }
    }
}

/// Configurable recommendation band thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationBands {
    pub authentic: f64,
    pub likely_authentic: f64,
    pub suspicious: f64,
}

impl Default for RecommendationBands {
    fn default() -> Self {
        Self {
            authentic: 0.75,
            likely_authentic: 0.55,
            suspicious: 0.35,
        }
    }
}

/// Confidence attached to a verdict.
///
/// High whenever the score is far from the middle of the range. The bounds
/// are independent of the recommendation bands, so in the narrow windows
/// (0.55, 0.7] and [0.3, 0.35) the two classifications disagree; that
/// behavior is intentional and kept stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
}

impl ConfidenceLevel {
    /// Determine confidence level from authenticity score
    pub fn from_score(score: f64, bounds: &ConfidenceBounds) -> Self {
        if score > bounds.high_above || score < bounds.high_below {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Medium
        }
    }
}

/// Score bounds beyond which a verdict is considered high-confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBounds {
    pub high_above: f64,
    pub high_below: f64,
}

impl Default for ConfidenceBounds {
    fn default() -> Self {
        Self {
            high_above: 0.7,
            high_below: 0.3,
        }
    }
}

/// Canonical security-feature flags for a scanned bill.
///
/// `None` means the feature could not be determined from the available
/// evidence, which is distinct from a confident absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityFeatureFlags {
    pub security_thread: Option<bool>,
    pub watermark: Option<bool>,
    pub microprinting: Option<bool>,
    pub color_changing_ink: Option<bool>,
    pub uv_features: Option<bool>,
    pub raised_printing: Option<bool>,
}

/// Result of cross-checking security detections against a resolved denomination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    /// Canonical feature flags derived from detection labels
    pub flags: SecurityFeatureFlags,
    /// Detections whose label carries the resolved denomination's face value
    pub expected_found: u32,
    /// Detections carrying a *different* face value (e.g. a "1000" watermark
    /// on a bill resolved as "20")
    pub unexpected_found: u32,
    /// False as soon as any mismatched face value is observed
    pub denomination_consistency: bool,
}

/// Final fused verdict for one scanned image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Resolved denomination token, or "unknown"
    pub denomination: String,

    /// Authenticity estimate in [0, 1]
    pub authenticity_score: f64,

    /// Exactly `1 - authenticity_score`
    pub counterfeit_probability: f64,

    /// Verdict band
    pub recommendation: Recommendation,

    /// High or Medium, per `ConfidenceBounds`
    pub confidence_level: ConfidenceLevel,

    /// All evidence that fed the verdict
    pub detected_features: Vec<Detection>,

    /// Security-feature cross-check results
    pub security_analysis: SecurityAnalysis,
}

/// Envelope around a verdict for one scan request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique scan identifier
    pub scan_id: String,

    /// Scan completion timestamp
    pub timestamp: DateTime<Utc>,

    /// End-to-end processing time in milliseconds
    pub processing_time_ms: u64,

    /// Human-readable status line
    pub message: String,

    /// The fused verdict
    pub verdict: Verdict,
}

impl ScanReport {
    /// Wrap a verdict in a new report
    pub fn new(verdict: Verdict) -> Self {
        let message = format!(
            "Analysis completed with {} evidence items. {}",
            verdict.detected_features.len(),
            verdict.recommendation.advice()
        );
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            processing_time_ms: 0,
            message,
            verdict,
        }
    }

    /// Attach the measured processing time
    pub fn with_processing_time(mut self, elapsed: std::time::Duration) -> Self {
        self.processing_time_ms = elapsed.as_millis() as u64;
        self
    }
}
