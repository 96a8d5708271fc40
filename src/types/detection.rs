//! Detection and denomination data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which collaborator produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Primary denomination detector
    PrimaryModel,
    /// Security-feature detector
    SecurityModel,
    /// Reference-corpus matching fallback
    ReferenceMatch,
}

/// A single labeled evidence item from any detection source.
///
/// Bounding box coordinates are `[x1, y1, x2, y2]`, normalized to `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Raw label from the detector vocabulary (e.g. "1000_pearl_watermark")
    pub label: String,

    /// Detector confidence in [0, 1]
    pub confidence: f64,

    /// Normalized corner coordinates [x1, y1, x2, y2]
    pub bbox: [f64; 4],

    /// Originating collaborator
    pub source: DetectionSource,
}

impl Detection {
    /// Create a new detection
    pub fn new(label: impl Into<String>, confidence: f64, bbox: [f64; 4], source: DetectionSource) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
            source,
        }
    }

    /// Create a detection covering most of the frame.
    ///
    /// Used by the reference-matching fallback, which identifies the whole
    /// image rather than a localized region.
    pub fn full_frame(label: impl Into<String>, confidence: f64, source: DetectionSource) -> Self {
        Self::new(label, confidence, [0.1, 0.1, 0.9, 0.9], source)
    }

    /// Face value encoded in this detection's label, if any
    pub fn denomination(&self) -> Option<Denomination> {
        Denomination::from_label(&self.label)
    }
}

/// Face value of a Philippine peso bill or coin.
///
/// Ordered from highest to lowest face value; the ordering is relied on for
/// vote tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Denomination {
    #[serde(rename = "1000")]
    Thousand,
    #[serde(rename = "500")]
    FiveHundred,
    #[serde(rename = "200")]
    TwoHundred,
    #[serde(rename = "100")]
    OneHundred,
    #[serde(rename = "50")]
    Fifty,
    #[serde(rename = "20")]
    Twenty,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "0.25")]
    Centavo25,
}

impl Denomination {
    /// All denominations, highest face value first
    pub const ALL: [Denomination; 10] = [
        Denomination::Thousand,
        Denomination::FiveHundred,
        Denomination::TwoHundred,
        Denomination::OneHundred,
        Denomination::Fifty,
        Denomination::Twenty,
        Denomination::Ten,
        Denomination::Five,
        Denomination::One,
        Denomination::Centavo25,
    ];

    /// Face value used as a vote weight
    pub fn face_value(&self) -> f64 {
        match self {
            Denomination::Thousand => 1000.0,
            Denomination::FiveHundred => 500.0,
            Denomination::TwoHundred => 200.0,
            Denomination::OneHundred => 100.0,
            Denomination::Fifty => 50.0,
            Denomination::Twenty => 20.0,
            Denomination::Ten => 10.0,
            Denomination::Five => 5.0,
            Denomination::One => 1.0,
            Denomination::Centavo25 => 0.25,
        }
    }

    /// Canonical label token for this denomination
    pub fn token(&self) -> &'static str {
        match self {
            Denomination::Thousand => "1000",
            Denomination::FiveHundred => "500",
            Denomination::TwoHundred => "200",
            Denomination::OneHundred => "100",
            Denomination::Fifty => "50",
            Denomination::Twenty => "20",
            Denomination::Ten => "10",
            Denomination::Five => "5",
            Denomination::One => "1",
            Denomination::Centavo25 => "0.25",
        }
    }

    /// Extract a face value from a detection label.
    ///
    /// Denomination tokens are substrings of each other ("100" is contained
    /// in "1000"), so matching is longest-first with explicit exclusions:
    /// "20" only counts when "200" is absent, "10" only when "100"/"1000"
    /// are absent, and so on. Labels that carry no face value (security or
    /// ornamental classes) return `None`.
    pub fn from_label(label: &str) -> Option<Denomination> {
        let l = label.to_lowercase();

        // Coin labels ("25Cent_New_Back") would otherwise fall through to
        // the "5" rule below.
        if l.contains("25cent") || l.contains("centavo") || l.contains("0.25") {
            return Some(Denomination::Centavo25);
        }

        if l.contains("1000") {
            Some(Denomination::Thousand)
        } else if l.contains("500") {
            Some(Denomination::FiveHundred)
        } else if l.contains("200") {
            Some(Denomination::TwoHundred)
        } else if l.contains("100") {
            Some(Denomination::OneHundred)
        } else if l.contains("50") {
            Some(Denomination::Fifty)
        } else if l.contains("20") {
            Some(Denomination::Twenty)
        } else if l.contains("10") {
            Some(Denomination::Ten)
        } else if l.contains('5') {
            Some(Denomination::Five)
        } else if l.contains('1') {
            Some(Denomination::One)
        } else {
            None
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
