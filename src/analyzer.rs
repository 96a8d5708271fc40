//! Security-feature analysis and denomination cross-checking.
//!
//! Maps the security detector's label vocabulary onto canonical feature
//! flags and cross-checks face values embedded in those labels against the
//! resolved denomination. A "1000" watermark detected on a bill resolved as
//! "20" is surfaced to the scorer as negative evidence through the
//! consistency flag and the unexpected-feature count.

use crate::config::AnalyzerConfig;
use crate::types::detection::{Denomination, Detection};
use crate::types::verdict::{SecurityAnalysis, SecurityFeatureFlags};
use tracing::{debug, info};

/// Expected security features per denomination, from the BSP feature tables
/// for the current series.
///
/// Order: (security_thread, watermark, microprinting, color_changing_ink,
/// uv_features). Raised printing is present on every banknote and absent on
/// coins.
fn expected_features(denomination: Denomination) -> (bool, bool, bool, bool, bool) {
    match denomination {
        Denomination::One => (true, true, false, false, false),
        Denomination::Five => (true, false, true, false, false),
        Denomination::Ten => (true, true, false, false, false),
        Denomination::Twenty => (true, false, false, true, false),
        Denomination::Fifty => (true, true, true, false, false),
        Denomination::OneHundred => (true, true, false, false, true),
        Denomination::TwoHundred => (true, true, false, true, false),
        Denomination::FiveHundred => (true, true, true, false, true),
        Denomination::Thousand => (true, true, true, true, true),
        Denomination::Centavo25 => (false, false, false, false, false),
    }
}

/// Cross-checks security detections against a resolved denomination
pub struct SecurityAnalyzer {
    config: AnalyzerConfig,
}

impl SecurityAnalyzer {
    /// Create an analyzer with the given settings
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyze security detections for a resolved denomination.
    ///
    /// Detections at or below the confidence floor are discarded as noise.
    /// Flags are `Some(true)` when observed, `Some(false)` when the
    /// denomination's feature table expects them but nothing was observed,
    /// and `None` when they cannot be determined from label evidence alone.
    pub fn analyze(
        &self,
        detections: &[Detection],
        denomination: Option<Denomination>,
    ) -> SecurityAnalysis {
        let mut analysis = SecurityAnalysis {
            denomination_consistency: true,
            ..SecurityAnalysis::default()
        };

        for detection in detections {
            if detection.confidence <= self.config.min_feature_confidence {
                debug!(
                    label = %detection.label,
                    confidence = detection.confidence,
                    "Discarding low-confidence security detection"
                );
                continue;
            }

            let label = detection.label.to_lowercase();
            set_flags_from_label(&mut analysis.flags, &label);

            if let Some(denomination) = denomination {
                self.cross_check(&mut analysis, &label, denomination);
            }
        }

        if let Some(denomination) = denomination {
            mark_missing_expected(&mut analysis.flags, denomination);
        }

        info!(
            expected_found = analysis.expected_found,
            unexpected_found = analysis.unexpected_found,
            consistent = analysis.denomination_consistency,
            "Security analysis complete"
        );

        analysis
    }

    /// Compare face values embedded in a label against the resolved
    /// denomination.
    ///
    /// A label that literally contains the resolved token counts as
    /// expected; otherwise a label resolving to some *other* face value
    /// counts as unexpected and breaks consistency. The second branch uses
    /// the exclusion-aware extraction so a "1000" label counts as one
    /// mismatched value, not four.
    fn cross_check(&self, analysis: &mut SecurityAnalysis, label: &str, denomination: Denomination) {
        if label.contains(denomination.token()) {
            analysis.expected_found += 1;
        } else if let Some(other) = Denomination::from_label(label) {
            if other != denomination {
                analysis.unexpected_found += 1;
                analysis.denomination_consistency = false;
            }
        }
    }
}

impl Default for SecurityAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

/// Set canonical flags for every recognized substring in a label
fn set_flags_from_label(flags: &mut SecurityFeatureFlags, label: &str) {
    if label.contains("watermark") {
        flags.watermark = Some(true);
    }
    if label.contains("thread") || label.contains("security") {
        flags.security_thread = Some(true);
    }
    if label.contains("microprint") {
        flags.microprinting = Some(true);
    }
    if label.contains("color_changing") || label.contains("ink") {
        flags.color_changing_ink = Some(true);
    }
    if label.contains("uv") || label.contains("fluorescent") {
        flags.uv_features = Some(true);
    }
    if label.contains("raised") || label.contains("intaglio") || label.contains("embossed") {
        flags.raised_printing = Some(true);
    }
}

/// Downgrade still-undetermined flags to `Some(false)` where the
/// denomination's feature table expects the feature; flags the table does
/// not expect stay `None` (undetermined, not absent).
fn mark_missing_expected(flags: &mut SecurityFeatureFlags, denomination: Denomination) {
    let (thread, watermark, microprint, ink, uv) = expected_features(denomination);

    let downgrade = |flag: &mut Option<bool>, expected: bool| {
        if flag.is_none() && expected {
            *flag = Some(false);
        }
    };

    downgrade(&mut flags.security_thread, thread);
    downgrade(&mut flags.watermark, watermark);
    downgrade(&mut flags.microprinting, microprint);
    downgrade(&mut flags.color_changing_ink, ink);
    downgrade(&mut flags.uv_features, uv);
    downgrade(
        &mut flags.raised_printing,
        denomination != Denomination::Centavo25,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::detection::DetectionSource;

    fn det(label: &str, confidence: f64) -> Detection {
        Detection::new(label, confidence, [0.0, 0.0, 1.0, 1.0], DetectionSource::SecurityModel)
    }

    #[test]
    fn test_flags_from_labels() {
        let analyzer = SecurityAnalyzer::default();
        let analysis = analyzer.analyze(
            &[
                det("1000_pearl_watermark", 0.8),
                det("security_thread", 0.6),
                det("microprint_band", 0.5),
                det("color_changing_ink", 0.4),
            ],
            Some(Denomination::Thousand),
        );

        assert_eq!(analysis.flags.watermark, Some(true));
        assert_eq!(analysis.flags.security_thread, Some(true));
        assert_eq!(analysis.flags.microprinting, Some(true));
        assert_eq!(analysis.flags.color_changing_ink, Some(true));
        // Expected on a 1000 bill but never observed
        assert_eq!(analysis.flags.uv_features, Some(false));
        assert_eq!(analysis.flags.raised_printing, Some(false));
    }

    #[test]
    fn test_confidence_floor_discards_noise() {
        let analyzer = SecurityAnalyzer::default();
        let analysis = analyzer.analyze(
            &[det("watermark", 0.3), det("security_thread", 0.25)],
            Some(Denomination::OneHundred),
        );

        // Both at or below the 0.3 floor: expected features stay unobserved
        assert_eq!(analysis.flags.watermark, Some(false));
        assert_eq!(analysis.flags.security_thread, Some(false));
        assert_eq!(analysis.expected_found, 0);
    }

    #[test]
    fn test_expected_denomination_feature() {
        let analyzer = SecurityAnalyzer::default();
        let analysis = analyzer.analyze(
            &[det("1000_pearl_watermark", 0.8), det("1000_pearl", 0.7)],
            Some(Denomination::Thousand),
        );

        assert_eq!(analysis.expected_found, 2);
        assert_eq!(analysis.unexpected_found, 0);
        assert!(analysis.denomination_consistency);
    }

    #[test]
    fn test_mismatched_denomination_breaks_consistency() {
        let analyzer = SecurityAnalyzer::default();
        // A 1000 watermark on a bill resolved as 20
        let analysis = analyzer.analyze(
            &[det("1000_pearl_watermark", 0.8), det("20_civet", 0.6)],
            Some(Denomination::Twenty),
        );

        assert_eq!(analysis.expected_found, 1);
        assert_eq!(analysis.unexpected_found, 1);
        assert!(!analysis.denomination_consistency);
    }

    #[test]
    fn test_mismatched_label_counts_once() {
        let analyzer = SecurityAnalyzer::default();
        // "1000" textually contains "100", "10" and "1"; it must register
        // as a single unexpected value
        let analysis = analyzer.analyze(
            &[det("1000_pearl", 0.9)],
            Some(Denomination::Fifty),
        );

        assert_eq!(analysis.unexpected_found, 1);
    }

    #[test]
    fn test_unresolved_denomination_skips_cross_check() {
        let analyzer = SecurityAnalyzer::default();
        let analysis = analyzer.analyze(&[det("1000_pearl_watermark", 0.8)], None);

        assert_eq!(analysis.expected_found, 0);
        assert_eq!(analysis.unexpected_found, 0);
        assert!(analysis.denomination_consistency);
        assert_eq!(analysis.flags.watermark, Some(true));
        // With no denomination there is no expectation table; everything
        // unobserved stays undetermined
        assert_eq!(analysis.flags.uv_features, None);
        assert_eq!(analysis.flags.raised_printing, None);
    }

    #[test]
    fn test_uv_and_raised_printing_from_labels() {
        let analyzer = SecurityAnalyzer::default();
        let analysis = analyzer.analyze(
            &[det("uv_band", 0.6), det("intaglio_portrait", 0.5)],
            Some(Denomination::FiveHundred),
        );

        assert_eq!(analysis.flags.uv_features, Some(true));
        assert_eq!(analysis.flags.raised_printing, Some(true));
    }

    #[test]
    fn test_coin_expects_no_features() {
        let analyzer = SecurityAnalyzer::default();
        let analysis = analyzer.analyze(&[], Some(Denomination::Centavo25));
        assert_eq!(analysis.flags, SecurityFeatureFlags::default());
    }
}
