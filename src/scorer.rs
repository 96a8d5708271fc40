//! Weighted authenticity scoring heuristic.
//!
//! A pure, deterministic function over the detection set and the resolved
//! denomination. Starts from a baseline, adds independent evidence terms,
//! and clamps to [0, 1]. An empty detection set short-circuits to a
//! below-baseline default: "no evidence" is not "confirmed genuine".

use crate::types::detection::{Denomination, Detection};
use tracing::debug;

/// Score assigned when no detection evidence exists at all
pub const NO_EVIDENCE_SCORE: f64 = 0.3;

/// Starting point before evidence terms are applied
const BASELINE: f64 = 0.4;

/// Confidence above which a detection sits in the high band
const HIGH_BAND: f64 = 0.7;

/// Confidence above which a detection sits in the medium band
const MEDIUM_BAND: f64 = 0.4;

/// Canonical security-feature terms recognized in labels
const SECURITY_TERMS: [&str; 5] = ["watermark", "thread", "security", "concealed", "variable"];

/// Compute the authenticity score for a detection set.
///
/// Deterministic and order-independent; safe to call concurrently.
pub fn score(detections: &[Detection], denomination: Option<Denomination>) -> f64 {
    if detections.is_empty() {
        return NO_EVIDENCE_SCORE;
    }

    let mut score = BASELINE;

    let high = detections.iter().filter(|d| d.confidence > HIGH_BAND).count();
    let medium = detections
        .iter()
        .filter(|d| d.confidence > MEDIUM_BAND && d.confidence <= HIGH_BAND)
        .count();
    let low = detections.len() - high - medium;

    // Diminishing-returns bonuses for strong and moderate detections
    if high > 0 {
        score += 0.25 * (high as f64 / 2.0).min(1.0);
    }
    if medium > 0 {
        score += 0.15 * (medium as f64 / 3.0).min(1.0);
    }

    // Denomination-specific evidence: a confident label carrying the
    // resolved face value is a strong authenticity signal, its absence a
    // mild penalty
    if let Some(denomination) = denomination {
        let token = denomination.token();
        let denomination_backed = detections
            .iter()
            .any(|d| d.confidence > 0.5 && d.label.to_lowercase().contains(token));
        if denomination_backed {
            score += 0.2;
        } else {
            score -= 0.1;
        }
    }

    // Confident canonical security features are essential evidence
    let security_terms_present = distinct_security_terms(detections);
    if security_terms_present.is_empty() {
        score -= 0.15;
    } else {
        score += 0.25;
        // Diversity of evidence beats repetition of one signal
        if security_terms_present.len() >= 2 {
            score += 0.15;
        }
    }

    // A detection set dominated by weak matches is probably noise
    if low > high + medium {
        score -= 0.1;
    }

    let clamped = score.clamp(0.0, 1.0);
    debug!(
        high, medium, low,
        security_terms = security_terms_present.len(),
        score = clamped,
        "Authenticity score computed"
    );
    clamped
}

/// Distinct canonical security terms present at confidence > 0.5
fn distinct_security_terms(detections: &[Detection]) -> Vec<&'static str> {
    SECURITY_TERMS
        .iter()
        .copied()
        .filter(|term| {
            detections
                .iter()
                .any(|d| d.confidence > 0.5 && d.label.to_lowercase().contains(term))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::detection::DetectionSource;

    fn det(label: &str, confidence: f64) -> Detection {
        Detection::new(label, confidence, [0.0, 0.0, 1.0, 1.0], DetectionSource::SecurityModel)
    }

    #[test]
    fn test_empty_detections_short_circuit() {
        assert_eq!(score(&[], Some(Denomination::Thousand)), NO_EVIDENCE_SCORE);
        assert_eq!(score(&[], None), NO_EVIDENCE_SCORE);
    }

    #[test]
    fn test_end_to_end_scenario_composition() {
        // 1000_pearl at 0.8 (high band, denomination-backed) plus a
        // watermark at 0.6 (medium band, canonical security term)
        let detections = vec![det("1000_pearl", 0.8), det("watermark", 0.6)];
        let s = score(&detections, Some(Denomination::Thousand));

        // 0.4 + 0.25*min(1/2,1) + 0.15*min(1/3,1) + 0.2 + 0.25, clamped
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_missing_security_features_penalized() {
        let detections = vec![det("1000_pearl", 0.8)];
        let s = score(&detections, Some(Denomination::Thousand));

        // 0.4 + 0.125 + 0.2 - 0.15
        assert!((s - 0.575).abs() < 1e-9);
    }

    #[test]
    fn test_denomination_mismatch_penalized() {
        let detections = vec![det("watermark", 0.8)];
        let with_denom = score(&detections, Some(Denomination::Twenty));
        let without_denom = score(&detections, None);

        // 0.4 + 0.125 - 0.1 + 0.25 vs 0.4 + 0.125 + 0.25
        assert!((with_denom - 0.675).abs() < 1e-9);
        assert!((without_denom - 0.775).abs() < 1e-9);
    }

    #[test]
    fn test_security_term_diversity_bonus() {
        // Medium-band confidences keep the totals clear of the upper clamp
        let one_term = vec![det("watermark", 0.6), det("value_watermark", 0.65)];
        let two_terms = vec![det("watermark", 0.6), det("security_thread", 0.65)];

        let single = score(&one_term, None);
        let diverse = score(&two_terms, None);
        assert!((diverse - single - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_domination_penalty() {
        let noisy = vec![
            det("watermark", 0.8),
            det("blur_a", 0.2),
            det("blur_b", 0.15),
            det("blur_c", 0.1),
        ];
        let clean = vec![det("watermark", 0.8)];

        assert!((score(&clean, None) - score(&noisy, None) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_high_band_diminishing_returns() {
        // Labels chosen to carry no security term, isolating the band bonus
        let two_high = vec![det("eagle", 0.9), det("sampaguita_x", 0.8)];
        let four_high = vec![
            det("eagle", 0.9),
            det("sampaguita_x", 0.8),
            det("tarsier_x", 0.85),
            det("parrot_x", 0.95),
        ];

        // The high-band bonus saturates at two detections
        assert_eq!(score(&two_high, None), score(&four_high, None));
        assert!((score(&two_high, None) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_in_added_security_evidence() {
        let bases: Vec<Vec<Detection>> = vec![
            vec![],
            vec![det("20_civet", 0.6)],
            vec![det("1000_pearl", 0.8), det("watermark", 0.6)],
            vec![det("blur", 0.2), det("watermark", 0.45)],
        ];

        for base in bases {
            let before = score(&base, Some(Denomination::Thousand));
            let mut extended = base.clone();
            extended.push(det("watermark", 0.9));
            let after = score(&extended, Some(Denomination::Thousand));
            assert!(
                after >= before || base.is_empty(),
                "adding strong security evidence must not reduce the score"
            );
        }
    }

    #[test]
    fn test_score_always_in_range() {
        let hostile = vec![
            det("blur_a", 0.05),
            det("blur_b", 0.1),
            det("blur_c", 0.15),
            det("blur_d", 0.2),
        ];
        let s = score(&hostile, Some(Denomination::Thousand));
        assert!((0.0..=1.0).contains(&s));

        let stacked = vec![
            det("1000_pearl_watermark", 0.99),
            det("security_thread", 0.98),
            det("concealed_value", 0.97),
            det("optically_variable_device", 0.96),
        ];
        let s = score(&stacked, Some(Denomination::Thousand));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_order_independence() {
        let a = vec![det("1000_pearl", 0.8), det("watermark", 0.6), det("blur", 0.2)];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(
            score(&a, Some(Denomination::Thousand)),
            score(&b, Some(Denomination::Thousand))
        );
    }
}
