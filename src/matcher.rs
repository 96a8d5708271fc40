//! Reference-matching fallback.
//!
//! Invoked only when the primary denomination detector yields nothing
//! usable. Matches the query image's binary descriptors against every
//! corpus entry with cross-checked Hamming matching, aggregates good-match
//! counts per denomination, and only emits a detection when both the
//! aggregate and the peak evidence clear their minimum thresholds.

use crate::config::MatcherConfig;
use crate::corpus::ReferenceCorpus;
use crate::extractor::{Descriptor, FeatureExtractor};
use crate::types::detection::{Denomination, Detection, DetectionSource};
use image::RgbImage;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-denomination match evidence accumulated over all reference images
#[derive(Debug, Clone, Copy, Default)]
struct MatchTally {
    /// Good matches summed across every reference image of this denomination
    total_matches: usize,
    /// Best good-match count against any single reference image
    best_single_score: usize,
}

/// Content-based retrieval against the reference corpus
pub struct ReferenceMatcher {
    config: MatcherConfig,
    extractor: FeatureExtractor,
}

impl ReferenceMatcher {
    /// Create a matcher with the given settings and extractor
    pub fn new(config: MatcherConfig, extractor: FeatureExtractor) -> Self {
        Self { config, extractor }
    }

    /// Match a query image against the corpus.
    ///
    /// Returns `None` when the query has no usable descriptors or no
    /// denomination clears the acceptance gate; the caller treats that as
    /// an unknown denomination.
    pub fn match_image(&self, image: &RgbImage, corpus: &ReferenceCorpus) -> Option<Detection> {
        let query = self.extractor.extract(image);
        if query.is_empty() {
            debug!("No descriptors extracted from query image");
            return None;
        }
        self.match_descriptors(&query, corpus)
    }

    /// Match precomputed query descriptors against the corpus
    pub fn match_descriptors(
        &self,
        query: &[Descriptor],
        corpus: &ReferenceCorpus,
    ) -> Option<Detection> {
        if corpus.is_empty() {
            debug!("Reference corpus is empty");
            return None;
        }

        let mut tallies: BTreeMap<Denomination, MatchTally> = BTreeMap::new();
        for entry in corpus.entries() {
            let good = self.count_good_matches(query, &entry.descriptors);
            let tally = tallies.entry(entry.denomination).or_default();
            tally.total_matches += good;
            tally.best_single_score = tally.best_single_score.max(good);
        }

        let (denomination, tally) = tallies
            .iter()
            .max_by(|(da, ta), (db, tb)| {
                ta.total_matches
                    .cmp(&tb.total_matches)
                    .then(da.face_value().total_cmp(&db.face_value()))
            })
            .map(|(d, t)| (*d, *t))?;

        if !self.accepts(tally.total_matches, tally.best_single_score) {
            info!(
                denomination = %denomination,
                total_matches = tally.total_matches,
                best_single_score = tally.best_single_score,
                "Insufficient match evidence, fallback yields nothing"
            );
            return None;
        }

        let confidence = self.fallback_confidence(tally.total_matches, tally.best_single_score);
        info!(
            denomination = %denomination,
            total_matches = tally.total_matches,
            best_single_score = tally.best_single_score,
            confidence,
            "Reference matching resolved denomination"
        );

        Some(Detection::full_frame(
            denomination.token(),
            confidence,
            DetectionSource::ReferenceMatch,
        ))
    }

    /// Both thresholds are independent minimum-evidence requirements
    fn accepts(&self, total_matches: usize, best_single_score: usize) -> bool {
        total_matches > self.config.min_total_matches
            && best_single_score > self.config.min_best_single_score
    }

    /// Weighted blend of aggregate and peak evidence, capped below 1.0
    fn fallback_confidence(&self, total_matches: usize, best_single_score: usize) -> f64 {
        let blended =
            (total_matches as f64 / 50.0) * 0.6 + (best_single_score as f64 / 30.0) * 0.4;
        blended.min(self.config.max_confidence)
    }

    /// Count cross-checked good matches between two descriptor sets.
    ///
    /// A pair counts only when each descriptor is the other's nearest
    /// neighbor and their distance is below the good-match threshold.
    fn count_good_matches(&self, query: &[Descriptor], reference: &[Descriptor]) -> usize {
        if query.is_empty() || reference.is_empty() {
            return 0;
        }

        let forward: Vec<Option<usize>> = query
            .iter()
            .map(|q| nearest(q, reference).map(|(idx, _)| idx))
            .collect();

        query
            .iter()
            .enumerate()
            .filter(|(qi, q)| {
                let Some(ri) = forward[*qi] else { return false };
                if q.hamming(&reference[ri]) >= self.config.good_match_distance {
                    return false;
                }
                // Cross-check: the reference descriptor must point back
                nearest(&reference[ri], query).map(|(idx, _)| idx) == Some(*qi)
            })
            .count()
    }
}

/// Index and distance of the nearest descriptor in `set`
fn nearest(descriptor: &Descriptor, set: &[Descriptor]) -> Option<(usize, u32)> {
    set.iter()
        .enumerate()
        .map(|(i, d)| (i, descriptor.hamming(d)))
        .min_by_key(|&(_, dist)| dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ReferenceEntry;
    use crate::extractor::DESCRIPTOR_BYTES;

    /// Deterministic descriptors with large pairwise Hamming distance
    fn descriptor(seed: u64) -> Descriptor {
        let mut bytes = [0u8; DESCRIPTOR_BYTES];
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
        for byte in bytes.iter_mut() {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *byte = (state >> 56) as u8;
        }
        Descriptor(bytes)
    }

    fn descriptors(range: std::ops::Range<u64>) -> Vec<Descriptor> {
        range.map(descriptor).collect()
    }

    fn entry(image_id: &str, label: &str, descriptors: Vec<Descriptor>) -> ReferenceEntry {
        ReferenceEntry {
            image_id: image_id.to_string(),
            denomination: Denomination::from_label(label).unwrap(),
            descriptors,
        }
    }

    fn matcher() -> ReferenceMatcher {
        ReferenceMatcher::new(MatcherConfig::default(), FeatureExtractor::default())
    }

    #[test]
    fn test_distinct_seeds_are_far_apart() {
        // The whole test strategy relies on this property
        for a in 0..40u64 {
            for b in (a + 1)..40u64 {
                assert!(descriptor(a).hamming(&descriptor(b)) >= 50);
            }
        }
    }

    #[test]
    fn test_acceptance_gate_and_confidence() {
        let m = matcher();

        // total=20, best=10: both thresholds cleared
        assert!(m.accepts(20, 10));
        let confidence = m.fallback_confidence(20, 10);
        assert!((confidence - (20.0 / 50.0 * 0.6 + 10.0 / 30.0 * 0.4)).abs() < 1e-9);
        assert!((confidence - 0.3733).abs() < 1e-3);

        // total=10 fails the aggregate threshold
        assert!(!m.accepts(10, 5));
        // strong accumulation with no strong single image also fails
        assert!(!m.accepts(30, 8));
        // boundary values are exclusive
        assert!(!m.accepts(15, 9));
        assert!(!m.accepts(16, 8));
        assert!(m.accepts(16, 9));
    }

    #[test]
    fn test_confidence_is_capped() {
        let m = matcher();
        assert_eq!(m.fallback_confidence(500, 300), 0.95);
    }

    #[test]
    fn test_cross_checked_matching_counts_shared_descriptors() {
        let m = matcher();
        let query = descriptors(0..30);
        // Reference shares the first 12 descriptors with the query
        let reference = descriptors(0..12);
        assert_eq!(m.count_good_matches(&query, &reference), 12);
    }

    #[test]
    fn test_matching_rejects_unrelated_descriptors() {
        let m = matcher();
        let query = descriptors(0..20);
        let reference = descriptors(100..120);
        assert_eq!(m.count_good_matches(&query, &reference), 0);
    }

    #[test]
    fn test_corpus_match_accepted() {
        let m = matcher();
        let query = descriptors(0..40);

        // 1000-peso references share 10 + 5 + 5 descriptors: total=20, best=10
        let corpus = ReferenceCorpus::from_entries(vec![
            entry("a.jpg", "1000_front", descriptors(0..10)),
            entry("b.jpg", "1000_back", descriptors(10..15)),
            entry("c.jpg", "1000_front", descriptors(15..20)),
            // An unrelated 20-peso reference
            entry("d.jpg", "20_civet", descriptors(200..210)),
        ]);

        let detection = m.match_descriptors(&query, &corpus).unwrap();
        assert_eq!(detection.label, "1000");
        assert_eq!(detection.source, DetectionSource::ReferenceMatch);
        assert!((detection.confidence - 0.3733).abs() < 1e-3);
    }

    #[test]
    fn test_corpus_match_rejected_when_gate_fails() {
        let m = matcher();
        let query = descriptors(0..40);

        // total=10, best=5: fails the aggregate threshold
        let corpus = ReferenceCorpus::from_entries(vec![
            entry("a.jpg", "500_front", descriptors(0..5)),
            entry("b.jpg", "500_back", descriptors(5..10)),
        ]);

        assert!(m.match_descriptors(&query, &corpus).is_none());
    }

    #[test]
    fn test_empty_corpus_yields_nothing() {
        let m = matcher();
        let query = descriptors(0..10);
        assert!(m.match_descriptors(&query, &ReferenceCorpus::default()).is_none());
    }

    #[test]
    fn test_best_total_wins_across_denominations() {
        let m = matcher();
        let query = descriptors(0..60);

        let corpus = ReferenceCorpus::from_entries(vec![
            // 100 peso: total=18, best=18
            entry("a.jpg", "100_whale", descriptors(0..18)),
            // 500 peso: total=22, best=12 -- wins on total
            entry("b.jpg", "500_front", descriptors(18..30)),
            entry("c.jpg", "500_back", descriptors(30..40)),
        ]);

        let detection = m.match_descriptors(&query, &corpus).unwrap();
        assert_eq!(detection.label, "500");
    }
}
