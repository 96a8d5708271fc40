//! Denomination resolution from labeled detections.
//!
//! Every detection that carries a face value in its label votes for that
//! denomination; votes are weighted by `confidence * face_value`. The face
//! value acting as a weight deliberately biases the outcome toward
//! higher-denomination evidence, since larger bills carry more
//! distinguishing security detail for the detectors to find.

use crate::types::detection::{Denomination, Detection};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Per-denomination vote aggregate, built and discarded inside one
/// resolution call
#[derive(Debug, Clone, Default)]
pub struct DenominationVote {
    /// Accumulated `confidence * face_value`
    pub score: f64,
    /// Number of contributing detections
    pub count: usize,
    /// Strongest single contributing confidence
    pub max_confidence: f64,
    /// Labels that contributed to this vote
    pub contributing_labels: BTreeSet<String>,
}

/// Outcome of one resolution call
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Winning denomination, or `None` when nothing resolved
    pub denomination: Option<Denomination>,
    /// The winning vote's accumulated score; 0.0 when unresolved
    pub score: f64,
}

impl Resolution {
    /// The unresolved terminal state
    pub fn unknown() -> Self {
        Self {
            denomination: None,
            score: 0.0,
        }
    }

    /// Denomination token, or "unknown"
    pub fn denomination_str(&self) -> String {
        self.denomination
            .map(|d| d.token().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Resolve a set of detections to a single denomination.
///
/// Detections with confidence at or below zero are ignored, as are labels
/// carrying no face value (security or ornamental classes). An empty or
/// entirely unresolvable input yields `Resolution::unknown()`; deciding
/// whether to invoke the reference-matching fallback on that outcome is the
/// orchestrator's job, not this function's.
pub fn resolve(detections: &[Detection]) -> Resolution {
    let votes = tally_votes(detections);
    if votes.is_empty() {
        debug!(
            detections = detections.len(),
            "No detection resolved to a known face value"
        );
        return Resolution::unknown();
    }

    // Highest accumulated score wins; ties go to the higher face value.
    let (winner, vote) = votes
        .iter()
        .max_by(|(da, va), (db, vb)| {
            va.score
                .total_cmp(&vb.score)
                .then(da.face_value().total_cmp(&db.face_value()))
        })
        .map(|(d, v)| (*d, v.clone()))
        .expect("votes is non-empty");

    info!(
        denomination = %winner,
        score = vote.score,
        count = vote.count,
        max_confidence = vote.max_confidence,
        "Denomination resolved"
    );

    Resolution {
        denomination: Some(winner),
        score: vote.score,
    }
}

/// Group detections by face value and accumulate weighted votes
fn tally_votes(detections: &[Detection]) -> BTreeMap<Denomination, DenominationVote> {
    let mut votes: BTreeMap<Denomination, DenominationVote> = BTreeMap::new();

    for detection in detections {
        if detection.confidence <= 0.0 {
            continue;
        }
        let Some(denomination) = Denomination::from_label(&detection.label) else {
            continue;
        };

        let vote = votes.entry(denomination).or_default();
        vote.score += detection.confidence * denomination.face_value();
        vote.count += 1;
        vote.max_confidence = vote.max_confidence.max(detection.confidence);
        vote.contributing_labels.insert(detection.label.clone());
    }

    votes
}
