//! Scan orchestration: detector fusion, fallback chaining, verdict assembly.
//!
//! One pipeline serves every detector behind the [`Detector`] capability;
//! collaborators (models, reference corpus) are injected at construction
//! rather than held as process-wide state, so tests substitute fakes
//! without side effects.

use crate::analyzer::SecurityAnalyzer;
use crate::config::EngineConfig;
use crate::corpus::ReferenceCorpus;
use crate::error::EngineError;
use crate::extractor::FeatureExtractor;
use crate::matcher::ReferenceMatcher;
use crate::metrics::EngineMetrics;
use crate::resolver::{self, Resolution};
use crate::scorer;
use crate::types::detection::Detection;
use crate::types::verdict::{ConfidenceLevel, Recommendation, ScanReport, Verdict};
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// An external object-detection collaborator.
///
/// Implementations wrap whatever model runtime the host uses; the engine
/// only needs labeled, confidence-scored detections back. `infer` may be
/// slow and is always run off the async executor.
pub trait Detector: Send + Sync {
    /// Short collaborator name used in logs
    fn name(&self) -> &str;

    /// Run inference over a decoded RGB image
    fn infer(&self, image: &RgbImage) -> anyhow::Result<Vec<Detection>>;
}

/// Detection fusion and authenticity scoring engine.
///
/// Stateless across requests apart from read-only collaborators and the
/// metrics collector; a single instance serves concurrent scans.
pub struct ScanEngine {
    config: EngineConfig,
    matcher: ReferenceMatcher,
    analyzer: SecurityAnalyzer,
    corpus: Option<Arc<ReferenceCorpus>>,
    primary: Option<Arc<dyn Detector>>,
    security: Option<Arc<dyn Detector>>,
    metrics: EngineMetrics,
}

impl ScanEngine {
    /// Create an engine with no collaborators attached
    pub fn new(config: EngineConfig) -> Self {
        let matcher = ReferenceMatcher::new(
            config.matcher.clone(),
            FeatureExtractor::new(config.extractor.clone()),
        );
        let analyzer = SecurityAnalyzer::new(config.analyzer.clone());
        Self {
            config,
            matcher,
            analyzer,
            corpus: None,
            primary: None,
            security: None,
            metrics: EngineMetrics::new(),
        }
    }

    /// Attach the reference corpus used by the matching fallback
    pub fn with_corpus(mut self, corpus: Arc<ReferenceCorpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Attach the detector collaborators used by [`ScanEngine::scan`]
    pub fn with_detectors(
        mut self,
        primary: Arc<dyn Detector>,
        security: Arc<dyn Detector>,
    ) -> Self {
        self.primary = Some(primary);
        self.security = Some(security);
        self
    }

    /// Engine statistics collector
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Fuse already-run detections into a verdict.
    ///
    /// The image is consulted only when the primary detections fail to
    /// resolve a denomination and the reference-matching fallback runs.
    /// Always produces a valid verdict for a usable image; insufficient
    /// evidence is a terminal state ("unknown" denomination, below-baseline
    /// score), not an error.
    pub fn evaluate(
        &self,
        image: &RgbImage,
        primary_detections: &[Detection],
        security_detections: &[Detection],
    ) -> Result<Verdict, EngineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EngineError::InvalidInput("empty image buffer".to_string()));
        }

        let mut resolution = resolver::resolve(primary_detections);
        let mut fallback_detection = None;

        if resolution.denomination.is_none() {
            fallback_detection = self.reference_fallback(image);
            if let Some(detection) = &fallback_detection {
                resolution = resolver::resolve(std::slice::from_ref(detection));
            }
        }

        let analysis = self
            .analyzer
            .analyze(security_detections, resolution.denomination);

        let mut detected_features: Vec<Detection> =
            Vec::with_capacity(primary_detections.len() + security_detections.len() + 1);
        detected_features.extend_from_slice(primary_detections);
        detected_features.extend_from_slice(security_detections);
        detected_features.extend(fallback_detection);

        let score = match self.checked_score(&detected_features, &resolution) {
            Ok(score) => score,
            Err(e) => {
                warn!(error = %e, "Scoring fault, substituting neutral verdict");
                0.5
            }
        };

        let verdict = Verdict {
            denomination: resolution.denomination_str(),
            authenticity_score: score,
            counterfeit_probability: 1.0 - score,
            recommendation: Recommendation::from_score(score, &self.config.bands),
            confidence_level: ConfidenceLevel::from_score(score, &self.config.confidence),
            detected_features,
            security_analysis: analysis,
        };

        info!(
            denomination = %verdict.denomination,
            authenticity_score = verdict.authenticity_score,
            recommendation = verdict.recommendation.as_str(),
            "Verdict assembled"
        );

        Ok(verdict)
    }

    /// Run both detectors concurrently, fuse their output, and wrap the
    /// verdict in a scan report.
    ///
    /// A failing or missing detector degrades to the next fallback in the
    /// chain: primary failure leans on reference matching, security failure
    /// proceeds with no security evidence. Neither is a hard error.
    pub async fn scan(&self, image: RgbImage) -> Result<ScanReport, EngineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EngineError::InvalidInput("empty image buffer".to_string()));
        }
        let start = Instant::now();

        let (primary_result, security_result) = tokio::join!(
            run_detector(self.primary.clone(), &image),
            run_detector(self.security.clone(), &image),
        );

        let primary_detections = primary_result.unwrap_or_else(|e| {
            warn!(error = %e, "Primary detector unavailable, relying on reference matching");
            Vec::new()
        });
        let security_detections = security_result.unwrap_or_else(|e| {
            warn!(error = %e, "Security detector unavailable, proceeding without security evidence");
            Vec::new()
        });

        let verdict = self.evaluate(&image, &primary_detections, &security_detections)?;

        let elapsed = start.elapsed();
        self.metrics.record_scan(elapsed, verdict.authenticity_score);
        self.metrics.record_verdict(verdict.recommendation.as_str());

        Ok(ScanReport::new(verdict).with_processing_time(elapsed))
    }

    /// Content-based retrieval, only reachable when the primary detector
    /// produced nothing usable
    fn reference_fallback(&self, image: &RgbImage) -> Option<Detection> {
        let corpus = match &self.corpus {
            Some(corpus) => corpus,
            None => {
                debug!("No reference corpus attached, skipping fallback");
                return None;
            }
        };
        self.metrics.record_fallback();
        self.matcher.match_image(image, corpus)
    }

    /// Guard against numeric faults leaking out of the scorer
    fn checked_score(
        &self,
        detections: &[Detection],
        resolution: &Resolution,
    ) -> Result<f64, EngineError> {
        let score = scorer::score(detections, resolution.denomination);
        if score.is_finite() {
            Ok(score)
        } else {
            Err(EngineError::InternalScoring(format!(
                "non-finite score {score} for {} detections",
                detections.len()
            )))
        }
    }
}

/// Run one detector off the executor, mapping every failure mode to
/// `ModelUnavailable` for the caller to degrade on
async fn run_detector(
    detector: Option<Arc<dyn Detector>>,
    image: &RgbImage,
) -> Result<Vec<Detection>, EngineError> {
    let Some(detector) = detector else {
        return Err(EngineError::ModelUnavailable {
            name: "unattached".to_string(),
            source: anyhow::anyhow!("no detector configured"),
        });
    };

    let name = detector.name().to_string();
    let image = image.clone();
    let handle = tokio::task::spawn_blocking(move || detector.infer(&image));

    match handle.await {
        Ok(Ok(detections)) => {
            debug!(detector = %name, count = detections.len(), "Detector inference complete");
            Ok(detections)
        }
        Ok(Err(e)) => Err(EngineError::ModelUnavailable { name, source: e }),
        Err(e) => Err(EngineError::ModelUnavailable {
            name,
            source: anyhow::Error::new(e),
        }),
    }
}
