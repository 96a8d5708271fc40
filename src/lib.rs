//! Detection fusion and authenticity scoring engine for Philippine peso
//! bill verification.
//!
//! The engine fuses labeled detections from external object-detection
//! models into a single verdict per scanned bill:
//!
//! 1. **Denomination resolution**: confidence and face-value weighted
//!    voting over detection labels ([`resolver`])
//! 2. **Reference matching fallback**: binary-descriptor retrieval against
//!    a corpus of known-good bill images when no label resolves
//!    ([`matcher`], [`corpus`], [`extractor`])
//! 3. **Security feature analysis**: canonical feature flags and
//!    denomination cross-checking ([`analyzer`])
//! 4. **Authenticity scoring**: additive evidence model over the fused
//!    detection set ([`scorer`])
//! 5. **Recommendation**: banded verdict with a confidence level
//!    ([`types::verdict`])
//!
//! [`engine::ScanEngine`] orchestrates the pipeline; collaborators are
//! injected so hosts can bring their own model runtimes and corpus
//! storage.

pub mod analyzer;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod metrics;
pub mod resolver;
pub mod scorer;
pub mod types;

pub use config::EngineConfig;
pub use engine::{Detector, ScanEngine};
pub use error::EngineError;
pub use types::detection::{Denomination, Detection, DetectionSource};
pub use types::verdict::{
    ConfidenceLevel, Recommendation, ScanReport, SecurityAnalysis, Verdict,
};
