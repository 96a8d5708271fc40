//! Engine error taxonomy.
//!
//! Most failures never reach the caller: a missing or failing detector
//! degrades to the next fallback in the chain, and a scoring fault is
//! replaced with a neutral verdict. Only an unusable input image surfaces
//! as an error.

use thiserror::Error;

/// Errors produced by the scan engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input image buffer is unusable
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// A detector collaborator is absent or failed; caught at the
    /// orchestrator and degraded to the next fallback
    #[error("detector '{name}' unavailable")]
    ModelUnavailable {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unexpected numeric fault inside the scorer; caught at the
    /// orchestrator and replaced with a neutral verdict
    #[error("internal scoring error: {0}")]
    InternalScoring(String),
}
