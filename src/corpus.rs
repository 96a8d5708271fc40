//! Reference corpus of labeled peso images with precomputed descriptors.
//!
//! The corpus is loaded once through a [`ReferenceCorpusStore`] and is
//! read-only afterward; concurrent scans share it behind an `Arc` without
//! locking. The only update path is a full reload into a fresh corpus.

use crate::extractor::Descriptor;
use crate::types::detection::Denomination;
use anyhow::Result;
use tracing::{info, warn};

/// One reference image: identifier, denomination, and its descriptor set
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    /// Stable identifier of the source image
    pub image_id: String,
    /// Denomination the image is labeled with
    pub denomination: Denomination,
    /// Precomputed binary descriptors
    pub descriptors: Vec<Descriptor>,
}

/// Supplies raw reference records `(image_id, label, descriptors)`.
///
/// Implemented by the host application; typically backed by a dataset
/// directory with descriptors computed at ingest time.
pub trait ReferenceCorpusStore: Send + Sync {
    /// Load every reference record. Called once at startup.
    fn load_all(&self) -> Result<Vec<(String, String, Vec<Descriptor>)>>;
}

/// Immutable set of reference entries, grouped nowhere: matching iterates
/// all entries and aggregates per denomination itself
#[derive(Debug, Default)]
pub struct ReferenceCorpus {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceCorpus {
    /// Build a corpus from a store.
    ///
    /// Records whose label carries no recognizable face value, or which
    /// have no descriptors, are skipped with a warning rather than
    /// failing the whole load.
    pub fn load(store: &dyn ReferenceCorpusStore) -> Result<Self> {
        let records = store.load_all()?;
        let total = records.len();

        let mut entries = Vec::with_capacity(total);
        for (image_id, label, descriptors) in records {
            let Some(denomination) = Denomination::from_label(&label) else {
                warn!(image_id = %image_id, label = %label, "Skipping reference with unrecognized label");
                continue;
            };
            if descriptors.is_empty() {
                warn!(image_id = %image_id, "Skipping reference with no descriptors");
                continue;
            }
            entries.push(ReferenceEntry {
                image_id,
                denomination,
                descriptors,
            });
        }

        info!(
            loaded = entries.len(),
            skipped = total - entries.len(),
            "Reference corpus loaded"
        );

        Ok(Self { entries })
    }

    /// Build a corpus directly from entries; used by tests and ingest tools
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    /// All reference entries
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Number of reference images
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the corpus holds no references
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
