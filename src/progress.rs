//! Progress-callback trait for per-case ingestion events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::DossierConfigBuilder::progress_callback`] to observe what
//! the pipeline does with each item of a report: which artifacts were
//! written, which items were dropped and why, and when the dossier was
//! sealed.
//!
//! Events are delivered in addition to the `tracing` diagnostics, so callers
//! that only need logs can leave the callback unset.
//!
//! # Example
//!
//! ```rust
//! use evidence_dossier::{DossierConfig, IngestProgressCallback, ItemError};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SkipCounter {
//!     skipped: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for SkipCounter {
//!     fn on_item_skipped(&self, case_id: &str, error: &ItemError) {
//!         self.skipped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{case_id}: {error}");
//!     }
//! }
//!
//! let counter = Arc::new(SkipCounter { skipped: AtomicUsize::new(0) });
//!
//! let config = DossierConfig::builder()
//!     .progress_callback(counter as Arc<dyn IngestProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ItemError;
use std::sync::Arc;

/// Called by the ingestion pipeline as it processes a report.
///
/// Implementations must be `Send + Sync`: requests run on independent Tokio
/// tasks and the exhibit events fire from the blocking render thread. All
/// methods have default no-op implementations.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once the case directory exists.
    fn on_case_allocated(&self, case_id: &str) {
        let _ = case_id;
    }

    /// Called after an artifact has been written to the case directory.
    ///
    /// # Arguments
    /// * `case_id`  — owning case
    /// * `artifact` — file name inside the case directory
    /// * `bytes`    — size written
    fn on_artifact_saved(&self, case_id: &str, artifact: &str, bytes: usize) {
        let _ = (case_id, artifact, bytes);
    }

    /// Called when an item is dropped (bad payload or unrenderable image).
    fn on_item_skipped(&self, case_id: &str, error: &ItemError) {
        let _ = (case_id, error);
    }

    /// Called once after the dossier has been sealed and persisted.
    ///
    /// # Arguments
    /// * `exhibits` — number of exhibits in the document
    /// * `bytes`    — document size
    fn on_dossier_sealed(&self, case_id: &str, exhibits: usize, bytes: usize) {
        let _ = (case_id, exhibits, bytes);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DossierConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
