//! Result types returned by [`crate::ingest()`].

use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// Everything produced for one report.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    /// `CASE_<millis>` identifier of the new case.
    pub case_id: String,
    /// The sealed PDF, identical to the persisted dossier artifact.
    pub dossier: Vec<u8>,
    /// File names written to the case directory, in write order.
    pub artifacts: Vec<String>,
    /// Items that were dropped, with the reason.
    pub item_errors: Vec<ItemError>,
    pub stats: IngestStats,
}

impl IngestOutput {
    /// `true` when every submitted item made it into the case.
    pub fn is_complete(&self) -> bool {
        self.item_errors.is_empty()
    }
}

/// Counters and timings for one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub images_submitted: usize,
    /// Images whose payload decoded and was persisted.
    pub images_decoded: usize,
    /// Exhibits actually drawn in the dossier.
    pub exhibits_rendered: usize,
    pub video_saved: bool,
    pub page_count: usize,
    pub dossier_bytes: usize,
    pub decode_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
