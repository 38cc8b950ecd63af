//! Error types for the evidence-dossier library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DossierError`] — **Fatal**: the request cannot complete (case directory
//!   could not be created, an artifact write failed, the document could not be
//!   serialised). Returned as `Err(DossierError)` from [`crate::ingest()`] and
//!   the [`crate::store::CaseStore`] operations, and surfaced over HTTP as a
//!   single error response.
//!
//! * [`ItemError`] — **Non-fatal**: one image or the video could not be
//!   decoded, or one exhibit could not be drawn. Collected in
//!   [`crate::output::IngestOutput::item_errors`]; every other item is
//!   processed normally.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the evidence-dossier library.
///
/// Per-item failures use [`ItemError`] and never escalate to this type.
#[derive(Debug, Error)]
pub enum DossierError {
    // ── Storage errors ────────────────────────────────────────────────────
    /// The storage root could not be created or resolved.
    #[error("Storage root '{path}' is unavailable: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory for a freshly allocated case could not be created.
    #[error("Failed to create case directory '{path}': {source}")]
    CaseAllocationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing an artifact under a case directory failed.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading an existing artifact failed for a reason other than absence.
    #[error("Failed to read artifact '{path}': {source}")]
    ArtifactReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Retrieval errors ──────────────────────────────────────────────────
    /// The requested case or artifact does not exist.
    #[error("Artifact '{artifact}' not found in case '{case_id}'")]
    ArtifactNotFound { case_id: String, artifact: String },

    /// The requested case does not exist.
    #[error("Case '{case_id}' not found")]
    CaseNotFound { case_id: String },

    /// A path segment supplied by a client is not acceptable.
    #[error("Invalid path segment '{segment}': {reason}")]
    InvalidPathSegment {
        segment: String,
        reason: &'static str,
    },

    /// The HTTP listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The document object graph could not be serialised.
    #[error("Dossier rendering failed: {0}")]
    RenderFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<lopdf::Error> for DossierError {
    fn from(e: lopdf::Error) -> Self {
        DossierError::RenderFailed(e.to_string())
    }
}

/// A non-fatal error for a single submitted item.
///
/// `position` is always the 1-based index of the image in the submitted
/// `images` array, which is also its exhibit number.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemError {
    /// Image payload was not valid base64.
    #[error("Image {position}: malformed payload: {detail}")]
    ImageDecode { position: usize, detail: String },

    /// Image payload decoded to zero bytes.
    #[error("Image {position}: payload is empty")]
    ImageEmpty { position: usize },

    /// Video payload was not valid base64 or was empty.
    #[error("Video: malformed payload: {detail}")]
    VideoDecode { detail: String },

    /// The image bytes could not be turned into an embeddable picture.
    #[error("Exhibit #{position}: render failed: {detail}")]
    ExhibitRender { position: usize, detail: String },
}

impl ItemError {
    /// The 1-based image position this error refers to, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            ItemError::ImageDecode { position, .. }
            | ItemError::ImageEmpty { position }
            | ItemError::ExhibitRender { position, .. } => Some(*position),
            ItemError::VideoDecode { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_segment_display() {
        let e = DossierError::InvalidPathSegment {
            segment: "../etc".into(),
            reason: "parent directory reference",
        };
        let msg = e.to_string();
        assert!(msg.contains("../etc"), "got: {msg}");
        assert!(msg.contains("parent directory"), "got: {msg}");
    }

    #[test]
    fn not_found_display() {
        let e = DossierError::ArtifactNotFound {
            case_id: "CASE_1".into(),
            artifact: "evidence_9.jpg".into(),
        };
        assert!(e.to_string().contains("evidence_9.jpg"));
        assert!(e.to_string().contains("CASE_1"));
    }

    #[test]
    fn item_error_positions() {
        assert_eq!(
            ItemError::ImageDecode {
                position: 2,
                detail: "bad".into()
            }
            .position(),
            Some(2)
        );
        assert_eq!(ItemError::ImageEmpty { position: 4 }.position(), Some(4));
        assert_eq!(
            ItemError::VideoDecode {
                detail: "bad".into()
            }
            .position(),
            None
        );
    }

    #[test]
    fn item_error_serialises_with_kind_tag() {
        let e = ItemError::ExhibitRender {
            position: 3,
            detail: "truncated".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "exhibit_render");
        assert_eq!(json["position"], 3);
    }
}
